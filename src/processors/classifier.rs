use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::models::{DateRule, NamingClass, VariableId};
use crate::utils::filename::{has_extension, walk_tree};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// A raster directory matched to a naming class.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageClass {
    pub directory: PathBuf,
    pub class: NamingClass,
    pub variable: VariableId,
    /// Output sub-path label, the path components below the prefix joined
    /// with `_`. Unique across a classification.
    pub label: String,
    pub rule: DateRule,
}

impl fmt::Display for ImageClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] {} {} <- {}",
            self.label,
            self.class,
            self.variable,
            self.rule.offsets,
            self.directory.display()
        )
    }
}

/// A matched directory that could not be turned into a class.
#[derive(Debug)]
pub struct ClassFailure {
    pub directory: PathBuf,
    pub error: ProcessingError,
}

#[derive(Debug, Default)]
pub struct Classification {
    pub classes: Vec<ImageClass>,
    pub failures: Vec<ClassFailure>,
    /// Directories with matching files whose name fits no naming class or
    /// whose variable is unknown.
    pub ignored: Vec<PathBuf>,
}

pub struct NamingClassifier {
    extension: String,
    prefix_depth: Option<usize>,
    rules: HashMap<NamingClass, DateRule>,
}

impl NamingClassifier {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            extension: config.extension.clone(),
            prefix_depth: config.prefix_depth,
            rules: NamingClass::ALL
                .into_iter()
                .map(|class| (class, config.rule_for(class)))
                .collect(),
        }
    }

    /// Walk `root` and classify every directory that holds at least one file
    /// with the configured extension.
    pub fn classify(&self, root: &Path) -> Result<Classification> {
        let root = root.canonicalize()?;
        let prefix_depth = self
            .prefix_depth
            .unwrap_or_else(|| root.components().count());

        let mut classification = Classification::default();
        let mut seen_labels: HashMap<String, PathBuf> = HashMap::new();

        for entry in walk_tree(&root)? {
            if !entry.files.iter().any(|f| has_extension(f, &self.extension)) {
                continue;
            }

            let directory = entry.directory;
            let Some(class) = directory
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(NamingClass::from_dir_token)
            else {
                debug!("Ignoring unmatched directory {}", directory.display());
                classification.ignored.push(directory);
                continue;
            };

            match self.describe(&directory, class, prefix_depth) {
                Ok(Some(image_class)) => {
                    if let Some(first) = seen_labels.get(&image_class.label) {
                        let error = ProcessingError::InvalidFormat(format!(
                            "Label '{}' of {} collides with {}",
                            image_class.label,
                            directory.display(),
                            first.display()
                        ));
                        warn!("{}", error);
                        classification.failures.push(ClassFailure { directory, error });
                        continue;
                    }
                    seen_labels.insert(image_class.label.clone(), directory);
                    classification.classes.push(image_class);
                }
                Ok(None) => {
                    warn!(
                        "No known variable in {}, directory skipped",
                        directory.display()
                    );
                    classification.ignored.push(directory);
                }
                Err(error) => {
                    warn!("{}", error);
                    classification.failures.push(ClassFailure { directory, error });
                }
            }
        }

        info!(
            "Classified {} directories ({} failed, {} ignored)",
            classification.classes.len(),
            classification.failures.len(),
            classification.ignored.len()
        );
        Ok(classification)
    }

    fn describe(
        &self,
        directory: &Path,
        class: NamingClass,
        prefix_depth: usize,
    ) -> Result<Option<ImageClass>> {
        let components: Vec<String> = directory
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();

        let depth = components.len();
        let minimum = prefix_depth + 1;
        if depth < minimum {
            return Err(ProcessingError::InvalidPathDepth {
                path: directory.to_path_buf(),
                depth,
                minimum,
            });
        }
        let below_prefix = &components[prefix_depth..];

        let Some(variable) = below_prefix.first().and_then(|c| find_variable(c)) else {
            return Ok(None);
        };

        Ok(Some(ImageClass {
            directory: directory.to_path_buf(),
            class,
            variable,
            label: below_prefix.join("_"),
            rule: self.rules[&class],
        }))
    }
}

/// The variable a directory component names exactly, otherwise the longest
/// variable key it starts with.
fn find_variable(component: &str) -> Option<VariableId> {
    VariableId::from_key(component).or_else(|| {
        VariableId::ALL
            .into_iter()
            .filter(|id| component.starts_with(id.key()))
            .max_by_key(|id| id.key().len())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"").unwrap();
    }

    fn classifier() -> NamingClassifier {
        NamingClassifier::new(&PipelineConfig::default())
    }

    #[test]
    fn test_classes_and_labels() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        touch(root, "monthly_rain/monthly_rain_cor/a_202001cor.tif");
        touch(root, "monthly_rain/monthly_rain_mavg/b_202001202012_mavg.tif");
        touch(root, "max_temp/max_temp_siav/c.tif");
        touch(root, "max_temp/metadata/readme.tif");
        touch(root, "max_temp/empty_cor/notes.txt");

        let result = classifier().classify(root).unwrap();
        assert!(result.failures.is_empty());
        assert_eq!(result.ignored.len(), 1);

        let labels: Vec<(&str, NamingClass, VariableId)> = result
            .classes
            .iter()
            .map(|c| (c.label.as_str(), c.class, c.variable))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("max_temp_max_temp_siav", NamingClass::Seasonal, VariableId::MaxTemp),
                ("monthly_rain_monthly_rain_cor", NamingClass::Cor, VariableId::MonthlyRain),
                ("monthly_rain_monthly_rain_mavg", NamingClass::Moving, VariableId::MonthlyRain),
            ]
        );
        assert_eq!(result.classes[1].rule, NamingClass::Cor.default_rule());
    }

    #[test]
    fn test_variable_prefix_match() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "vp_deficit_2020/vp_deficit_cor/x.tif");
        let result = classifier().classify(dir.path()).unwrap();
        assert_eq!(result.classes[0].variable, VariableId::VpDeficit);
    }

    #[test]
    fn test_unknown_variable_is_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ndvi/ndvi_cor/x.tif");
        let result = classifier().classify(dir.path()).unwrap();
        assert!(result.classes.is_empty());
        assert_eq!(result.ignored.len(), 1);
    }

    #[test]
    fn test_prefix_deeper_than_directory_is_path_depth_error() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "daily_rain_cor/x.tif");
        let config = PipelineConfig {
            prefix_depth: Some(200),
            ..PipelineConfig::default()
        };
        let result = NamingClassifier::new(&config).classify(dir.path()).unwrap();
        assert!(result.classes.is_empty());
        assert!(matches!(
            result.failures[0].error,
            ProcessingError::InvalidPathDepth { .. }
        ));
    }

    #[test]
    fn test_variable_comes_from_first_component_below_root() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "ndvi/monthly_rain_cor/x.tif");
        let result = classifier().classify(dir.path()).unwrap();
        assert!(result.classes.is_empty());
        assert_eq!(result.ignored.len(), 1);
    }

    #[test]
    fn test_find_variable() {
        assert_eq!(find_variable("rh_tmax"), Some(VariableId::RhTmax));
        assert_eq!(find_variable("evap_pan_qld"), Some(VariableId::EvapPan));
        assert_eq!(find_variable("vp_deficit_2020"), Some(VariableId::VpDeficit));
        assert_eq!(find_variable("unknown"), None);
    }
}
