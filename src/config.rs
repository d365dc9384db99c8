use crate::error::{ProcessingError, Result};
use crate::models::{DateRule, NamingClass, VariableDefinition, VariableId, VariableRegistry};
use crate::utils::constants::{
    COMPRESSION_GZIP, COMPRESSION_LZ4, COMPRESSION_NONE, COMPRESSION_SNAPPY, COMPRESSION_ZSTD,
    DEFAULT_EXTENSION, DEFAULT_IMAGE_TIMEOUT_SECS, DEFAULT_NODATA,
};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use validator::Validate;

/// What a class run does when one of its images fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Stop the pipeline with the wrapped image error.
    #[default]
    Abort,
    /// Warn, record the image in the run report and keep going.
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct PipelineConfig {
    #[validate(length(min = 1))]
    pub extension: String,

    /// Run-level raster nodata sentinel. Independent of each variable's own
    /// missing value.
    pub nodata: f64,

    #[validate(range(min = 1))]
    pub max_workers: usize,

    /// Per-image timeout in seconds, 0 disables it.
    pub image_timeout_secs: u64,

    pub error_policy: ErrorPolicy,
    pub apply_correction: bool,
    pub all_statistics: bool,
    pub sort_by_date: bool,
    pub parquet_export: bool,
    pub parquet_compression: String,

    /// Number of leading path components stripped before labels are built.
    /// Defaults to the component count of the input root.
    pub prefix_depth: Option<usize>,

    pub naming_classes: BTreeMap<NamingClass, DateRule>,
    pub variables: BTreeMap<VariableId, VariableDefinition>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            extension: DEFAULT_EXTENSION.to_string(),
            nodata: DEFAULT_NODATA,
            max_workers: num_cpus::get(),
            image_timeout_secs: DEFAULT_IMAGE_TIMEOUT_SECS,
            error_policy: ErrorPolicy::Abort,
            apply_correction: true,
            all_statistics: false,
            sort_by_date: false,
            parquet_export: false,
            parquet_compression: COMPRESSION_SNAPPY.to_string(),
            prefix_depth: None,
            naming_classes: BTreeMap::new(),
            variables: BTreeMap::new(),
        }
    }
}

impl PipelineConfig {
    /// Defaults, then the optional TOML file, then `ZONAL_*` environment
    /// variables (nested keys separated by `__`).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path));
        }
        builder = builder.add_source(
            Environment::with_prefix("ZONAL")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: PipelineConfig = builder.build()?.try_deserialize()?;
        config.check()?;
        Ok(config)
    }

    /// Field validation plus the cross-field checks.
    pub fn check(&self) -> Result<()> {
        self.validate()?;

        if !self.nodata.is_finite() {
            return Err(ProcessingError::Config(format!(
                "nodata must be finite, got {}",
                self.nodata
            )));
        }

        let compression = self.parquet_compression.to_lowercase();
        if ![
            COMPRESSION_SNAPPY,
            COMPRESSION_GZIP,
            COMPRESSION_LZ4,
            COMPRESSION_ZSTD,
            COMPRESSION_NONE,
        ]
        .contains(&compression.as_str())
        {
            return Err(ProcessingError::Config(format!(
                "Unsupported compression: {}",
                self.parquet_compression
            )));
        }

        for rule in self.naming_classes.values() {
            DateRule::new(rule.offsets, rule.format)?;
        }
        self.registry()?;
        Ok(())
    }

    /// Date rule for a class, configured or built-in.
    pub fn rule_for(&self, class: NamingClass) -> DateRule {
        self.naming_classes
            .get(&class)
            .copied()
            .unwrap_or_else(|| class.default_rule())
    }

    pub fn registry(&self) -> Result<VariableRegistry> {
        VariableRegistry::with_overrides(&self.variables)
    }

    pub fn image_timeout(&self) -> Option<Duration> {
        (self.image_timeout_secs > 0).then(|| Duration::from_secs(self.image_timeout_secs))
    }
}
