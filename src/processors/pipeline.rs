use crate::config::{ErrorPolicy, PipelineConfig};
use crate::error::{ProcessingError, Result};
use crate::models::{VariableRegistry, ZonalStatRecord};
use crate::processors::aggregator::{aggregate, SitePartitioner};
use crate::processors::classifier::{Classification, ImageClass, NamingClassifier};
use crate::processors::correction::correct;
use crate::processors::manifest::{Manifest, ManifestBuilder};
use crate::processors::zonal_engine::ZonalStatsEngine;
use crate::utils::filename::parquet_file_name;
use crate::utils::progress::ProgressReporter;
use crate::workspace::Workspace;
use crate::writers::{ParquetWriter, SiteCsvWriter};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// An image left out of its class table under `ErrorPolicy::Skip`.
#[derive(Debug, Clone)]
pub struct SkippedImage {
    pub image: PathBuf,
    pub reason: String,
}

/// A class that never reached aggregation.
#[derive(Debug, Clone)]
pub struct FailedClass {
    pub directory: PathBuf,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct ClassReport {
    pub label: String,
    pub images: usize,
    pub rows: usize,
    pub files: Vec<PathBuf>,
    pub parquet: Option<PathBuf>,
    pub skipped: Vec<SkippedImage>,
}

#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub classes: Vec<ClassReport>,
    pub failed: Vec<FailedClass>,
    pub ignored: Vec<PathBuf>,
}

impl RunReport {
    pub fn images(&self) -> usize {
        self.classes.iter().map(|c| c.images).sum()
    }

    pub fn rows(&self) -> usize {
        self.classes.iter().map(|c| c.rows).sum()
    }

    pub fn files(&self) -> usize {
        self.classes.iter().map(|c| c.files.len()).sum()
    }

    pub fn skipped(&self) -> impl Iterator<Item = &SkippedImage> {
        self.classes.iter().flat_map(|c| c.skipped.iter())
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Zonal statistics run summary:")?;
        writeln!(f, "- Classes processed: {}", self.classes.len())?;
        writeln!(f, "- Images: {}", self.images())?;
        writeln!(f, "- Rows: {}", self.rows())?;
        writeln!(f, "- Site files: {}", self.files())?;
        writeln!(f, "- Skipped images: {}", self.skipped().count())?;
        write!(f, "- Failed classes: {}", self.failed.len())?;
        for failed in &self.failed {
            write!(f, "\n  {}: {}", failed.directory.display(), failed.reason)?;
        }
        for skipped in self.skipped() {
            write!(f, "\n  skipped {}: {}", skipped.image.display(), skipped.reason)?;
        }
        Ok(())
    }
}

/// Sequences classify, manifest, zonal statistics, aggregate, correct and
/// partition for every class under an input root.
pub struct PipelineController {
    config: PipelineConfig,
    registry: VariableRegistry,
    engine: ZonalStatsEngine,
    image_timeout: Option<Duration>,
}

impl PipelineController {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.check()?;
        let registry = config.registry()?;
        let engine = ZonalStatsEngine::new(config.nodata);
        let image_timeout = config.image_timeout();
        Ok(Self {
            config,
            registry,
            engine,
            image_timeout,
        })
    }

    /// Replace the per-image timeout taken from the configuration.
    pub fn with_image_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.image_timeout = timeout;
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn classify(&self, input_root: &Path) -> Result<Classification> {
        NamingClassifier::new(&self.config).classify(input_root)
    }

    /// Process every class under `input_root` into the workspace. The zone
    /// set must already be persisted in the workspace.
    pub async fn run(
        &self,
        workspace: &Workspace,
        input_root: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<RunReport> {
        let zone_path = workspace.zone_path()?.to_path_buf();
        let classification = self.classify(input_root)?;

        let mut report = RunReport {
            ignored: classification.ignored,
            failed: classification
                .failures
                .into_iter()
                .map(|f| FailedClass {
                    directory: f.directory,
                    reason: f.error.to_string(),
                })
                .collect(),
            ..RunReport::default()
        };

        for class in &classification.classes {
            info!("Processing {}", class);
            let manifest = match self.build_manifest(workspace, class) {
                Ok(manifest) => manifest,
                Err(e) => {
                    error!("Manifest for {} failed: {}", class.label, e);
                    report.failed.push(FailedClass {
                        directory: class.directory.clone(),
                        reason: e.to_string(),
                    });
                    continue;
                }
            };

            let class_report = self
                .run_class(workspace, class, &manifest, &zone_path, progress)
                .await?;
            report.classes.push(class_report);
        }

        info!(
            "Run complete: {} classes, {} rows, {} failed",
            report.classes.len(),
            report.rows(),
            report.failed.len()
        );
        Ok(report)
    }

    fn build_manifest(&self, workspace: &Workspace, class: &ImageClass) -> Result<Manifest> {
        let manifest = ManifestBuilder::new(&self.config.extension).build(&class.directory)?;
        let manifest_path = workspace.manifest_path(&class.label);
        manifest.write(&manifest_path)?;
        info!(
            "{}: {} images listed in {}",
            class.label,
            manifest.len(),
            manifest_path.display()
        );
        Ok(manifest)
    }

    async fn run_class(
        &self,
        workspace: &Workspace,
        class: &ImageClass,
        manifest: &Manifest,
        zone_path: &Path,
        progress: Option<&ProgressReporter>,
    ) -> Result<ClassReport> {
        let definition = self.registry.get(class.variable)?.clone();

        if let Some(p) = progress {
            p.reset(manifest.len() as u64, &format!("Zonal statistics for {}", class.label));
        }
        let engine = self.engine;
        let zone_path = zone_path.to_path_buf();
        let variable = definition.clone();
        let rule = class.rule;
        let label = class.label.clone();
        let compute =
            move |image: &Path| engine.compute(image, &zone_path, &variable, &rule, &label);

        let (records, skipped) = self
            .compute_images(class, manifest, compute, progress)
            .await?;

        let mut table = aggregate(records, &class.label);
        if self.config.apply_correction {
            correct(&mut table, class.variable, &definition);
        }
        if self.config.sort_by_date {
            table.sort_chronologically();
        }

        let output_dir = workspace.class_output_dir(&class.label)?;
        let writer = SiteCsvWriter::new(definition.output_code.clone())
            .with_all_statistics(self.config.all_statistics);
        let files = SitePartitioner::new(writer).partition_by_site(&table, &output_dir)?;

        let parquet = if self.config.parquet_export {
            let path = output_dir.join(parquet_file_name(&class.label));
            let writer = ParquetWriter::new().with_compression(&self.config.parquet_compression)?;
            writer.write_table(&table, &path)?;
            let file_info = writer.get_file_info(&path)?;
            info!(
                "Exported {} rows in {} row groups ({} bytes, {:?}) to {}",
                file_info.total_rows,
                file_info.row_groups,
                file_info.file_size,
                file_info.compression,
                path.display()
            );
            Some(path)
        } else {
            None
        };

        Ok(ClassReport {
            label: class.label.clone(),
            images: manifest.len(),
            rows: table.len(),
            files,
            parquet,
            skipped,
        })
    }

    /// Fan `compute` out over the manifest on the blocking pool, at most
    /// `max_workers` images at a time, and return the records in manifest
    /// order.
    async fn compute_images<F>(
        &self,
        class: &ImageClass,
        manifest: &Manifest,
        compute: F,
        progress: Option<&ProgressReporter>,
    ) -> Result<(Vec<Vec<ZonalStatRecord>>, Vec<SkippedImage>)>
    where
        F: Fn(&Path) -> Result<Vec<ZonalStatRecord>> + Send + Sync + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.config.max_workers));
        let compute = Arc::new(compute);
        let timeout = self.image_timeout;

        let mut tasks = JoinSet::new();
        for (index, image) in manifest.paths().iter().cloned().enumerate() {
            let semaphore = semaphore.clone();
            let compute = compute.clone();

            tasks.spawn(async move {
                let permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => return (index, image, Err(ProcessingError::Config(e.to_string()))),
                };
                let task_image = image.clone();
                // The permit is held by the blocking work itself, so a timed
                // out image keeps its slot until it really finishes.
                let handle = tokio::task::spawn_blocking(move || {
                    let _permit = permit;
                    compute(&task_image)
                });

                let result = match timeout {
                    Some(limit) => match tokio::time::timeout(limit, handle).await {
                        Ok(joined) => joined.map_err(ProcessingError::from).and_then(|r| r),
                        Err(_) => Err(ProcessingError::ImageTimeout {
                            image: image.clone(),
                            timeout: limit,
                        }),
                    },
                    None => handle.await.map_err(ProcessingError::from).and_then(|r| r),
                };
                (index, image, result)
            });
        }

        let mut slots: Vec<Option<Vec<ZonalStatRecord>>> = vec![None; manifest.len()];
        let mut skipped = Vec::new();

        while let Some(joined) = tasks.join_next().await {
            let (index, image, result) = joined?;
            if let Some(p) = progress {
                p.increment(1);
            }

            match result {
                Ok(records) => {
                    debug!("{}: {} records", image.display(), records.len());
                    slots[index] = Some(records);
                }
                Err(e) => {
                    let failure = ProcessingError::ImageFailed {
                        image: image.clone(),
                        class_label: class.label.clone(),
                        offsets: class.rule.offsets,
                        source: Box::new(e),
                    };
                    match self.config.error_policy {
                        ErrorPolicy::Abort => {
                            tasks.abort_all();
                            error!("{}", failure);
                            return Err(failure);
                        }
                        ErrorPolicy::Skip => {
                            warn!("Skipping image: {}", failure);
                            skipped.push(SkippedImage {
                                image,
                                reason: failure.to_string(),
                            });
                        }
                    }
                }
            }
        }

        Ok((slots.into_iter().flatten().collect(), skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NamingClass, VariableId, ZoneStatistics};

    fn class() -> ImageClass {
        ImageClass {
            directory: PathBuf::from("/data/monthly_rain/monthly_rain_cor"),
            class: NamingClass::Cor,
            variable: VariableId::MonthlyRain,
            label: "monthly_rain_monthly_rain_cor".to_string(),
            rule: NamingClass::Cor.default_rule(),
        }
    }

    fn manifest() -> Manifest {
        Manifest::new(vec![
            PathBuf::from("a_202001cor.tif"),
            PathBuf::from("slow_202002cor.tif"),
            PathBuf::from("c_202003cor.tif"),
        ])
    }

    /// One record per image; images named `slow*` stall well past the timeout.
    fn stall_on_slow(image: &Path) -> Result<Vec<ZonalStatRecord>> {
        let name = image.to_string_lossy().into_owned();
        if name.starts_with("slow") {
            std::thread::sleep(Duration::from_millis(600));
        }
        Ok(vec![ZonalStatRecord {
            ident: 1,
            site: "ALI01".to_string(),
            im_date: String::new(),
            stats: ZoneStatistics::empty(),
            im_name: name,
            d_type: String::new(),
        }])
    }

    fn controller(policy: ErrorPolicy) -> PipelineController {
        let config = PipelineConfig {
            max_workers: 3,
            error_policy: policy,
            ..PipelineConfig::default()
        };
        PipelineController::new(config)
            .unwrap()
            .with_image_timeout(Some(Duration::from_millis(100)))
    }

    #[tokio::test]
    async fn test_timed_out_image_aborts_under_abort_policy() {
        let result = controller(ErrorPolicy::Abort)
            .compute_images(&class(), &manifest(), stall_on_slow, None)
            .await;

        match result {
            Err(ProcessingError::ImageFailed {
                image,
                class_label,
                source,
                ..
            }) => {
                assert_eq!(image, PathBuf::from("slow_202002cor.tif"));
                assert_eq!(class_label, "monthly_rain_monthly_rain_cor");
                assert!(matches!(*source, ProcessingError::ImageTimeout { .. }));
            }
            other => panic!(
                "expected ImageFailed, got {:?}",
                other.map(|(records, skipped)| (records.len(), skipped.len()))
            ),
        }
    }

    #[tokio::test]
    async fn test_timed_out_image_is_skipped_under_skip_policy() {
        let (records, skipped) = controller(ErrorPolicy::Skip)
            .compute_images(&class(), &manifest(), stall_on_slow, None)
            .await
            .unwrap();

        let names: Vec<&str> = records.iter().map(|r| r[0].im_name.as_str()).collect();
        assert_eq!(names, vec!["a_202001cor.tif", "c_202003cor.tif"]);
        assert_eq!(skipped.len(), 1);
        assert_eq!(skipped[0].image, PathBuf::from("slow_202002cor.tif"));
        assert!(skipped[0].reason.contains("timeout"));
    }

    #[tokio::test]
    async fn test_no_timeout_waits_for_every_image() {
        let (records, skipped) = controller(ErrorPolicy::Abort)
            .with_image_timeout(None)
            .compute_images(&class(), &manifest(), stall_on_slow, None)
            .await
            .unwrap();
        assert_eq!(records.len(), 3);
        assert!(skipped.is_empty());
    }

    #[test]
    fn test_report_totals() {
        let class = |rows, files: usize| ClassReport {
            label: "x".to_string(),
            images: 3,
            rows,
            files: vec![PathBuf::from("f"); files],
            parquet: None,
            skipped: vec![],
        };
        let report = RunReport {
            classes: vec![class(6, 2), class(4, 1)],
            ..RunReport::default()
        };
        assert_eq!(report.images(), 6);
        assert_eq!(report.rows(), 10);
        assert_eq!(report.files(), 3);
        assert!(report.to_string().contains("Failed classes: 0"));
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = PipelineConfig {
            max_workers: 0,
            ..PipelineConfig::default()
        };
        assert!(PipelineController::new(config).is_err());
    }
}
