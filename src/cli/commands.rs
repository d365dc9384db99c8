use crate::cli::args::{Cli, Commands, DiscoveryArgs};
use crate::config::PipelineConfig;
use crate::error::{ProcessingError, Result};
use crate::processors::{ManifestBuilder, PipelineController};
use crate::readers::ZoneSource;
use crate::utils::progress::ProgressReporter;
use crate::workspace::Workspace;
use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::{info, Level};

pub async fn run(cli: Cli) -> Result<()> {
    init_logging(cli.verbose, cli.log_file.as_deref())?;
    let mut config = PipelineConfig::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run {
            input_dir,
            zones,
            output_dir,
            discovery,
            nodata,
            max_workers,
            timeout,
            error_policy,
            no_correction,
            all_statistics,
            sort_by_date,
            parquet,
            compression,
        } => {
            apply_discovery(&mut config, discovery);
            if let Some(nodata) = nodata {
                config.nodata = nodata;
            }
            if let Some(workers) = max_workers {
                config.max_workers = workers;
            }
            if let Some(seconds) = timeout {
                config.image_timeout_secs = seconds;
            }
            if let Some(policy) = error_policy {
                config.error_policy = policy;
            }
            if let Some(compression) = compression {
                config.parquet_compression = compression;
            }
            config.apply_correction &= !no_correction;
            config.all_statistics |= all_statistics;
            config.sort_by_date |= sort_by_date;
            config.parquet_export |= parquet;

            println!("Extracting zonal statistics...");
            println!("Input directory: {}", input_dir.display());
            println!("Zones: {}", zones.display());
            println!(
                "Workers: {}, error policy: {:?}",
                config.max_workers, config.error_policy
            );

            let controller = PipelineController::new(config)?;
            let zone_set = ZoneSource::open(&zones)?;
            if zone_set.is_empty() {
                return Err(ProcessingError::InvalidFormat(format!(
                    "Zone source {} holds no zones",
                    zones.display()
                )));
            }
            info!("Loaded {} zones from {}", zone_set.len(), zones.display());

            let mut workspace = Workspace::create(&output_dir)?;
            workspace.persist_zones(&zone_set)?;

            let progress = ProgressReporter::new(0, "Classifying directories...", cli.quiet);
            let report = controller
                .run(&workspace, &input_dir, Some(&progress))
                .await?;
            progress.finish_with_message(&format!("Wrote {} site files", report.files()));

            println!("\n{}", report);
            println!("Output written to {}", workspace.export_dir().display());
        }

        Commands::Classify {
            input_dir,
            discovery,
        } => {
            apply_discovery(&mut config, discovery);
            let controller = PipelineController::new(config)?;
            let classification = controller.classify(&input_dir)?;

            println!("Naming classes under {}:", input_dir.display());
            for class in &classification.classes {
                println!("  {}", class);
            }
            for failure in &classification.failures {
                println!("  FAILED {}: {}", failure.directory.display(), failure.error);
            }
            println!(
                "{} classes, {} failed, {} ignored",
                classification.classes.len(),
                classification.failures.len(),
                classification.ignored.len()
            );
        }

        Commands::List {
            directory,
            extension,
            output,
        } => {
            let extension = extension.unwrap_or(config.extension);
            let manifest = ManifestBuilder::new(extension).build(&directory)?;

            match output {
                Some(path) => {
                    if let Some(parent) = path.parent() {
                        std::fs::create_dir_all(parent)?;
                    }
                    manifest.write(&path)?;
                    println!("Listed {} images in {}", manifest.len(), path.display());
                }
                None => {
                    for image in &manifest {
                        println!("{}", image.display());
                    }
                }
            }
        }
    }

    Ok(())
}

fn apply_discovery(config: &mut PipelineConfig, discovery: DiscoveryArgs) {
    if let Some(extension) = discovery.extension {
        config.extension = extension;
    }
    if discovery.prefix_depth.is_some() {
        config.prefix_depth = discovery.prefix_depth;
    }
}

/// stderr logging at INFO, or DEBUG with `--verbose`. A log file replaces
/// stderr and is written without colour codes.
fn init_logging(verbose: bool, log_file: Option<&Path>) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let builder = tracing_subscriber::fmt().with_max_level(level).with_target(false);

    let result = match log_file {
        Some(path) => builder
            .with_ansi(false)
            .with_writer(Mutex::new(File::create(path)?))
            .try_init(),
        None => builder.with_writer(std::io::stderr).try_init(),
    };
    result.map_err(|e| ProcessingError::Config(format!("Cannot initialise logging: {}", e)))
}
