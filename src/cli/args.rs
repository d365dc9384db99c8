use crate::config::ErrorPolicy;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "zonal-processor")]
#[command(about = "Per-site zonal statistics from batches of single-band rasters")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    #[arg(short, long, global = true, help = "Enable verbose logging")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Log file path")]
    pub log_file: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Hide progress bars")]
    pub quiet: bool,

    #[arg(short, long, global = true, help = "TOML configuration file")]
    pub config: Option<PathBuf>,
}

/// Settings shared by every subcommand that walks an input tree. Each one
/// overrides the loaded configuration when given.
#[derive(Args, Debug, Clone, Default)]
pub struct DiscoveryArgs {
    #[arg(short, long, help = "Raster file extension [default: .tif]")]
    pub extension: Option<String>,

    #[arg(long, help = "Leading path components excluded from output labels")]
    pub prefix_depth: Option<usize>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the full pipeline over an input tree
    Run {
        #[arg(short, long, help = "Root directory of the raster tree")]
        input_dir: PathBuf,

        #[arg(short, long, help = "GeoJSON zone source with uid and site_name")]
        zones: PathBuf,

        #[arg(short, long, default_value = "output", help = "Export root directory")]
        output_dir: PathBuf,

        #[command(flatten)]
        discovery: DiscoveryArgs,

        #[arg(long, help = "Raster nodata sentinel [default: -1]")]
        nodata: Option<f64>,

        #[arg(long)]
        max_workers: Option<usize>,

        #[arg(long, help = "Per-image timeout in seconds, 0 disables it")]
        timeout: Option<u64>,

        #[arg(long, value_enum)]
        error_policy: Option<ErrorPolicy>,

        #[arg(long, help = "Leave statistics in raster units")]
        no_correction: bool,

        #[arg(long, help = "Write every statistic, not only the mean")]
        all_statistics: bool,

        #[arg(long, help = "Sort each class table by date before writing")]
        sort_by_date: bool,

        #[arg(long, help = "Also export each class table as Parquet")]
        parquet: bool,

        #[arg(long, help = "Parquet compression [default: snappy]")]
        compression: Option<String>,
    },

    /// Show the naming classes found under an input tree
    Classify {
        #[arg(short, long)]
        input_dir: PathBuf,

        #[command(flatten)]
        discovery: DiscoveryArgs,
    },

    /// List the images in one directory
    List {
        #[arg(short, long)]
        directory: PathBuf,

        #[arg(short, long, help = "Raster file extension [default: .tif]")]
        extension: Option<String>,

        #[arg(short, long, help = "Write the listing as a manifest file")]
        output: Option<PathBuf>,
    },
}
