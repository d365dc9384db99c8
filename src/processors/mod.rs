pub mod aggregator;
pub mod classifier;
pub mod correction;
pub mod manifest;
pub mod pipeline;
pub mod statistics;
pub mod zonal_engine;

pub use aggregator::{aggregate, SitePartitioner};
pub use classifier::{ClassFailure, Classification, ImageClass, NamingClassifier};
pub use correction::correct;
pub use manifest::{Manifest, ManifestBuilder};
pub use pipeline::{ClassReport, FailedClass, PipelineController, RunReport, SkippedImage};
pub use statistics::compute_statistics;
pub use zonal_engine::ZonalStatsEngine;
