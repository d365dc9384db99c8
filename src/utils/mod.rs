pub mod constants;
pub mod filename;
pub mod progress;

pub use constants::*;
pub use filename::{partition_file_name, sanitize_component, walk_tree, WalkEntry};
pub use progress::ProgressReporter;
