pub mod args;
pub mod commands;

pub use args::{Cli, Commands, DiscoveryArgs};
pub use commands::run;
