use clap::Parser;
use zonal_processor::cli::{run, Cli};
use zonal_processor::error::Result;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    run(cli).await
}
