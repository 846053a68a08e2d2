use std::io;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing::{info, Level};
use tracing_subscriber::{self, EnvFilter};

mod catalog;
mod filters;
mod loader;
mod paginate;
mod plotting;
mod session;
mod stats;

use catalog::Catalog;
use session::Session;

#[derive(Parser)]
#[command(name = "bikeshare-explorer")]
#[command(about = "Explore US bikeshare trip data interactively")]
#[command(version = "0.1.0")]
struct Cli {
    /// Directory containing the city CSV files
    #[arg(short, long, default_value = ".")]
    data_dir: PathBuf,

    /// YAML file mapping city names to CSV paths
    #[arg(long)]
    catalog: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // The aggregations here never warrant a full thread fan-out.
    let max_polars_threads = std::cmp::min(4, num_cpus::get());
    std::env::set_var("POLARS_MAX_THREADS", max_polars_threads.to_string());

    let base_level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(base_level)
        .with_env_filter(EnvFilter::new(format!(
            "bikeshare_explorer={}",
            if cli.verbose { "debug" } else { "info" }
        )))
        .init();

    info!("Starting bikeshare-explorer v{}", env!("CARGO_PKG_VERSION"));

    let catalog = match &cli.catalog {
        Some(path) => Catalog::from_yaml(path)?,
        None => Catalog::with_data_dir(&cli.data_dir),
    };

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout();
    Session::new(catalog).run(&mut input, &mut output)
}
