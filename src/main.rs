use clap::Parser;
use log::info;
use sift::{App, Cli, Result};

pub fn initialize_logger(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .format_module_path(true)
        .init();

    info!("Logger initialized");
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logger(cli.verbose);

    info!("Sift storage layer starting up");

    let config = cli.into_config()?;
    let result = App::new(config).run().await;

    info!("Sift storage layer shutting down");
    result
}
