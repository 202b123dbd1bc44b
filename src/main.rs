use clap::Parser;

use coi_server::cli::Cli;
use coi_server::config::Config;
use coi_server::error::ServerError;
use coi_server::{logger, server};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let cfg = Config::load_from(cli.config.as_deref(), &cli.overrides())
        .map_err(ServerError::from)?;

    logger::init(&cfg).map_err(ServerError::Logger)?;

    // Tokio runtime sized by the workers setting
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(server::run(cfg))?;
    Ok(())
}
