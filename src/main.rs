use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use pbr_spheres::{AppConfig, run};

fn try_main() -> Result<()> {
    let config = AppConfig::default();
    tracing::info!(title = %config.title, "pbr-spheres starting");
    run(config).context("pbr-spheres failed to start")
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            println!("{err:#}");
            tracing::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
