//! Main entry point for CLI command to start the gateway.

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::axum_factory::bind;
use crate::axum_factory::make_router;
use crate::axum_factory::serve;
use crate::configuration::Configuration;
use crate::state::GatewayState;
use crate::state::StateHandle;

/// Options for the gateway
#[derive(Parser, Debug)]
#[clap(name = "feder", about = "GraphQL federation gateway")]
pub(crate) struct Opt {
    /// Log level (off|error|warn|info|debug|trace).
    #[clap(
        long = "log",
        default_value = "info",
        alias = "log-level",
        env = "FEDER_LOG"
    )]
    log_level: String,

    /// Configuration file listing the subgraphs to federate.
    #[clap(short, long = "config", env = "FEDER_CONFIG_PATH")]
    config_path: PathBuf,
}

/// This is the main gateway entrypoint.
pub fn main() -> Result<()> {
    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(nb) = std::env::var("FEDER_NUM_CORES")
        .ok()
        .and_then(|value| value.parse::<usize>().ok())
    {
        builder.worker_threads(nb);
    }
    let runtime = builder.build()?;
    runtime.block_on(start(Opt::parse()))
}

async fn start(opt: Opt) -> Result<()> {
    let builder = tracing_subscriber::fmt::fmt().with_env_filter(
        EnvFilter::try_new(&opt.log_level).context("could not parse log configuration")?,
    );
    if std::io::stdout().is_terminal() {
        builder.init();
    } else {
        builder.json().init();
    }

    let current_directory = std::env::current_dir()?;
    let config_path = if opt.config_path.is_relative() {
        current_directory.join(&opt.config_path)
    } else {
        opt.config_path.clone()
    };
    let configuration = Configuration::load(&config_path)?;

    tracing::info!(
        subgraphs = configuration.subgraphs.len(),
        "fetching subgraph schemas"
    );
    let state = GatewayState::build(&configuration).await?;
    let handle = StateHandle::new(state);

    let listener = bind(configuration.server.listen).await?;
    let address = listener.local_addr()?;
    tracing::info!(
        "GraphQL endpoint exposed at http://{}{} 🚀",
        address,
        configuration.server.path
    );

    let router = make_router(handle, &configuration.server);
    if let Err(err) = serve(listener, router, shutdown_signal()).await {
        tracing::error!("{}", err);
        return Err(err.into());
    }
    tracing::info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "could not listen for the shutdown signal");
    }
}
