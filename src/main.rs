//! fingerd: a minimal finger server
//!
//! Answers RFC 742 queries for local accounts:
//! - Validates the requested login against shell metacharacters
//! - Looks up display name and home directory in the account directory
//! - Reads the login shell from the credential registry
//! - Reports mail forwarding from `~/.forward`
//! - Configuration via CLI arguments or TOML file

mod accounts;
mod config;
mod pipeline;
mod protocols;
mod server;

use config::Config;
use pipeline::Pipeline;
use server::Server;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        listen = %config.listen,
        registry = %config.registry.display(),
        identity_source = ?config.identity_source,
        max_connections = config.max_connections,
        read_timeout = ?config.read_timeout,
        "Starting fingerd"
    );

    if config.require_root && !running_as_root() {
        error!("fingerd must run as root (pass --no-root-check to skip)");
        return Err("not running as root".into());
    }

    let mut builder = tokio::runtime::Builder::new_multi_thread();
    builder.enable_all();
    if let Some(workers) = config.workers {
        builder.worker_threads(workers.max(1));
    }
    let runtime = builder.build()?;

    runtime.block_on(serve(config))
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let pipeline = Pipeline::from_config(&config);
    let server = Server::bind(&config, pipeline).await?;
    server.run().await.map_err(|e| e as Box<dyn std::error::Error>)
}

fn running_as_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() == 0 }
}
