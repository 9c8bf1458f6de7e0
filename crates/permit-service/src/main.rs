//! Main entry point for the permit service.
//!
//! This binary wires the engine together from configuration: it selects a
//! storage backend, computes the domain binding, starts the audit task that
//! logs applied permits, and serves the HTTP API.

use clap::Parser;
use permit_config::{Config, StorageBackend};
use permit_core::{DomainBinder, PermitEngine};
use permit_storage::{FileStorage, MemoryStorage, StorageInterface, StorageService};
use permit_types::{address_hex, PermitEvent};
use std::path::PathBuf;
use std::sync::Arc;

mod server;

/// Command-line arguments for the permit service.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	log_level: String,
}

/// Main entry point for the permit service.
///
/// This function:
/// 1. Parses command-line arguments
/// 2. Initializes logging infrastructure
/// 3. Loads configuration from file
/// 4. Builds the engine over the configured storage backend
/// 5. Serves the API until interrupted
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let default_directive = args.log_level.to_string();
	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive));

	fmt()
		.with_env_filter(env_filter)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	tracing::info!("Started permit service");

	// Load configuration
	let config = Config::from_file(&args.config)?;
	tracing::info!(
		domain = %config.domain.name,
		chain_id = config.domain.chain_id,
		"Loaded configuration"
	);

	// Build the engine
	let backend: Box<dyn StorageInterface> = match config.storage.backend {
		StorageBackend::Memory => Box::new(MemoryStorage::new()),
		StorageBackend::File => {
			// Validation guarantees a path for the file backend
			let path = config.storage.path.clone().unwrap_or_default();
			Box::new(FileStorage::new(path))
		}
	};
	let storage = Arc::new(StorageService::new(backend));
	let domain = DomainBinder::from_config(&config.domain)?;
	let engine = Arc::new(PermitEngine::new(domain, storage));

	// Audit task: log every applied permit. Best-effort by design; a lagged
	// receiver skips ahead rather than stopping the engine.
	let mut events = engine.event_bus().subscribe();
	tokio::spawn(async move {
		loop {
			match events.recv().await {
				Ok(PermitEvent::Approval {
					owner,
					spender,
					value,
				}) => {
					tracing::info!(
						owner = %address_hex(&owner),
						spender = %address_hex(&spender),
						%value,
						"Approval recorded"
					);
				}
				Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
					tracing::warn!(missed, "Audit task lagged behind the event bus");
				}
				Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
			}
		}
	});

	if let Some(api_config) = config.api.clone().filter(|api| api.enabled) {
		let api_task = server::start_server(api_config, Arc::clone(&engine));

		tokio::select! {
			result = api_task => {
				tracing::info!("API server finished");
				result?;
			}
			_ = tokio::signal::ctrl_c() => {
				tracing::info!("Received shutdown signal");
			}
		}
	} else {
		tracing::info!("API disabled; waiting for shutdown signal");
		tokio::signal::ctrl_c().await?;
	}

	tracing::info!("Stopped permit service");
	Ok(())
}
