//! Main entry point for the fulfillment workflow service.
//!
//! This binary assembles the order-fulfillment stack from configuration
//! and serves its HTTP API. Storage, orchestration-engine, and
//! notification backends are pluggable; each is selected by name and
//! constructed through its implementation registry.

use clap::Parser;
use fulfillment_config::{ApiConfig, Config};
use std::path::PathBuf;

mod builder;
mod server;
mod transport;

/// Command-line arguments for the fulfillment service.
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

	tracing::info!("Started fulfillment service");

	let config = Config::from_file(&args.config)?;
	tracing::info!(
		storage = %config.storage.backend,
		orchestration = %config.orchestration.backend,
		notification = %config.notification.backend,
		"Loaded configuration"
	);

	let stack = builder::build_stack(&config)?;

	let api_config = config.api.clone().unwrap_or_else(|| ApiConfig {
		host: "127.0.0.1".to_string(),
		port: 8080,
	});
	server::start_server(api_config, stack).await?;

	tracing::info!("Stopped fulfillment service");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_args_default_values() {
		let args = Args {
			config: PathBuf::from("config.toml"),
			log_level: "info".to_string(),
		};

		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_config_file_loads_and_builds() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("config.toml");
		let content = format!(
			r#"
			[workflow]
			allocation_retries = 2

			[storage]
			backend = "file"
			config = {{ storage_path = "{}" }}

			[orchestration]
			backend = "memory"

			[notification]
			backend = "log"

			[api]
			port = 8099
			"#,
			dir.path().join("data").display()
		);
		std::fs::write(&path, content).unwrap();

		let config = Config::from_file(&path).unwrap();
		assert_eq!(config.workflow.allocation_retries, 2);
		assert_eq!(config.api.as_ref().unwrap().port, 8099);

		let stack = builder::build_stack(&config);
		assert!(stack.is_ok());
	}
}
