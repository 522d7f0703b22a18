//! Configuration module for the fulfillment workflow system.
//!
//! This module provides structures and utilities for managing workflow
//! configuration. It supports loading configuration from TOML files with
//! `${ENV_VAR}` substitution and provides validation to ensure all required
//! configuration values are properly set before the service starts.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Extract just the message without the huge input dump
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the fulfillment service.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Workflow tunables.
	#[serde(default)]
	pub workflow: WorkflowConfig,
	/// Configuration for the storage backend.
	pub storage: BackendConfig,
	/// Configuration for the orchestration engine client.
	pub orchestration: BackendConfig,
	/// Configuration for the notification channel.
	pub notification: BackendConfig,
	/// Configuration for the HTTP API server.
	pub api: Option<ApiConfig>,
}

/// Workflow tunables.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkflowConfig {
	/// Bounded retry count for the find-then-allocate loop.
	#[serde(default = "default_allocation_retries")]
	pub allocation_retries: usize,
	/// Use realistic stage durations (minutes) instead of demo-scale
	/// durations (seconds).
	#[serde(default)]
	pub realistic_timings: bool,
}

impl Default for WorkflowConfig {
	fn default() -> Self {
		Self {
			allocation_retries: default_allocation_retries(),
			realistic_timings: false,
		}
	}
}

fn default_allocation_retries() -> usize {
	3
}

/// Selects and configures one pluggable backend implementation.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BackendConfig {
	/// Name of the implementation, matching its registry entry.
	pub backend: String,
	/// Implementation-specific configuration table, validated by the
	/// implementation's own schema at construction time.
	#[serde(default = "empty_table")]
	pub config: toml::Value,
}

fn empty_table() -> toml::Value {
	toml::Value::Table(toml::map::Map::new())
}

/// Configuration for the HTTP API server.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiConfig {
	#[serde(default = "default_host")]
	pub host: String,
	#[serde(default = "default_port")]
	pub port: u16,
}

fn default_host() -> String {
	"127.0.0.1".to_string()
}

fn default_port() -> u16 {
	8080
}

impl Config {
	/// Loads configuration from a TOML file, resolving `${ENV_VAR}`
	/// references first.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = std::fs::read_to_string(path)?;
		content.parse()
	}

	fn validate(&self) -> Result<(), ConfigError> {
		for (section, backend) in [
			("storage", &self.storage),
			("orchestration", &self.orchestration),
			("notification", &self.notification),
		] {
			if backend.backend.trim().is_empty() {
				return Err(ConfigError::Validation(format!(
					"{}.backend must not be empty",
					section
				)));
			}
		}
		if self.workflow.allocation_retries == 0 {
			return Err(ConfigError::Validation(
				"workflow.allocation_retries must be at least 1".into(),
			));
		}
		Ok(())
	}
}

impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}

/// Replaces `${VAR}` references with the value of the environment variable.
///
/// Fails when a referenced variable is unset, so misconfiguration shows up
/// at startup rather than as an empty value deep in a backend.
pub fn resolve_env_vars(content: &str) -> Result<String, ConfigError> {
	let pattern = Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}")
		.map_err(|e| ConfigError::Parse(e.to_string()))?;

	let mut result = String::with_capacity(content.len());
	let mut last_end = 0;
	for found in pattern.find_iter(content) {
		let name = content[found.start() + 2..found.end() - 1].to_string();
		let value = std::env::var(&name).map_err(|_| {
			ConfigError::Validation(format!("Environment variable {} is not set", name))
		})?;
		result.push_str(&content[last_end..found.start()]);
		result.push_str(&value);
		last_end = found.end();
	}
	result.push_str(&content[last_end..]);
	Ok(result)
}
