//! Orchestration engine client module for the fulfillment workflow system.
//!
//! The stage sequence is driven by an external durable-execution engine.
//! This module defines the contract the core requires from that engine:
//! starting executions under collision-free names, enumerating and stopping
//! running executions, and resuming an execution suspended on a
//! continuation token. The engine's own execution semantics are out of
//! scope.

use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod http;
	pub mod memory;
}

/// Errors that can occur when talking to the orchestration engine.
#[derive(Debug, Error)]
pub enum OrchestrationError {
	/// Error that occurs when an execution with the same name is already
	/// running.
	#[error("Execution already exists: {0}")]
	ExecutionConflict(String),
	/// Error that occurs when a continuation token is unknown to the
	/// engine.
	#[error("Unknown continuation token")]
	UnknownToken,
	/// Error that occurs in the engine or while reaching it.
	#[error("Engine error: {0}")]
	Engine(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Handle to one engine execution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionRef {
	/// Engine-assigned execution identifier.
	pub id: String,
	/// The name the execution was started under.
	pub name: String,
}

/// Trait defining the interface to the durable-execution engine.
#[async_trait]
pub trait OrchestrationInterface: Send + Sync {
	/// Returns the configuration schema for this engine client.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Starts a new execution under the given name with the canonical
	/// initial payload. Fails with
	/// [`OrchestrationError::ExecutionConflict`] when the name collides
	/// with a live execution.
	async fn start(
		&self,
		name: &str,
		payload: &serde_json::Value,
	) -> Result<ExecutionRef, OrchestrationError>;

	/// Lists running executions whose name starts with `prefix`.
	async fn list_running(&self, prefix: &str) -> Result<Vec<ExecutionRef>, OrchestrationError>;

	/// Requests cancellation of a running execution.
	async fn stop(&self, execution: &ExecutionRef, reason: &str)
		-> Result<(), OrchestrationError>;

	/// Resumes a suspended execution with a success payload.
	async fn resume_success(
		&self,
		token: &str,
		payload: &serde_json::Value,
	) -> Result<(), OrchestrationError>;

	/// Resumes a suspended execution with a failure.
	async fn resume_failure(&self, token: &str, error: &str) -> Result<(), OrchestrationError>;
}

/// Type alias for orchestration factory functions.
pub type OrchestrationFactory =
	fn(&toml::Value) -> Result<Box<dyn OrchestrationInterface>, OrchestrationError>;

/// Registry trait for orchestration implementations.
pub trait OrchestrationRegistry: ImplementationRegistry<Factory = OrchestrationFactory> {}

/// Get all registered orchestration implementations.
pub fn get_all_implementations() -> Vec<(&'static str, OrchestrationFactory)> {
	use implementations::{http, memory};

	vec![
		(http::Registry::NAME, http::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Service wrapper around the configured engine client.
pub struct OrchestrationService {
	client: Box<dyn OrchestrationInterface>,
}

impl OrchestrationService {
	/// Creates a new OrchestrationService with the specified client.
	pub fn new(client: Box<dyn OrchestrationInterface>) -> Self {
		Self { client }
	}

	pub async fn start(
		&self,
		name: &str,
		payload: &serde_json::Value,
	) -> Result<ExecutionRef, OrchestrationError> {
		self.client.start(name, payload).await
	}

	pub async fn list_running(
		&self,
		prefix: &str,
	) -> Result<Vec<ExecutionRef>, OrchestrationError> {
		self.client.list_running(prefix).await
	}

	pub async fn stop(
		&self,
		execution: &ExecutionRef,
		reason: &str,
	) -> Result<(), OrchestrationError> {
		self.client.stop(execution, reason).await
	}

	pub async fn resume_success(
		&self,
		token: &str,
		payload: &serde_json::Value,
	) -> Result<(), OrchestrationError> {
		self.client.resume_success(token, payload).await
	}

	pub async fn resume_failure(&self, token: &str, error: &str) -> Result<(), OrchestrationError> {
		self.client.resume_failure(token, error).await
	}
}
