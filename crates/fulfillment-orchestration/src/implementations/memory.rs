//! In-memory orchestration engine client.
//!
//! Records every call instead of driving a real engine. Used in tests and
//! local development: launcher and callback logic can assert which
//! executions were started, stopped, and resumed.

use crate::{
	ExecutionRef, OrchestrationError, OrchestrationFactory, OrchestrationInterface,
	OrchestrationRegistry,
};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};
use std::sync::Arc;
use tokio::sync::RwLock;

/// One recorded execution.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
	pub execution: ExecutionRef,
	pub payload: serde_json::Value,
	pub running: bool,
	pub stop_reason: Option<String>,
}

/// One recorded resumption.
#[derive(Debug, Clone)]
pub struct Resumption {
	pub token: String,
	pub outcome: Result<serde_json::Value, String>,
}

#[derive(Default)]
struct EngineState {
	executions: Vec<ExecutionRecord>,
	resumptions: Vec<Resumption>,
	next_id: u64,
}

/// Recording in-memory engine client.
#[derive(Clone, Default)]
pub struct MemoryOrchestrator {
	state: Arc<RwLock<EngineState>>,
}

impl MemoryOrchestrator {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns all recorded executions, running or stopped.
	pub async fn executions(&self) -> Vec<ExecutionRecord> {
		self.state.read().await.executions.clone()
	}

	/// Returns all recorded resumptions.
	pub async fn resumptions(&self) -> Vec<Resumption> {
		self.state.read().await.resumptions.clone()
	}
}

#[async_trait]
impl OrchestrationInterface for MemoryOrchestrator {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(MemoryOrchestratorSchema)
	}

	async fn start(
		&self,
		name: &str,
		payload: &serde_json::Value,
	) -> Result<ExecutionRef, OrchestrationError> {
		let mut state = self.state.write().await;
		if state
			.executions
			.iter()
			.any(|r| r.running && r.execution.name == name)
		{
			return Err(OrchestrationError::ExecutionConflict(name.to_string()));
		}

		state.next_id += 1;
		let execution = ExecutionRef {
			id: format!("exec-{}", state.next_id),
			name: name.to_string(),
		};
		state.executions.push(ExecutionRecord {
			execution: execution.clone(),
			payload: payload.clone(),
			running: true,
			stop_reason: None,
		});
		Ok(execution)
	}

	async fn list_running(&self, prefix: &str) -> Result<Vec<ExecutionRef>, OrchestrationError> {
		let state = self.state.read().await;
		Ok(state
			.executions
			.iter()
			.filter(|r| r.running && r.execution.name.starts_with(prefix))
			.map(|r| r.execution.clone())
			.collect())
	}

	async fn stop(
		&self,
		execution: &ExecutionRef,
		reason: &str,
	) -> Result<(), OrchestrationError> {
		let mut state = self.state.write().await;
		let record = state
			.executions
			.iter_mut()
			.find(|r| r.execution.id == execution.id)
			.ok_or_else(|| {
				OrchestrationError::Engine(format!("unknown execution {}", execution.id))
			})?;
		record.running = false;
		record.stop_reason = Some(reason.to_string());
		Ok(())
	}

	async fn resume_success(
		&self,
		token: &str,
		payload: &serde_json::Value,
	) -> Result<(), OrchestrationError> {
		let mut state = self.state.write().await;
		state.resumptions.push(Resumption {
			token: token.to_string(),
			outcome: Ok(payload.clone()),
		});
		Ok(())
	}

	async fn resume_failure(&self, token: &str, error: &str) -> Result<(), OrchestrationError> {
		let mut state = self.state.write().await;
		state.resumptions.push(Resumption {
			token: token.to_string(),
			outcome: Err(error.to_string()),
		});
		Ok(())
	}
}

/// Configuration schema for the memory engine client.
pub struct MemoryOrchestratorSchema;

impl ConfigSchema for MemoryOrchestratorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		// No configuration required
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a memory engine client from configuration.
pub fn create_orchestrator(
	_config: &toml::Value,
) -> Result<Box<dyn OrchestrationInterface>, OrchestrationError> {
	Ok(Box::new(MemoryOrchestrator::new()))
}

/// Registry entry for the memory engine client.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "memory";
	type Factory = OrchestrationFactory;

	fn factory() -> Self::Factory {
		create_orchestrator
	}
}

impl OrchestrationRegistry for Registry {}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn test_start_conflicts_on_running_name() {
		let engine = MemoryOrchestrator::new();
		let payload = serde_json::json!({"order_id": "p-1"});

		engine.start("order-p-1-a", &payload).await.unwrap();
		let result = engine.start("order-p-1-a", &payload).await;
		assert!(matches!(
			result,
			Err(OrchestrationError::ExecutionConflict(_))
		));
	}

	#[tokio::test]
	async fn test_stop_removes_from_running_list() {
		let engine = MemoryOrchestrator::new();
		let payload = serde_json::json!({});

		let execution = engine.start("order-p-1-a", &payload).await.unwrap();
		assert_eq!(engine.list_running("order-p-1").await.unwrap().len(), 1);

		engine.stop(&execution, "superseded").await.unwrap();
		assert!(engine.list_running("order-p-1").await.unwrap().is_empty());

		// Same name may start again once the prior run is stopped.
		engine.start("order-p-1-a", &payload).await.unwrap();
	}

	#[tokio::test]
	async fn test_resumptions_are_recorded() {
		let engine = MemoryOrchestrator::new();
		engine
			.resume_success("tok-1", &serde_json::json!({"confirmed": true}))
			.await
			.unwrap();

		let resumptions = engine.resumptions().await;
		assert_eq!(resumptions.len(), 1);
		assert_eq!(resumptions[0].token, "tok-1");
		assert!(resumptions[0].outcome.is_ok());
	}
}
