//! HTTP orchestration engine client.
//!
//! Talks to a durable-execution engine over a small JSON REST surface:
//! `POST /executions` to start, `GET /executions` to enumerate running
//! ones, `POST /executions/{id}/stop` to cancel, and
//! `POST /callbacks/{success,failure}` to resume a suspended execution by
//! continuation token.

use crate::{
	ExecutionRef, OrchestrationError, OrchestrationFactory, OrchestrationInterface,
	OrchestrationRegistry,
};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// HTTP engine client.
pub struct HttpOrchestrator {
	client: reqwest::Client,
	base_url: String,
}

impl HttpOrchestrator {
	pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, OrchestrationError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;
		Ok(Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		})
	}

	fn url(&self, path: &str) -> String {
		format!("{}{}", self.base_url, path)
	}
}

#[derive(Deserialize)]
struct StartResponse {
	execution_id: String,
}

#[derive(Deserialize)]
struct ListResponse {
	executions: Vec<ExecutionRef>,
}

#[async_trait]
impl OrchestrationInterface for HttpOrchestrator {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(HttpOrchestratorSchema)
	}

	async fn start(
		&self,
		name: &str,
		payload: &serde_json::Value,
	) -> Result<ExecutionRef, OrchestrationError> {
		let response = self
			.client
			.post(self.url("/executions"))
			.json(&serde_json::json!({ "name": name, "input": payload }))
			.send()
			.await
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;

		match response.status() {
			StatusCode::CONFLICT => Err(OrchestrationError::ExecutionConflict(name.to_string())),
			status if status.is_success() => {
				let body: StartResponse = response
					.json()
					.await
					.map_err(|e| OrchestrationError::Engine(e.to_string()))?;
				Ok(ExecutionRef {
					id: body.execution_id,
					name: name.to_string(),
				})
			},
			status => Err(OrchestrationError::Engine(format!(
				"start returned {}",
				status
			))),
		}
	}

	async fn list_running(&self, prefix: &str) -> Result<Vec<ExecutionRef>, OrchestrationError> {
		let response = self
			.client
			.get(self.url("/executions"))
			.query(&[("status", "running"), ("prefix", prefix)])
			.send()
			.await
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?
			.error_for_status()
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;

		let body: ListResponse = response
			.json()
			.await
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;
		Ok(body.executions)
	}

	async fn stop(
		&self,
		execution: &ExecutionRef,
		reason: &str,
	) -> Result<(), OrchestrationError> {
		self.client
			.post(self.url(&format!("/executions/{}/stop", execution.id)))
			.json(&serde_json::json!({ "reason": reason }))
			.send()
			.await
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?
			.error_for_status()
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;
		Ok(())
	}

	async fn resume_success(
		&self,
		token: &str,
		payload: &serde_json::Value,
	) -> Result<(), OrchestrationError> {
		let response = self
			.client
			.post(self.url("/callbacks/success"))
			.json(&serde_json::json!({ "token": token, "output": payload }))
			.send()
			.await
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;

		match response.status() {
			StatusCode::NOT_FOUND => Err(OrchestrationError::UnknownToken),
			status if status.is_success() => Ok(()),
			status => Err(OrchestrationError::Engine(format!(
				"resume returned {}",
				status
			))),
		}
	}

	async fn resume_failure(&self, token: &str, error: &str) -> Result<(), OrchestrationError> {
		let response = self
			.client
			.post(self.url("/callbacks/failure"))
			.json(&serde_json::json!({ "token": token, "error": error }))
			.send()
			.await
			.map_err(|e| OrchestrationError::Engine(e.to_string()))?;

		match response.status() {
			StatusCode::NOT_FOUND => Err(OrchestrationError::UnknownToken),
			status if status.is_success() => Ok(()),
			status => Err(OrchestrationError::Engine(format!(
				"resume returned {}",
				status
			))),
		}
	}
}

/// Configuration schema for the HTTP engine client.
pub struct HttpOrchestratorSchema;

impl ConfigSchema for HttpOrchestratorSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("base_url", FieldType::String)],
			vec![Field::new(
				"timeout_secs",
				FieldType::Integer {
					min: Some(1),
					max: Some(300),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create an HTTP engine client from configuration.
///
/// Configuration parameters:
/// - `base_url`: engine endpoint (required)
/// - `timeout_secs`: request timeout, default 30 (optional)
pub fn create_orchestrator(
	config: &toml::Value,
) -> Result<Box<dyn OrchestrationInterface>, OrchestrationError> {
	HttpOrchestratorSchema
		.validate(config)
		.map_err(|e| OrchestrationError::Configuration(e.to_string()))?;

	let base_url = config
		.get("base_url")
		.and_then(|v| v.as_str())
		.ok_or_else(|| OrchestrationError::Configuration("base_url is required".into()))?;
	let timeout_secs = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(30) as u64;

	Ok(Box::new(HttpOrchestrator::new(
		base_url,
		Duration::from_secs(timeout_secs),
	)?))
}

/// Registry entry for the HTTP engine client.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "http";
	type Factory = OrchestrationFactory;

	fn factory() -> Self::Factory {
		create_orchestrator
	}
}

impl OrchestrationRegistry for Registry {}
