//! Wires configured backend implementations into the workflow stack.
//!
//! Each pluggable concern (storage, orchestration, notification) is
//! selected by name from its crate's registry and constructed through
//! its factory, which validates the implementation-specific
//! configuration table before returning.

use fulfillment_config::Config;
use fulfillment_notify::NotificationService;
use fulfillment_orchestration::OrchestrationService;
use fulfillment_pool::StaffPool;
use fulfillment_storage::stores::orders::OrderStore;
use fulfillment_storage::stores::users::UserStore;
use fulfillment_storage::stores::workers::WorkerStore;
use fulfillment_storage::StorageService;
use fulfillment_workflow::{
	CallbackRegistry, FinalizeHandler, RecoveryCoordinator, StageEngine, StageHandler,
	TimingProfile, WorkflowLauncher,
};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while assembling the service.
#[derive(Debug, Error)]
pub enum BuildError {
	/// The configured backend name has no registered implementation.
	#[error("Unknown {kind} implementation: {name}")]
	UnknownImplementation { kind: &'static str, name: String },
	/// A backend factory rejected its configuration.
	#[error("Failed to construct {kind} backend: {reason}")]
	Factory { kind: &'static str, reason: String },
}

/// The assembled workflow stack shared by all request handlers.
#[derive(Clone)]
pub struct FulfillmentStack {
	pub orders: Arc<OrderStore>,
	pub workers: Arc<WorkerStore>,
	pub users: Arc<UserStore>,
	pub stages: Arc<StageHandler>,
	pub finalize: Arc<FinalizeHandler>,
	pub callbacks: Arc<CallbackRegistry>,
	pub recovery: Arc<RecoveryCoordinator>,
	pub launcher: Arc<WorkflowLauncher>,
}

/// Builds the full stack from configuration.
pub fn build_stack(config: &Config) -> Result<FulfillmentStack, BuildError> {
	let backend = instantiate(
		"storage",
		&config.storage.backend,
		&config.storage.config,
		fulfillment_storage::get_all_implementations(),
	)?;
	let engine_client = instantiate(
		"orchestration",
		&config.orchestration.backend,
		&config.orchestration.config,
		fulfillment_orchestration::get_all_implementations(),
	)?;
	let channel = instantiate(
		"notification",
		&config.notification.backend,
		&config.notification.config,
		fulfillment_notify::get_all_implementations(),
	)?;

	let service = Arc::new(StorageService::new(backend));
	let orders = Arc::new(OrderStore::new(service.clone()));
	let workers = Arc::new(WorkerStore::new(service.clone()));
	let users = Arc::new(UserStore::new(service));

	let orchestration = Arc::new(OrchestrationService::new(engine_client));
	let notifier = Arc::new(NotificationService::new(channel));

	let pool = Arc::new(
		StaffPool::new(workers.clone())
			.with_allocation_retries(config.workflow.allocation_retries),
	);
	let timing = TimingProfile::new(config.workflow.realistic_timings);
	let engine = Arc::new(StageEngine::new(orders.clone(), timing));

	let stages = Arc::new(StageHandler::new(pool.clone(), engine.clone()));
	let finalize = Arc::new(FinalizeHandler::new(pool.clone(), engine, users.clone()));
	let callbacks = Arc::new(CallbackRegistry::new(
		orders.clone(),
		orchestration.clone(),
		notifier,
	));
	let recovery = Arc::new(RecoveryCoordinator::new(orders.clone(), pool));
	let launcher = Arc::new(WorkflowLauncher::new(orchestration, recovery.clone()));

	Ok(FulfillmentStack {
		orders,
		workers,
		users,
		stages,
		finalize,
		callbacks,
		recovery,
		launcher,
	})
}

/// Looks up a named factory in a registry listing and runs it.
fn instantiate<T: ?Sized, E: std::fmt::Display>(
	kind: &'static str,
	name: &str,
	config: &toml::Value,
	implementations: Vec<(&'static str, fn(&toml::Value) -> Result<Box<T>, E>)>,
) -> Result<Box<T>, BuildError> {
	let factory = implementations
		.into_iter()
		.find(|(registered, _)| *registered == name)
		.map(|(_, factory)| factory)
		.ok_or_else(|| BuildError::UnknownImplementation {
			kind,
			name: name.to_string(),
		})?;

	factory(config).map_err(|e| BuildError::Factory {
		kind,
		reason: e.to_string(),
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	fn config(storage: &str, orchestration: &str, notification: &str) -> Config {
		format!(
			r#"
			[storage]
			backend = "{}"
			[orchestration]
			backend = "{}"
			[notification]
			backend = "{}"
			"#,
			storage, orchestration, notification
		)
		.parse()
		.unwrap()
	}

	#[tokio::test]
	async fn test_builds_with_memory_backends() {
		let stack = build_stack(&config("memory", "memory", "log")).unwrap();
		// The stores share one backend; a worker written through the stack
		// is visible to the pool paths.
		let worker = fulfillment_types::Worker {
			location: "loc-1".into(),
			id: "w-1".into(),
			first_name: "Eva".into(),
			last_name: "Soto".into(),
			role: fulfillment_types::StaffRole::Cook,
			busy: false,
			rating: 4.0,
		};
		stack.workers.put(&worker).await.unwrap();
		assert!(stack.workers.get("loc-1", "w-1").await.is_ok());
	}

	#[test]
	fn test_unknown_backend_name_is_rejected() {
		let result = build_stack(&config("redis", "memory", "log"));
		assert!(matches!(
			result,
			Err(BuildError::UnknownImplementation { kind: "storage", .. })
		));
	}

	#[test]
	fn test_factory_rejects_invalid_config() {
		// The file backend requires storage_path.
		let result = build_stack(&config("file", "memory", "log"));
		assert!(matches!(result, Err(BuildError::Factory { kind: "storage", .. })));
	}

	#[test]
	fn test_http_orchestrator_requires_base_url() {
		let result = build_stack(&config("memory", "http", "log"));
		assert!(matches!(
			result,
			Err(BuildError::Factory {
				kind: "orchestration",
				..
			})
		));
	}
}
