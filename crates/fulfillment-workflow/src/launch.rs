//! Workflow launch with supersession.
//!
//! Executions are named `order-{order_id}-{suffix}` so every execution
//! for one order shares a discoverable prefix. Re-launching finds any
//! still-running execution under that prefix, stops it, reclaims the
//! workers it stranded, and only then starts the replacement. The fresh
//! random suffix keeps the new start from colliding with the name of
//! the one just stopped.

use crate::{require, WorkflowError};
use crate::recovery::RecoveryCoordinator;
use fulfillment_orchestration::OrchestrationService;
use fulfillment_types::{LaunchReceipt, LaunchRequest, LiberateRequest};
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const SUPERSEDE_REASON: &str = "superseded by relaunch";

/// Starts workflow executions, stopping and cleaning up any prior run
/// for the same order first.
pub struct WorkflowLauncher {
	engine: Arc<OrchestrationService>,
	recovery: Arc<RecoveryCoordinator>,
}

impl WorkflowLauncher {
	pub fn new(engine: Arc<OrchestrationService>, recovery: Arc<RecoveryCoordinator>) -> Self {
		Self { engine, recovery }
	}

	fn prefix(order_id: &str) -> String {
		format!("order-{}-", order_id)
	}

	fn execution_name(order_id: &str) -> String {
		let suffix = Uuid::new_v4().simple().to_string();
		format!("order-{}-{}", order_id, &suffix[..8])
	}

	/// Starts a fresh execution for the order, superseding a running one.
	///
	/// Stop and cleanup failures on the old execution are logged but do
	/// not block the relaunch; the old run is already being abandoned.
	#[instrument(skip_all, fields(order_id = %request.order_id))]
	pub async fn launch(&self, request: &LaunchRequest) -> Result<LaunchReceipt, WorkflowError> {
		require("location", &request.location)?;
		require("order_id", &request.order_id)?;

		let running = self
			.engine
			.list_running(&Self::prefix(&request.order_id))
			.await?;
		let superseded = !running.is_empty();

		for execution in &running {
			tracing::info!(
				execution_name = %execution.name,
				"Stopping prior execution before relaunch"
			);
			if let Err(e) = self.engine.stop(execution, SUPERSEDE_REASON).await {
				tracing::warn!(
					execution_name = %execution.name,
					error = %e,
					"Failed to stop prior execution"
				);
			}
		}

		if superseded {
			let cleanup = LiberateRequest {
				location: Some(request.location.clone()),
				order_id: Some(request.order_id.clone()),
				reason: Some(SUPERSEDE_REASON.to_string()),
				reset: true,
			};
			if let Err(e) = self.recovery.liberate(&cleanup).await {
				tracing::warn!(error = %e, "Cleanup of superseded execution failed");
			}
		}

		let name = Self::execution_name(&request.order_id);
		let payload = serde_json::json!({
			"location": request.location,
			"order_id": request.order_id,
		});
		let execution = self.engine.start(&name, &payload).await?;

		tracing::info!(
			execution_name = %execution.name,
			superseded,
			"Workflow execution started"
		);

		Ok(LaunchReceipt {
			execution_id: execution.id,
			execution_name: execution.name,
			superseded,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_orchestration::implementations::memory::MemoryOrchestrator;
	use fulfillment_pool::StaffPool;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_storage::stores::orders::OrderStore;
	use fulfillment_storage::stores::workers::WorkerStore;
	use fulfillment_storage::StorageService;
	use fulfillment_types::{Order, Stage, StageEntry, StaffRole, Worker};

	struct Fixture {
		launcher: WorkflowLauncher,
		engine: MemoryOrchestrator,
		orders: Arc<OrderStore>,
		workers: Arc<WorkerStore>,
	}

	async fn fixture() -> Fixture {
		let service = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStore::new(service.clone()));
		let workers = Arc::new(WorkerStore::new(service));
		let pool = Arc::new(StaffPool::new(workers.clone()));
		let recovery = Arc::new(RecoveryCoordinator::new(orders.clone(), pool));
		let engine = MemoryOrchestrator::new();
		let launcher = WorkflowLauncher::new(
			Arc::new(OrchestrationService::new(Box::new(engine.clone()))),
			recovery,
		);
		Fixture {
			launcher,
			engine,
			orders,
			workers,
		}
	}

	fn launch_request() -> LaunchRequest {
		LaunchRequest {
			location: "loc-1".into(),
			order_id: "p-1".into(),
		}
	}

	#[tokio::test]
	async fn test_launch_starts_named_execution() {
		let fx = fixture().await;
		let receipt = fx.launcher.launch(&launch_request()).await.unwrap();

		assert!(receipt.execution_name.starts_with("order-p-1-"));
		assert!(!receipt.superseded);

		let executions = fx.engine.executions().await;
		assert_eq!(executions.len(), 1);
		assert!(executions[0].running);
		assert_eq!(executions[0].payload["order_id"], "p-1");
	}

	#[tokio::test]
	async fn test_relaunch_stops_prior_execution_and_frees_workers() {
		let fx = fixture().await;

		// A cook left busy by the execution about to be superseded.
		let cook = Worker {
			location: "loc-1".into(),
			id: "w-cook".into(),
			first_name: "Luis".into(),
			last_name: "Mora".into(),
			role: StaffRole::Cook,
			busy: true,
			rating: 4.2,
		};
		fx.workers.put(&cook).await.unwrap();

		let mut order = Order::new("loc-1", "p-1", "ana@example.com", 1);
		order.stage = Stage::Cooking;
		order.history = vec![StageEntry::open(
			Stage::Cooking,
			Some(&cook),
			chrono::Duration::minutes(5),
		)];
		fx.orders.put(&order).await.unwrap();

		let first = fx.launcher.launch(&launch_request()).await.unwrap();
		let second = fx.launcher.launch(&launch_request()).await.unwrap();

		assert!(second.superseded);
		assert_ne!(first.execution_name, second.execution_name);

		let executions = fx.engine.executions().await;
		assert_eq!(executions.len(), 2);
		let stopped = executions
			.iter()
			.find(|e| e.execution.name == first.execution_name)
			.unwrap();
		assert!(!stopped.running);
		assert_eq!(stopped.stop_reason.as_deref(), Some(SUPERSEDE_REASON));

		// Cleanup freed the stranded cook and reset the order.
		assert!(!fx.workers.get("loc-1", "w-cook").await.unwrap().busy);
		let order = fx.orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(order.stage, Stage::Processing);
	}

	#[tokio::test]
	async fn test_launches_for_distinct_orders_do_not_supersede() {
		let fx = fixture().await;
		fx.launcher.launch(&launch_request()).await.unwrap();

		let other = LaunchRequest {
			location: "loc-1".into(),
			order_id: "p-2".into(),
		};
		let receipt = fx.launcher.launch(&other).await.unwrap();
		assert!(!receipt.superseded);

		let running: Vec<_> = fx
			.engine
			.executions()
			.await
			.into_iter()
			.filter(|e| e.running)
			.collect();
		assert_eq!(running.len(), 2);
	}

	#[tokio::test]
	async fn test_launch_rejects_blank_parameters() {
		let fx = fixture().await;
		let result = fx
			.launcher
			.launch(&LaunchRequest {
				location: "".into(),
				order_id: "p-1".into(),
			})
			.await;
		assert!(matches!(result, Err(WorkflowError::MissingParameter(_))));
	}
}
