//! Stuck-order recovery.
//!
//! When an execution is aborted or superseded it can leave workers
//! flagged busy with no live assignment. The coordinator scans the
//! order's full stage history for entries still marked active, frees
//! every worker bound to one, and optionally resets the order back to
//! its initial stage so a fresh execution can pick it up.
//!
//! Recovery is deliberately forgiving: a missing order or missing
//! parameters yield an empty report, and a failure to free one worker
//! never blocks freeing the rest. Partial progress is reported, not
//! raised.

use crate::WorkflowError;
use fulfillment_pool::StaffPool;
use fulfillment_storage::stores::orders::OrderStore;
use fulfillment_storage::StorageError;
use fulfillment_types::{LiberateRequest, ReleaseReport, ReleasedWorker};
use std::sync::Arc;
use tracing::instrument;

/// Frees workers stranded by dead executions and resets their orders.
pub struct RecoveryCoordinator {
	orders: Arc<OrderStore>,
	pool: Arc<StaffPool>,
}

impl RecoveryCoordinator {
	pub fn new(orders: Arc<OrderStore>, pool: Arc<StaffPool>) -> Self {
		Self { orders, pool }
	}

	/// Releases every worker bound to an active history entry of the
	/// order, then resets the order to its initial stage when requested.
	///
	/// Returns an empty report when the order cannot be identified or
	/// does not exist; recovery is invoked from cleanup paths that must
	/// not fail the caller.
	#[instrument(skip_all, fields(order_id = request.order_id.as_deref().unwrap_or("")))]
	pub async fn liberate(&self, request: &LiberateRequest) -> Result<ReleaseReport, WorkflowError> {
		let (location, order_id) = match (&request.location, &request.order_id) {
			(Some(l), Some(p)) if !l.trim().is_empty() && !p.trim().is_empty() => (l, p),
			_ => {
				tracing::warn!("Liberate invoked without a target order, nothing to do");
				return Ok(ReleaseReport::default());
			}
		};
		let reason = request.reason.as_deref().unwrap_or("recovery");

		let order = match self.orders.get(location, order_id).await {
			Ok(order) => order,
			Err(StorageError::NotFound) => {
				tracing::warn!(%location, %order_id, "Liberate target not found");
				return Ok(ReleaseReport::default());
			}
			Err(e) => return Err(e.into()),
		};

		let mut report = ReleaseReport::default();
		for entry in order.history.iter().filter(|e| e.active) {
			let Some(worker) = &entry.worker else {
				continue;
			};
			match self.pool.release(location, &worker.id).await {
				Ok(()) => {
					tracing::info!(
						worker_id = %worker.id,
						role = %worker.role,
						%reason,
						"Released worker during recovery"
					);
					report.released += 1;
					report.workers.push(ReleasedWorker {
						id: worker.id.clone(),
						role: worker.role,
					});
				}
				Err(e) => {
					// Keep going; a single stuck record must not strand the rest.
					tracing::warn!(
						worker_id = %worker.id,
						error = %e,
						"Failed to release worker during recovery"
					);
				}
			}
		}

		if request.reset {
			let mut fresh = order.clone();
			fresh.reset_to_initial();
			// Unconditional overwrite: recovery owns the record at this point.
			self.orders.put(&fresh).await?;
			report.reset = true;
			tracing::info!(%location, %order_id, "Order reset to initial stage");
		}

		Ok(report)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_storage::stores::workers::WorkerStore;
	use fulfillment_storage::StorageService;
	use fulfillment_types::{Order, Stage, StageEntry, StaffRole, Worker};

	struct Fixture {
		coordinator: RecoveryCoordinator,
		orders: Arc<OrderStore>,
		workers: Arc<WorkerStore>,
	}

	async fn fixture() -> Fixture {
		let service = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStore::new(service.clone()));
		let workers = Arc::new(WorkerStore::new(service));
		let pool = Arc::new(StaffPool::new(workers.clone()));
		let coordinator = RecoveryCoordinator::new(orders.clone(), pool);
		Fixture {
			coordinator,
			orders,
			workers,
		}
	}

	fn busy_worker(id: &str, role: StaffRole) -> Worker {
		Worker {
			location: "loc-1".into(),
			id: id.into(),
			first_name: "Rosa".into(),
			last_name: "Diaz".into(),
			role,
			busy: true,
			rating: 4.0,
		}
	}

	async fn seed_stuck_order(fx: &Fixture) {
		let cook = busy_worker("w-cook", StaffRole::Cook);
		let packer = busy_worker("w-packer", StaffRole::Packer);
		fx.workers.put(&cook).await.unwrap();
		fx.workers.put(&packer).await.unwrap();

		let mut order = Order::new("loc-1", "p-1", "ana@example.com", 2);
		// Aborted mid-flight: cooking entry was never closed, packing is live.
		order.stage = Stage::Packing;
		order.history = vec![
			StageEntry::open(Stage::Cooking, Some(&cook), chrono::Duration::minutes(5)),
			StageEntry::open(Stage::Packing, Some(&packer), chrono::Duration::minutes(2)),
		];
		fx.orders.put(&order).await.unwrap();
	}

	fn liberate_request(reset: bool) -> LiberateRequest {
		LiberateRequest {
			location: Some("loc-1".into()),
			order_id: Some("p-1".into()),
			reason: Some("execution aborted".into()),
			reset,
		}
	}

	#[tokio::test]
	async fn test_liberate_frees_all_active_workers_and_resets() {
		let fx = fixture().await;
		seed_stuck_order(&fx).await;

		let report = fx.coordinator.liberate(&liberate_request(true)).await.unwrap();
		assert_eq!(report.released, 2);
		assert!(report.reset);
		let ids: Vec<_> = report.workers.iter().map(|w| w.id.as_str()).collect();
		assert!(ids.contains(&"w-cook"));
		assert!(ids.contains(&"w-packer"));

		for id in ["w-cook", "w-packer"] {
			let worker = fx.workers.get("loc-1", id).await.unwrap();
			assert!(!worker.busy);
		}

		let order = fx.orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(order.stage, Stage::Processing);
		assert_eq!(order.history.len(), 1);
		assert!(order.task_token.is_none());
		assert!(!order.awaiting_confirmation);
	}

	#[tokio::test]
	async fn test_liberate_without_reset_leaves_order_stage() {
		let fx = fixture().await;
		seed_stuck_order(&fx).await;

		let report = fx
			.coordinator
			.liberate(&liberate_request(false))
			.await
			.unwrap();
		assert_eq!(report.released, 2);
		assert!(!report.reset);

		let order = fx.orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(order.stage, Stage::Packing);
	}

	#[tokio::test]
	async fn test_liberate_continues_past_missing_worker_record() {
		let fx = fixture().await;
		seed_stuck_order(&fx).await;
		// Simulate a worker record that vanished out from under the history.
		fx.workers.remove("loc-1", "w-cook").await.unwrap();

		let report = fx.coordinator.liberate(&liberate_request(false)).await.unwrap();
		assert_eq!(report.released, 1);
		assert_eq!(report.workers[0].id, "w-packer");

		let packer = fx.workers.get("loc-1", "w-packer").await.unwrap();
		assert!(!packer.busy);
	}

	#[tokio::test]
	async fn test_liberate_without_target_yields_empty_report() {
		let fx = fixture().await;
		let report = fx
			.coordinator
			.liberate(&LiberateRequest {
				location: None,
				order_id: None,
				reason: None,
				reset: true,
			})
			.await
			.unwrap();
		assert_eq!(report.released, 0);
		assert!(report.workers.is_empty());
		assert!(!report.reset);
	}

	#[tokio::test]
	async fn test_liberate_unknown_order_yields_empty_report() {
		let fx = fixture().await;
		let report = fx.coordinator.liberate(&liberate_request(true)).await.unwrap();
		assert_eq!(report.released, 0);
		assert!(!report.reset);
	}
}
