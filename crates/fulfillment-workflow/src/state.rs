//! Stage transition engine.
//!
//! Validates and commits one forward move in the fixed stage sequence,
//! binding an allocated worker to the new stage. The authoritative order
//! record is re-read on every call; a caller-supplied snapshot is never
//! trusted for the precondition check. Close-entry, append-entry, and
//! persist form one atomic unit through the order store's conditional
//! update, keyed on the expected current stage.

use crate::{timing::TimingProfile, WorkflowError};
use chrono::Utc;
use fulfillment_storage::{stores::orders::OrderStore, StorageError};
use fulfillment_types::{Order, Stage, StageEntry, Worker};
use std::sync::Arc;

/// Commits forward stage moves on order records.
pub struct StageEngine {
	orders: Arc<OrderStore>,
	timing: TimingProfile,
}

impl StageEngine {
	pub fn new(orders: Arc<OrderStore>, timing: TimingProfile) -> Self {
		Self { orders, timing }
	}

	/// Moves an order from `expected` to `next`, recording `worker` as the
	/// stage's assigned staff member.
	///
	/// Fails with [`WorkflowError::InvalidStateTransition`] without
	/// mutating anything when the order is not in `expected` or when
	/// `next` is not its immediate successor. Re-delivery of an already
	/// committed step lands in the same error: the stage has moved on, so
	/// the expectation no longer matches and nothing is double-appended.
	pub async fn advance(
		&self,
		location: &str,
		order_id: &str,
		expected: Stage,
		next: Stage,
		worker: Option<&Worker>,
	) -> Result<Order, WorkflowError> {
		if !expected.permits(next) {
			return Err(WorkflowError::InvalidStateTransition {
				from: expected,
				to: next,
			});
		}

		// Authority check against the durable record, not the caller's view.
		let current = self.orders.get(location, order_id).await?;
		if current.stage != expected {
			return Err(WorkflowError::InvalidStateTransition {
				from: current.stage,
				to: next,
			});
		}

		let duration = self.timing.duration_for(next, current.item_count);
		let result = self
			.orders
			.conditional_update(location, order_id, expected, |order| {
				order.close_active_entries(Utc::now());
				let entry = StageEntry::open(next, worker, duration);
				if next == Stage::Shipping {
					order.estimated_delivery = Some(entry.ended_at);
				}
				order.history.push(entry);
				order.stage = next;
			})
			.await;

		match result {
			Ok(updated) => {
				tracing::info!(
					%location,
					%order_id,
					stage = %next,
					worker_id = worker.map(|w| w.id.as_str()).unwrap_or("-"),
					"Order advanced"
				);
				Ok(updated)
			},
			// Lost the commit race; report the stage that actually won.
			Err(StorageError::Conflict(_)) => {
				let actual = self.orders.get(location, order_id).await?;
				Err(WorkflowError::InvalidStateTransition {
					from: actual.stage,
					to: next,
				})
			},
			Err(e) => Err(e.into()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_storage::StorageService;
	use fulfillment_types::StaffRole;

	fn cook() -> Worker {
		Worker {
			location: "loc-1".into(),
			id: "w-1".into(),
			first_name: "Maria".into(),
			last_name: "Lopez".into(),
			role: StaffRole::Cook,
			busy: true,
			rating: 4.5,
		}
	}

	async fn engine_with_order(stage: Stage) -> (StageEngine, Arc<OrderStore>) {
		let service = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStore::new(service));
		let mut order = Order::new("loc-1", "p-1", "ana@example.com", 2);
		order.stage = stage;
		if let Some(entry) = order.history.last_mut() {
			entry.stage = stage;
		}
		orders.put(&order).await.unwrap();
		(
			StageEngine::new(orders.clone(), TimingProfile::demo()),
			orders,
		)
	}

	#[tokio::test]
	async fn test_advance_closes_previous_and_appends_active_entry() {
		let (engine, orders) = engine_with_order(Stage::Processing).await;
		let worker = cook();

		let updated = engine
			.advance("loc-1", "p-1", Stage::Processing, Stage::Cooking, Some(&worker))
			.await
			.unwrap();

		assert_eq!(updated.stage, Stage::Cooking);
		assert_eq!(updated.history.len(), 2);
		assert!(!updated.history[0].active);
		assert!(updated.history[0].ended_at <= Utc::now());
		let active = updated.active_entry().unwrap();
		assert_eq!(active.stage, Stage::Cooking);
		let snapshot = active.worker.as_ref().unwrap();
		assert_eq!(snapshot.id, "w-1");
		assert_eq!(snapshot.full_name, "Maria Lopez");

		// Exactly one active entry in the persisted record.
		let persisted = orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(persisted.history.iter().filter(|e| e.active).count(), 1);
	}

	#[tokio::test]
	async fn test_advance_rejects_skip() {
		let (engine, orders) = engine_with_order(Stage::Packing).await;

		let result = engine
			.advance("loc-1", "p-1", Stage::Packing, Stage::Received, None)
			.await;
		assert!(matches!(
			result,
			Err(WorkflowError::InvalidStateTransition {
				from: Stage::Packing,
				to: Stage::Received,
			})
		));

		// Order unchanged.
		let order = orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(order.stage, Stage::Packing);
		assert_eq!(order.history.len(), 1);
	}

	#[tokio::test]
	async fn test_advance_rejects_backward_move() {
		let (engine, _) = engine_with_order(Stage::Packing).await;

		let result = engine
			.advance("loc-1", "p-1", Stage::Packing, Stage::Cooking, None)
			.await;
		assert!(matches!(
			result,
			Err(WorkflowError::InvalidStateTransition { .. })
		));
	}

	#[tokio::test]
	async fn test_redelivered_step_fails_instead_of_double_appending() {
		let (engine, orders) = engine_with_order(Stage::Processing).await;
		let worker = cook();

		engine
			.advance("loc-1", "p-1", Stage::Processing, Stage::Cooking, Some(&worker))
			.await
			.unwrap();

		// Same logical step delivered again.
		let result = engine
			.advance("loc-1", "p-1", Stage::Processing, Stage::Cooking, Some(&worker))
			.await;
		assert!(matches!(
			result,
			Err(WorkflowError::InvalidStateTransition {
				from: Stage::Cooking,
				to: Stage::Cooking,
			})
		));
		assert_eq!(orders.get("loc-1", "p-1").await.unwrap().history.len(), 2);
	}

	#[tokio::test]
	async fn test_shipping_sets_estimated_delivery() {
		let (engine, _) = engine_with_order(Stage::Packing).await;

		let updated = engine
			.advance("loc-1", "p-1", Stage::Packing, Stage::Shipping, None)
			.await
			.unwrap();

		let eta = updated.estimated_delivery.unwrap();
		assert_eq!(eta, updated.active_entry().unwrap().ended_at);
	}

	#[tokio::test]
	async fn test_missing_order_is_not_found() {
		let service = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStore::new(service));
		let engine = StageEngine::new(orders, TimingProfile::demo());

		let result = engine
			.advance("loc-1", "p-404", Stage::Processing, Stage::Cooking, None)
			.await;
		assert!(matches!(result, Err(WorkflowError::OrderNotFound)));
	}
}
