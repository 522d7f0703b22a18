//! Order finalization handler.
//!
//! Runs after the customer confirms receipt: releases the courier, moves
//! the order from Shipping to Received (its terminal, immutable stage),
//! and appends the order into the customer's history through the user
//! store's atomic append.

use crate::{require, state::StageEngine, WorkflowError};
use fulfillment_pool::StaffPool;
use fulfillment_storage::stores::users::UserStore;
use fulfillment_types::{Stage, StageRequest, StageSummary};
use std::sync::Arc;
use tracing::instrument;

/// Handler completing delivered orders.
pub struct FinalizeHandler {
	pool: Arc<StaffPool>,
	engine: Arc<StageEngine>,
	users: Arc<UserStore>,
}

impl FinalizeHandler {
	pub fn new(pool: Arc<StaffPool>, engine: Arc<StageEngine>, users: Arc<UserStore>) -> Self {
		Self { pool, engine, users }
	}

	/// Completes a shipped order.
	#[instrument(skip_all, fields(order_id = %request.order_id))]
	pub async fn confirm_delivery(
		&self,
		request: &StageRequest,
	) -> Result<StageSummary, WorkflowError> {
		require("location", &request.location)?;
		require("order_id", &request.order_id)?;

		if let Some(courier) = &request.predecessor_id {
			self.pool.release(&request.location, courier).await?;
		}

		let order = self
			.engine
			.advance(
				&request.location,
				&request.order_id,
				Stage::Shipping,
				Stage::Received,
				None,
			)
			.await?;

		let address = request
			.customer_address
			.clone()
			.unwrap_or_else(|| order.customer_address.clone());
		if !address.trim().is_empty() {
			self.users
				.append_order(&address, &order.order_id)
				.await
				.map_err(|e| WorkflowError::Infrastructure(e.to_string()))?;
		}

		tracing::info!(order_id = %order.order_id, "Order completed");

		Ok(StageSummary {
			location: order.location.clone(),
			order_id: order.order_id.clone(),
			customer_address: Some(address),
			worker_id: None,
			stage: order.stage,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::timing::TimingProfile;
	use fulfillment_storage::implementations::memory::MemoryStorage;
	use fulfillment_storage::stores::{orders::OrderStore, workers::WorkerStore};
	use fulfillment_storage::StorageService;
	use fulfillment_types::{Order, StaffRole, Worker};

	struct Fixture {
		handler: Arc<FinalizeHandler>,
		orders: Arc<OrderStore>,
		workers: Arc<WorkerStore>,
		users: Arc<UserStore>,
	}

	async fn fixture(order_ids: &[&str]) -> Fixture {
		let service = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		let orders = Arc::new(OrderStore::new(service.clone()));
		let workers = Arc::new(WorkerStore::new(service.clone()));
		let users = Arc::new(UserStore::new(service));

		workers
			.put(&Worker {
				location: "loc-1".into(),
				id: "w-courier".into(),
				first_name: "Luis".into(),
				last_name: "Perez".into(),
				role: StaffRole::Courier,
				busy: true,
				rating: 4.0,
			})
			.await
			.unwrap();

		for id in order_ids {
			let mut order = Order::new("loc-1", *id, "ana@example.com", 1);
			order.stage = Stage::Shipping;
			if let Some(entry) = order.history.last_mut() {
				entry.stage = Stage::Shipping;
			}
			orders.put(&order).await.unwrap();
		}

		let pool = Arc::new(StaffPool::new(workers.clone()));
		let engine = Arc::new(StageEngine::new(orders.clone(), TimingProfile::demo()));
		Fixture {
			handler: Arc::new(FinalizeHandler::new(pool, engine, users.clone())),
			orders,
			workers,
			users,
		}
	}

	fn request(order_id: &str) -> StageRequest {
		StageRequest {
			location: "loc-1".into(),
			order_id: order_id.into(),
			customer_address: Some("ana@example.com".into()),
			predecessor_id: Some("w-courier".into()),
		}
	}

	#[tokio::test]
	async fn test_confirm_releases_courier_and_records_history() {
		let fx = fixture(&["p-1"]).await;

		let summary = fx.handler.confirm_delivery(&request("p-1")).await.unwrap();
		assert_eq!(summary.stage, Stage::Received);

		assert!(!fx.workers.get("loc-1", "w-courier").await.unwrap().busy);

		let order = fx.orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(order.stage, Stage::Received);
		assert!(!order.history[0].active);

		let user = fx.users.get("ana@example.com").await.unwrap();
		assert_eq!(user.order_history, vec!["p-1"]);
	}

	#[tokio::test]
	async fn test_concurrent_finalizations_for_one_customer_keep_both() {
		let fx = fixture(&["p-1", "p-2"]).await;

		let first = {
			let handler = fx.handler.clone();
			tokio::spawn(async move { handler.confirm_delivery(&request("p-1")).await })
		};
		let second = {
			let handler = fx.handler.clone();
			tokio::spawn(async move { handler.confirm_delivery(&request("p-2")).await })
		};
		first.await.unwrap().unwrap();
		second.await.unwrap().unwrap();

		let user = fx.users.get("ana@example.com").await.unwrap();
		assert_eq!(user.order_history.len(), 2);
	}

	#[tokio::test]
	async fn test_finalizing_unshipped_order_fails() {
		let fx = fixture(&[]).await;
		let order = Order::new("loc-1", "p-3", "ana@example.com", 1);
		fx.orders.put(&order).await.unwrap();

		let result = fx.handler.confirm_delivery(&request("p-3")).await;
		assert!(matches!(
			result,
			Err(WorkflowError::InvalidStateTransition { .. })
		));
	}
}
