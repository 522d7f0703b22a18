//! Typed store adapter for order records.
//!
//! Exposes the conditional-update contract the stage transition engine
//! relies on: updates are keyed on the order's current stage and committed
//! through compare-and-swap, so a write based on a stale read is rejected
//! instead of clobbering a concurrent advancement.

use crate::{StorageError, StorageService, MAX_SWAP_ATTEMPTS};
use fulfillment_types::{Order, Stage, StorageKey};
use std::sync::Arc;
use tracing::{debug, warn};

/// Store adapter for the orders collection.
pub struct OrderStore {
	service: Arc<StorageService>,
}

impl OrderStore {
	pub fn new(service: Arc<StorageService>) -> Self {
		Self { service }
	}

	fn id(location: &str, order_id: &str) -> String {
		format!("{}:{}", location, order_id)
	}

	/// Fetches an order's durable record.
	pub async fn get(&self, location: &str, order_id: &str) -> Result<Order, StorageError> {
		self.service
			.retrieve(StorageKey::Orders.as_str(), &Self::id(location, order_id))
			.await
	}

	/// Stores an order unconditionally. Used for seeding and for the
	/// recovery coordinator's reset, which deliberately overwrites.
	pub async fn put(&self, order: &Order) -> Result<(), StorageError> {
		self.service
			.store(
				StorageKey::Orders.as_str(),
				&Self::id(&order.location, &order.order_id),
				order,
			)
			.await
	}

	/// Applies `mutate` to the order only while its stage equals
	/// `expected_stage`, committing via compare-and-swap.
	///
	/// The record is re-read on every attempt; a byte-level race (another
	/// writer committed between read and swap) retries, while a stage that
	/// no longer matches the expectation fails with `Conflict` so the
	/// caller can distinguish a superseded precondition from infrastructure
	/// trouble. Returns the updated record.
	pub async fn conditional_update<F>(
		&self,
		location: &str,
		order_id: &str,
		expected_stage: Stage,
		mutate: F,
	) -> Result<Order, StorageError>
	where
		F: Fn(&mut Order),
	{
		let id = Self::id(location, order_id);
		for _ in 0..MAX_SWAP_ATTEMPTS {
			let (order, raw): (Order, Vec<u8>) = self
				.service
				.retrieve_versioned(StorageKey::Orders.as_str(), &id)
				.await?;

			if order.stage != expected_stage {
				return Err(StorageError::Conflict(format!(
					"order {} is in stage {}, expected {}",
					id, order.stage, expected_stage
				)));
			}

			let mut updated = order;
			mutate(&mut updated);

			match self
				.service
				.swap(StorageKey::Orders.as_str(), &id, Some(raw), &updated)
				.await
			{
				Ok(()) => return Ok(updated),
				Err(StorageError::Conflict(_)) => {
					debug!(order = %id, "order record changed between read and swap, retrying");
					continue;
				},
				Err(e) => return Err(e),
			}
		}

		warn!(order = %id, attempts = MAX_SWAP_ATTEMPTS, "conditional update gave up");
		Err(StorageError::Conflict(format!(
			"order {} kept changing under us",
			id
		)))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;

	fn store() -> OrderStore {
		OrderStore::new(Arc::new(StorageService::new(Box::new(MemoryStorage::new()))))
	}

	#[tokio::test]
	async fn test_get_missing_order_is_not_found() {
		let orders = store();
		assert!(matches!(
			orders.get("loc-1", "p-404").await,
			Err(StorageError::NotFound)
		));
	}

	#[tokio::test]
	async fn test_conditional_update_rejects_wrong_stage() {
		let orders = store();
		orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 2))
			.await
			.unwrap();

		let result = orders
			.conditional_update("loc-1", "p-1", Stage::Cooking, |o| {
				o.stage = Stage::Packing;
			})
			.await;
		assert!(matches!(result, Err(StorageError::Conflict(_))));

		// Nothing was mutated.
		let order = orders.get("loc-1", "p-1").await.unwrap();
		assert_eq!(order.stage, Stage::Processing);
	}

	#[tokio::test]
	async fn test_conditional_update_commits_on_matching_stage() {
		let orders = store();
		orders
			.put(&Order::new("loc-1", "p-1", "ana@example.com", 2))
			.await
			.unwrap();

		let updated = orders
			.conditional_update("loc-1", "p-1", Stage::Processing, |o| {
				o.stage = Stage::Cooking;
			})
			.await
			.unwrap();
		assert_eq!(updated.stage, Stage::Cooking);
		assert_eq!(orders.get("loc-1", "p-1").await.unwrap().stage, Stage::Cooking);
	}
}
