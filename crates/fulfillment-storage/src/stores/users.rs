//! Typed store adapter for customer accounts.
//!
//! The order history is append-only. Appends go through a compare-and-swap
//! loop so that two orders completing concurrently for the same customer
//! both end up recorded; a full-list replace based on a stale read can
//! never commit.

use crate::{StorageError, StorageService, MAX_SWAP_ATTEMPTS};
use fulfillment_types::{StorageKey, User};
use std::sync::Arc;
use tracing::warn;

/// Store adapter for the users collection.
pub struct UserStore {
	service: Arc<StorageService>,
}

impl UserStore {
	pub fn new(service: Arc<StorageService>) -> Self {
		Self { service }
	}

	pub async fn get(&self, address: &str) -> Result<User, StorageError> {
		self.service
			.retrieve(StorageKey::Users.as_str(), address)
			.await
	}

	pub async fn put(&self, user: &User) -> Result<(), StorageError> {
		self.service
			.store(StorageKey::Users.as_str(), &user.address, user)
			.await
	}

	/// Atomically appends an order id to the customer's history, creating
	/// the account record if it does not exist yet.
	pub async fn append_order(&self, address: &str, order_id: &str) -> Result<(), StorageError> {
		let namespace = StorageKey::Users.as_str();
		for _ in 0..MAX_SWAP_ATTEMPTS {
			let current = match self
				.service
				.retrieve_versioned::<User>(namespace, address)
				.await
			{
				Ok((user, raw)) => Some((user, raw)),
				Err(StorageError::NotFound) => None,
				Err(e) => return Err(e),
			};

			let (mut user, expected) = match current {
				Some((user, raw)) => (user, Some(raw)),
				None => (User::new(address), None),
			};
			user.order_history.push(order_id.to_string());

			match self.service.swap(namespace, address, expected, &user).await {
				Ok(()) => return Ok(()),
				Err(StorageError::Conflict(_)) | Err(StorageError::NotFound) => continue,
				Err(e) => return Err(e),
			}
		}

		warn!(address, attempts = MAX_SWAP_ATTEMPTS, "history append gave up");
		Err(StorageError::Conflict(format!(
			"user {} kept changing under us",
			address
		)))
	}
}
