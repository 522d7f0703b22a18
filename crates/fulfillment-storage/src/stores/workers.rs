//! Typed store adapter for staff records.
//!
//! The busy flag is the system's principal contended resource; flipping it
//! goes through `conditional_set_busy`, a single atomic conditional update,
//! never a separate read-then-write.

use crate::{StorageError, StorageService, MAX_SWAP_ATTEMPTS};
use fulfillment_types::{StaffRole, StorageKey, Worker};
use std::sync::Arc;

/// Store adapter for the workers collection.
pub struct WorkerStore {
	service: Arc<StorageService>,
}

impl WorkerStore {
	pub fn new(service: Arc<StorageService>) -> Self {
		Self { service }
	}

	fn id(location: &str, worker_id: &str) -> String {
		format!("{}:{}", location, worker_id)
	}

	pub async fn get(&self, location: &str, worker_id: &str) -> Result<Worker, StorageError> {
		self.service
			.retrieve(StorageKey::Workers.as_str(), &Self::id(location, worker_id))
			.await
	}

	pub async fn put(&self, worker: &Worker) -> Result<(), StorageError> {
		self.service
			.store(
				StorageKey::Workers.as_str(),
				&Self::id(&worker.location, &worker.id),
				worker,
			)
			.await
	}

	pub async fn remove(&self, location: &str, worker_id: &str) -> Result<(), StorageError> {
		self.service
			.remove(StorageKey::Workers.as_str(), &Self::id(location, worker_id))
			.await
	}

	/// Returns all non-busy workers of the given role at a location.
	pub async fn query_available(
		&self,
		location: &str,
		role: StaffRole,
	) -> Result<Vec<Worker>, StorageError> {
		let ids = self
			.service
			.list_ids(StorageKey::Workers.as_str(), &format!("{}:", location))
			.await?;

		let mut available = Vec::new();
		for id in ids {
			let worker: Worker = self
				.service
				.retrieve(StorageKey::Workers.as_str(), &id)
				.await?;
			if worker.role == role && !worker.busy {
				available.push(worker);
			}
		}
		Ok(available)
	}

	/// Atomically flips the busy flag, succeeding only if it currently
	/// equals `expected_busy`.
	///
	/// Two workflows observing the same free worker race here; exactly one
	/// wins, the other gets `Conflict` and must pick another candidate.
	pub async fn conditional_set_busy(
		&self,
		location: &str,
		worker_id: &str,
		expected_busy: bool,
		new_busy: bool,
	) -> Result<(), StorageError> {
		let id = Self::id(location, worker_id);
		for _ in 0..MAX_SWAP_ATTEMPTS {
			let (worker, raw): (Worker, Vec<u8>) = self
				.service
				.retrieve_versioned(StorageKey::Workers.as_str(), &id)
				.await?;

			if worker.busy != expected_busy {
				return Err(StorageError::Conflict(format!(
					"worker {} busy flag is {}, expected {}",
					id, worker.busy, expected_busy
				)));
			}

			let mut updated = worker;
			updated.busy = new_busy;

			match self
				.service
				.swap(StorageKey::Workers.as_str(), &id, Some(raw), &updated)
				.await
			{
				Ok(()) => return Ok(()),
				// Some other field changed under us; re-check the flag.
				Err(StorageError::Conflict(_)) => continue,
				Err(e) => return Err(e),
			}
		}

		Err(StorageError::Conflict(format!(
			"worker {} kept changing under us",
			id
		)))
	}
}
