//! Staff resource pool for the fulfillment workflow system.
//!
//! Tracks staff availability per location and role and performs the atomic
//! allocate/release protocol. Allocation is a conditional update on the
//! worker's busy flag: two workflows can both observe the same free worker,
//! but only one can flip the flag, and the loser retries with the next
//! candidate.

use fulfillment_storage::{stores::workers::WorkerStore, StorageError};
use fulfillment_types::{StaffRole, Worker};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur during staff allocation.
#[derive(Debug, Error)]
pub enum PoolError {
	/// Error that occurs when no worker of the required role is free after
	/// allocation retries are exhausted. Retryable by the caller after
	/// backoff; never retried internally beyond the candidate loop.
	#[error("No available {0} at this time")]
	NoCapacity(StaffRole),
	/// Error that occurs when the busy-flag conditional update loses.
	#[error("Allocation conflict for worker {0}")]
	Conflict(String),
	/// Error from the underlying worker store.
	#[error("Storage error: {0}")]
	Storage(String),
}

impl From<StorageError> for PoolError {
	fn from(e: StorageError) -> Self {
		PoolError::Storage(e.to_string())
	}
}

/// Default number of find-then-allocate rounds before reporting NoCapacity.
const DEFAULT_ALLOCATION_RETRIES: usize = 3;

/// Atomic allocate/release over the staff collection.
pub struct StaffPool {
	workers: Arc<WorkerStore>,
	allocation_retries: usize,
}

impl StaffPool {
	pub fn new(workers: Arc<WorkerStore>) -> Self {
		Self {
			workers,
			allocation_retries: DEFAULT_ALLOCATION_RETRIES,
		}
	}

	/// Overrides the bounded retry count used by [`StaffPool::allocate_available`].
	pub fn with_allocation_retries(mut self, retries: usize) -> Self {
		self.allocation_retries = retries.max(1);
		self
	}

	/// Scans free workers of `role` at `location` and returns the
	/// highest-rated one, skipping any in `excluded`.
	///
	/// Ties on rating break by ascending worker id so the scan is
	/// deterministic regardless of store iteration order.
	pub async fn find_available(
		&self,
		location: &str,
		role: StaffRole,
		excluded: &HashSet<String>,
	) -> Result<Option<Worker>, PoolError> {
		let mut candidates = self.workers.query_available(location, role).await?;
		candidates.retain(|w| !excluded.contains(&w.id));
		candidates.sort_by(|a, b| {
			b.rating
				.partial_cmp(&a.rating)
				.unwrap_or(std::cmp::Ordering::Equal)
				.then_with(|| a.id.cmp(&b.id))
		});
		Ok(candidates.into_iter().next())
	}

	/// Atomically marks a worker busy. Fails with `Conflict` if the worker
	/// was not free immediately before the update.
	pub async fn allocate(&self, location: &str, worker_id: &str) -> Result<(), PoolError> {
		match self
			.workers
			.conditional_set_busy(location, worker_id, false, true)
			.await
		{
			Ok(()) => Ok(()),
			Err(StorageError::Conflict(_)) => Err(PoolError::Conflict(worker_id.to_string())),
			Err(e) => Err(e.into()),
		}
	}

	/// Marks a worker free. Idempotent: releasing an already-free worker
	/// is a no-op success.
	pub async fn release(&self, location: &str, worker_id: &str) -> Result<(), PoolError> {
		match self
			.workers
			.conditional_set_busy(location, worker_id, true, false)
			.await
		{
			Ok(()) => Ok(()),
			// Already free.
			Err(StorageError::Conflict(_)) => Ok(()),
			Err(e) => Err(e.into()),
		}
	}

	/// Finds and allocates the best free worker of `role`, excluding
	/// candidates that conflicted in earlier rounds. Reports
	/// [`PoolError::NoCapacity`] once candidates or retries run out.
	pub async fn allocate_available(
		&self,
		location: &str,
		role: StaffRole,
	) -> Result<Worker, PoolError> {
		let mut excluded = HashSet::new();

		for _ in 0..self.allocation_retries {
			let Some(candidate) = self.find_available(location, role, &excluded).await? else {
				return Err(PoolError::NoCapacity(role));
			};

			match self.allocate(location, &candidate.id).await {
				Ok(()) => {
					let mut allocated = candidate;
					allocated.busy = true;
					return Ok(allocated);
				},
				Err(PoolError::Conflict(id)) => {
					tracing::debug!(
						worker_id = %id,
						%role,
						"Lost allocation race, excluding candidate"
					);
					excluded.insert(id);
				},
				Err(e) => return Err(e),
			}
		}

		Err(PoolError::NoCapacity(role))
	}
}
