//! Staff types for the fulfillment workflow system.
//!
//! Workers are the contended resource of the system: each fulfillment stage
//! is worked by exactly one staff member of the matching role, and the `busy`
//! flag is flipped only through the resource pool's atomic operations.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The three allocatable staff categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
	Cook,
	Packer,
	Courier,
}

impl StaffRole {
	pub fn as_str(&self) -> &'static str {
		match self {
			StaffRole::Cook => "cook",
			StaffRole::Packer => "packer",
			StaffRole::Courier => "courier",
		}
	}
}

impl fmt::Display for StaffRole {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A staff member at a location.
///
/// Invariant: `busy = true` iff the worker is the assigned worker of some
/// order's active stage entry. Only the resource pool mutates `busy`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
	/// Location this worker belongs to.
	pub location: String,
	/// Worker identifier, unique within the location.
	pub id: String,
	/// Given name.
	pub first_name: String,
	/// Family name.
	pub last_name: String,
	/// Role this worker can be allocated for.
	pub role: StaffRole,
	/// Whether the worker is currently bound to an order.
	#[serde(default)]
	pub busy: bool,
	/// Average customer rating.
	#[serde(default)]
	pub rating: f64,
}

impl Worker {
	/// Full display name used in assignment snapshots.
	pub fn full_name(&self) -> String {
		format!("{} {}", self.first_name, self.last_name)
	}
}

/// Denormalized snapshot of a worker, taken at assignment time.
///
/// Stored inside a stage entry; it never reflects later changes to the
/// worker record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerSnapshot {
	pub id: String,
	pub full_name: String,
	pub role: StaffRole,
	pub rating: f64,
}

impl WorkerSnapshot {
	/// Copies the assignment-relevant fields out of a worker record.
	pub fn of(worker: &Worker) -> Self {
		Self {
			id: worker.id.clone(),
			full_name: worker.full_name(),
			role: worker.role,
			rating: worker.rating,
		}
	}
}
