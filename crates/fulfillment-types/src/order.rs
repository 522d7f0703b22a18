//! Order lifecycle types for the fulfillment workflow system.
//!
//! An order moves through a fixed sequence of fulfillment stages, keeping an
//! append-only history of the stages it has occupied and the staff member
//! bound to each one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::staff::{Worker, WorkerSnapshot};

/// One position in the fixed fulfillment sequence.
///
/// Transitions may only move exactly one position forward; the sequence is
/// `Processing -> Cooking -> Packing -> Shipping -> Received`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
	/// Order accepted, waiting for a cook.
	Processing,
	/// A cook is preparing the order.
	Cooking,
	/// A packer is boxing the order.
	Packing,
	/// A courier is delivering the order.
	Shipping,
	/// Customer confirmed receipt; terminal stage.
	Received,
}

impl Stage {
	/// Returns the unique next stage in the sequence, or `None` for the
	/// terminal stage.
	pub fn successor(&self) -> Option<Stage> {
		match self {
			Stage::Processing => Some(Stage::Cooking),
			Stage::Cooking => Some(Stage::Packing),
			Stage::Packing => Some(Stage::Shipping),
			Stage::Shipping => Some(Stage::Received),
			Stage::Received => None,
		}
	}

	/// True when `next` is the immediate successor of this stage.
	pub fn permits(&self, next: Stage) -> bool {
		self.successor() == Some(next)
	}

	/// Returns the string form used in persisted records and wire payloads.
	pub fn as_str(&self) -> &'static str {
		match self {
			Stage::Processing => "processing",
			Stage::Cooking => "cooking",
			Stage::Packing => "packing",
			Stage::Shipping => "shipping",
			Stage::Received => "received",
		}
	}
}

impl fmt::Display for Stage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// One historical record of an order occupying a stage.
///
/// The `worker` field is a denormalized snapshot taken at assignment time,
/// never a live reference to the worker record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageEntry {
	/// The stage this entry records.
	pub stage: Stage,
	/// When the order entered this stage.
	pub started_at: DateTime<Utc>,
	/// Projected (while active) or actual (once closed) end of this stage.
	pub ended_at: DateTime<Utc>,
	/// Whether the order currently occupies this stage.
	pub active: bool,
	/// Snapshot of the staff member bound to this stage, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub worker: Option<WorkerSnapshot>,
}

impl StageEntry {
	/// Creates a new active entry starting now with the given projected
	/// duration.
	pub fn open(stage: Stage, worker: Option<&Worker>, duration: chrono::Duration) -> Self {
		let now = Utc::now();
		Self {
			stage,
			started_at: now,
			ended_at: now + duration,
			active: true,
			worker: worker.map(WorkerSnapshot::of),
		}
	}
}

/// A physical order moving through the fulfillment sequence.
///
/// Invariant: exactly one history entry has `active = true`, and its stage
/// equals the `stage` field. The record is mutated only through conditional
/// updates keyed on the current stage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
	/// Restaurant location the order belongs to.
	pub location: String,
	/// Order identifier, unique within the location.
	pub order_id: String,
	/// Current stage of the order.
	pub stage: Stage,
	/// Append-only history of occupied stages.
	pub history: Vec<StageEntry>,
	/// Contact address of the customer who placed the order.
	pub customer_address: String,
	/// Number of items in the order; drives stage duration estimates.
	#[serde(default = "default_item_count")]
	pub item_count: u32,
	/// Approximate delivery timestamp, set when the order starts shipping.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub estimated_delivery: Option<DateTime<Utc>>,
	/// Continuation token for resuming the suspended execution, present
	/// only while a human confirmation is pending.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub task_token: Option<String>,
	/// Set while the workflow is suspended awaiting customer confirmation.
	#[serde(default)]
	pub awaiting_confirmation: bool,
}

fn default_item_count() -> u32 {
	1
}

impl Order {
	/// Creates a fresh order in `Processing` with a single active entry.
	pub fn new(
		location: impl Into<String>,
		order_id: impl Into<String>,
		customer_address: impl Into<String>,
		item_count: u32,
	) -> Self {
		Self {
			location: location.into(),
			order_id: order_id.into(),
			stage: Stage::Processing,
			history: vec![StageEntry::open(
				Stage::Processing,
				None,
				chrono::Duration::zero(),
			)],
			customer_address: customer_address.into(),
			item_count,
			estimated_delivery: None,
			task_token: None,
			awaiting_confirmation: false,
		}
	}

	/// Returns the currently active history entry, if any.
	pub fn active_entry(&self) -> Option<&StageEntry> {
		self.history.iter().find(|e| e.active)
	}

	/// Closes every active history entry, stamping the actual end time.
	///
	/// Scans the full history rather than only the last entry; a record
	/// with more than one active entry is repaired rather than trusted.
	pub fn close_active_entries(&mut self, now: DateTime<Utc>) {
		for entry in self.history.iter_mut().filter(|e| e.active) {
			entry.active = false;
			entry.ended_at = now;
		}
	}

	/// Resets the order to `Processing` with one fresh active entry,
	/// clearing any pending confirmation state.
	pub fn reset_to_initial(&mut self) {
		let now = Utc::now();
		self.close_active_entries(now);
		self.stage = Stage::Processing;
		self.history
			.push(StageEntry::open(Stage::Processing, None, chrono::Duration::zero()));
		self.estimated_delivery = None;
		self.task_token = None;
		self.awaiting_confirmation = false;
	}
}
