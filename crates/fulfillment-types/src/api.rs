//! Canonical request and response types for the fulfillment workflow system.
//!
//! The transport adapter normalizes both invocation shapes (wrapped HTTP
//! request and direct orchestrator event) into these types; the core never
//! branches on invocation origin.

use serde::{Deserialize, Serialize};

use crate::order::Stage;
use crate::staff::StaffRole;

/// Canonical request for one stage-boundary advancement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageRequest {
	/// Restaurant location of the order.
	pub location: String,
	/// Order identifier within the location.
	pub order_id: String,
	/// Customer contact address, carried through the workflow payload.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub customer_address: Option<String>,
	/// Worker bound to the predecessor stage, to be released first.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub predecessor_id: Option<String>,
}

/// Compact summary returned by a stage advancement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageSummary {
	pub location: String,
	pub order_id: String,
	/// Customer contact address for downstream steps.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub customer_address: Option<String>,
	/// The worker newly bound to the stage, if the stage binds one.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub worker_id: Option<String>,
	/// The stage the order now occupies.
	pub stage: Stage,
}

/// Request to start (or restart) the workflow execution for an order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchRequest {
	pub location: String,
	pub order_id: String,
}

/// Result of launching a workflow execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaunchReceipt {
	/// Identifier of the newly started execution.
	pub execution_id: String,
	/// Name under which the execution was started.
	pub execution_name: String,
	/// True when a prior running execution was stopped and superseded.
	pub superseded: bool,
}

/// Request to suspend the workflow until the customer confirms receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwaitConfirmationRequest {
	pub location: String,
	pub order_id: String,
	/// Customer contact address the notification goes to.
	pub customer_address: String,
	/// Continuation token handed out by the orchestration engine.
	pub task_token: String,
}

/// Inbound customer confirmation of receipt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmReceiptRequest {
	pub location: String,
	pub order_id: String,
	/// Whether the customer confirmed; defaults to true.
	#[serde(default = "default_confirmed")]
	pub confirmed: bool,
}

fn default_confirmed() -> bool {
	true
}

/// Request to release every worker an order holds, optionally resetting it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiberateRequest {
	#[serde(default)]
	pub location: Option<String>,
	#[serde(default)]
	pub order_id: Option<String>,
	/// Reason recorded in release logs.
	#[serde(default)]
	pub reason: Option<String>,
	/// Whether to reset the order back to its initial stage.
	#[serde(default = "default_reset")]
	pub reset: bool,
}

fn default_reset() -> bool {
	true
}

/// One worker freed during a liberate pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReleasedWorker {
	pub id: String,
	pub role: StaffRole,
}

/// Outcome of a liberate pass; partial success is reported, never raised.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReleaseReport {
	/// Number of workers successfully released.
	pub released: usize,
	/// The workers that were released.
	pub workers: Vec<ReleasedWorker>,
	/// Whether the order was reset to its initial stage.
	pub reset: bool,
}

/// Structured error payload for the wrapped transport path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
	pub error: String,
}
