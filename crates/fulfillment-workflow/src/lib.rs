//! Core workflow engine for the fulfillment system.
//!
//! This module provides the order-lifecycle state machine, the staff
//! allocation protocol around it, and the workflow-recovery and
//! callback-resumption logic. Each stage handler is a stateless unit
//! invoked independently by the external orchestration engine under
//! at-least-once delivery; all coordination happens through atomic
//! conditional updates on the persistent store.

use fulfillment_orchestration::OrchestrationError;
use fulfillment_pool::PoolError;
use fulfillment_storage::StorageError;
use fulfillment_types::{StaffRole, Stage};
use thiserror::Error;

pub mod callback;
pub mod handlers;
pub mod launch;
pub mod recovery;
pub mod state;
pub mod timing;

pub use callback::CallbackRegistry;
pub use handlers::finalize::FinalizeHandler;
pub use handlers::stage::{StageHandler, StageTransition};
pub use launch::WorkflowLauncher;
pub use recovery::RecoveryCoordinator;
pub use state::StageEngine;
pub use timing::TimingProfile;

/// Errors that can occur during workflow operations.
///
/// Infrastructure failures are propagated unmodified; retry policy is the
/// orchestrator's responsibility, not this core's.
#[derive(Debug, Error)]
pub enum WorkflowError {
	/// A required field is absent. Caller error, not retried.
	#[error("Missing required parameter: {0}")]
	MissingParameter(String),
	/// The referenced order does not exist.
	#[error("Order not found")]
	OrderNotFound,
	/// A non-adjacent or backward stage move was requested, or the order
	/// already moved past the expected stage.
	#[error("Invalid state transition from {from} to {to}")]
	InvalidStateTransition { from: Stage, to: Stage },
	/// No worker of the required role is free. Retryable by the caller
	/// after backoff.
	#[error("No available {0} at this time")]
	NoCapacity(StaffRole),
	/// The execution identifier collides with a live execution.
	#[error("Execution already exists: {0}")]
	ExecutionConflict(String),
	/// A confirmation arrived with no stored continuation token.
	#[error("No pending confirmation for this order")]
	NoPendingConfirmation,
	/// Store or engine failure, passed through for the caller to handle.
	#[error("Infrastructure error: {0}")]
	Infrastructure(String),
}

impl From<StorageError> for WorkflowError {
	fn from(e: StorageError) -> Self {
		match e {
			StorageError::NotFound => WorkflowError::OrderNotFound,
			other => WorkflowError::Infrastructure(other.to_string()),
		}
	}
}

impl From<PoolError> for WorkflowError {
	fn from(e: PoolError) -> Self {
		match e {
			PoolError::NoCapacity(role) => WorkflowError::NoCapacity(role),
			other => WorkflowError::Infrastructure(other.to_string()),
		}
	}
}

impl From<OrchestrationError> for WorkflowError {
	fn from(e: OrchestrationError) -> Self {
		match e {
			OrchestrationError::ExecutionConflict(name) => WorkflowError::ExecutionConflict(name),
			other => WorkflowError::Infrastructure(other.to_string()),
		}
	}
}

/// Rejects empty or whitespace-only required parameters.
pub(crate) fn require(field: &'static str, value: &str) -> Result<(), WorkflowError> {
	if value.trim().is_empty() {
		return Err(WorkflowError::MissingParameter(field.to_string()));
	}
	Ok(())
}
