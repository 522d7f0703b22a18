//! Parametrized stage-advancement handler.
//!
//! One algorithm serves the cooking, packing, and shipping boundaries:
//! release the predecessor worker (idempotent), allocate a worker of the
//! target role, and commit the stage move binding the new worker. The
//! predecessor release is not rolled back when allocation later fails;
//! that side effect is accepted.

use crate::{require, state::StageEngine, WorkflowError};
use fulfillment_pool::StaffPool;
use fulfillment_types::{StaffRole, Stage, StageRequest, StageSummary};
use std::sync::Arc;
use tracing::instrument;

/// One stage boundary: the stage the order must currently occupy, the
/// stage it moves to, and the staff role the new stage binds.
#[derive(Debug, Clone, Copy)]
pub struct StageTransition {
	pub expected: Stage,
	pub next: Stage,
	pub role: StaffRole,
}

impl StageTransition {
	/// Processing -> Cooking, binding a cook. No predecessor to release.
	pub fn cooking() -> Self {
		Self {
			expected: Stage::Processing,
			next: Stage::Cooking,
			role: StaffRole::Cook,
		}
	}

	/// Cooking -> Packing, releasing the cook and binding a packer.
	pub fn packing() -> Self {
		Self {
			expected: Stage::Cooking,
			next: Stage::Packing,
			role: StaffRole::Packer,
		}
	}

	/// Packing -> Shipping, releasing the packer and binding a courier.
	pub fn shipping() -> Self {
		Self {
			expected: Stage::Packing,
			next: Stage::Shipping,
			role: StaffRole::Courier,
		}
	}
}

/// Handler executing one stage-boundary advancement.
pub struct StageHandler {
	pool: Arc<StaffPool>,
	engine: Arc<StageEngine>,
}

impl StageHandler {
	pub fn new(pool: Arc<StaffPool>, engine: Arc<StageEngine>) -> Self {
		Self { pool, engine }
	}

	/// Runs the advancement algorithm for one boundary.
	#[instrument(skip_all, fields(order_id = %request.order_id, stage = %transition.next))]
	pub async fn advance_stage(
		&self,
		transition: StageTransition,
		request: &StageRequest,
	) -> Result<StageSummary, WorkflowError> {
		require("location", &request.location)?;
		require("order_id", &request.order_id)?;

		if let Some(predecessor) = &request.predecessor_id {
			self.pool.release(&request.location, predecessor).await?;
		}

		let worker = self
			.pool
			.allocate_available(&request.location, transition.role)
			.await?;

		let order = match self
			.engine
			.advance(
				&request.location,
				&request.order_id,
				transition.expected,
				transition.next,
				Some(&worker),
			)
			.await
		{
			Ok(order) => order,
			Err(e) => {
				// The worker never made it into the record; free it so the
				// busy flag keeps matching the active-entry assignments.
				if let Err(release_err) =
					self.pool.release(&request.location, &worker.id).await
				{
					tracing::warn!(
						worker_id = %worker.id,
						error = %release_err,
						"Failed to release worker after aborted advance"
					);
				}
				return Err(e);
			},
		};

		Ok(StageSummary {
			location: order.location.clone(),
			order_id: order.order_id.clone(),
			customer_address: request
				.customer_address
				.clone()
				.or(Some(order.customer_address.clone())),
			worker_id: Some(worker.id),
			stage: order.stage,
		})
	}
}
