//! Callback registry for the human-confirmation step.
//!
//! The workflow's final stage suspends until the customer confirms
//! receipt. Suspension persists the engine's continuation token on the
//! order and notifies the customer; the inbound confirmation looks the
//! token up, resumes the suspended execution with a success payload, and
//! clears the token. A confirmation arriving after clearance gets
//! `NoPendingConfirmation`; there is deliberately no separate "already
//! confirmed" marker yet.

use crate::{require, WorkflowError};
use fulfillment_notify::NotificationService;
use fulfillment_orchestration::OrchestrationService;
use fulfillment_storage::stores::orders::OrderStore;
use fulfillment_types::{AwaitConfirmationRequest, ConfirmReceiptRequest};
use std::sync::Arc;
use tracing::instrument;

/// Persists and resolves continuation tokens for suspended executions.
pub struct CallbackRegistry {
	orders: Arc<OrderStore>,
	engine: Arc<OrchestrationService>,
	notifier: Arc<NotificationService>,
}

impl CallbackRegistry {
	pub fn new(
		orders: Arc<OrderStore>,
		engine: Arc<OrchestrationService>,
		notifier: Arc<NotificationService>,
	) -> Self {
		Self {
			orders,
			engine,
			notifier,
		}
	}

	/// Stores the continuation token, flags the order as awaiting
	/// confirmation, and notifies the customer.
	///
	/// The notification is fire-and-forget; its failure never fails the
	/// suspension, since the execution must stay resumable regardless.
	#[instrument(skip_all, fields(order_id = %request.order_id))]
	pub async fn await_confirmation(
		&self,
		request: &AwaitConfirmationRequest,
	) -> Result<(), WorkflowError> {
		require("location", &request.location)?;
		require("order_id", &request.order_id)?;
		require("customer_address", &request.customer_address)?;
		require("task_token", &request.task_token)?;

		let order = self.orders.get(&request.location, &request.order_id).await?;
		self.orders
			.conditional_update(&request.location, &request.order_id, order.stage, |o| {
				o.task_token = Some(request.task_token.clone());
				o.awaiting_confirmation = true;
			})
			.await?;

		tracing::info!(order_id = %request.order_id, "Awaiting customer confirmation");

		self.notifier
			.notify_best_effort(
				&request.customer_address,
				&request.order_id,
				&format!(
					"Your order {} has arrived. Please confirm receipt.",
					request.order_id
				),
			)
			.await;

		Ok(())
	}

	/// Resumes the suspended execution for an inbound confirmation and
	/// clears the stored token.
	#[instrument(skip_all, fields(order_id = %request.order_id))]
	pub async fn confirm_receipt(
		&self,
		request: &ConfirmReceiptRequest,
	) -> Result<(), WorkflowError> {
		require("location", &request.location)?;
		require("order_id", &request.order_id)?;

		let order = self.orders.get(&request.location, &request.order_id).await?;
		let token = order
			.task_token
			.clone()
			.ok_or(WorkflowError::NoPendingConfirmation)?;

		self.engine
			.resume_success(
				&token,
				&serde_json::json!({
					"confirmed": request.confirmed,
					"kind": "manual",
				}),
			)
			.await?;

		self.orders
			.conditional_update(&request.location, &request.order_id, order.stage, |o| {
				o.task_token = None;
				o.awaiting_confirmation = false;
			})
			.await?;

		tracing::info!(order_id = %request.order_id, "Confirmation processed");
		Ok(())
	}
}
