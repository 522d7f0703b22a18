//! Notification module for the fulfillment workflow system.
//!
//! Dispatches customer-facing messages (delivery arrived, please confirm).
//! Delivery is fire-and-forget: failures are logged and never block or fail
//! the workflow step that triggered them.

use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod log;
	pub mod webhook;
}

/// Errors that can occur during notification dispatch.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// Error that occurs while delivering the notification.
	#[error("Dispatch error: {0}")]
	Dispatch(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the interface for notification channels.
#[async_trait]
pub trait NotificationInterface: Send + Sync {
	/// Returns the configuration schema for this channel implementation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;

	/// Delivers a message about an order to a customer address.
	async fn notify(&self, address: &str, order_id: &str, message: &str)
		-> Result<(), NotifyError>;
}

/// Type alias for notification factory functions.
pub type NotificationFactory =
	fn(&toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError>;

/// Registry trait for notification implementations.
pub trait NotificationRegistry: ImplementationRegistry<Factory = NotificationFactory> {}

/// Get all registered notification implementations.
pub fn get_all_implementations() -> Vec<(&'static str, NotificationFactory)> {
	use implementations::{log, webhook};

	vec![
		(log::Registry::NAME, log::Registry::factory()),
		(webhook::Registry::NAME, webhook::Registry::factory()),
	]
}

/// Service wrapper enforcing fire-and-forget semantics.
pub struct NotificationService {
	channel: Box<dyn NotificationInterface>,
}

impl NotificationService {
	/// Creates a new NotificationService with the specified channel.
	pub fn new(channel: Box<dyn NotificationInterface>) -> Self {
		Self { channel }
	}

	/// Dispatches a notification, logging and swallowing any failure.
	pub async fn notify_best_effort(&self, address: &str, order_id: &str, message: &str) {
		if let Err(e) = self.channel.notify(address, order_id, message).await {
			tracing::warn!(
				%address,
				%order_id,
				error = %e,
				"Notification dispatch failed"
			);
		}
	}
}
