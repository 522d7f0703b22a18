//! Log-only notification channel.
//!
//! Writes the message to the service log instead of delivering it. The
//! default channel for development and tests.

use crate::{NotificationFactory, NotificationInterface, NotificationRegistry, NotifyError};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, ImplementationRegistry, Schema, ValidationError};

/// Notification channel that only logs.
pub struct LogNotifier;

#[async_trait]
impl NotificationInterface for LogNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(LogNotifierSchema)
	}

	async fn notify(
		&self,
		address: &str,
		order_id: &str,
		message: &str,
	) -> Result<(), NotifyError> {
		tracing::info!(%address, %order_id, %message, "Customer notification");
		Ok(())
	}
}

/// Configuration schema for LogNotifier.
pub struct LogNotifierSchema;

impl ConfigSchema for LogNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		Schema::new(vec![], vec![]).validate(config)
	}
}

/// Factory function to create a log notification channel.
pub fn create_notifier(_config: &toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError> {
	Ok(Box::new(LogNotifier))
}

/// Registry entry for the log channel.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "log";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
