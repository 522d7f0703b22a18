//! Webhook notification channel.
//!
//! POSTs a JSON payload to a configured endpoint, which is expected to fan
//! the message out to the customer (mail, SMS, push).

use crate::{NotificationFactory, NotificationInterface, NotificationRegistry, NotifyError};
use async_trait::async_trait;
use fulfillment_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::time::Duration;

/// Notification channel delivering through an HTTP webhook.
pub struct WebhookNotifier {
	client: reqwest::Client,
	endpoint: String,
}

impl WebhookNotifier {
	pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
		let client = reqwest::Client::builder()
			.timeout(timeout)
			.build()
			.map_err(|e| NotifyError::Dispatch(e.to_string()))?;
		Ok(Self {
			client,
			endpoint: endpoint.into(),
		})
	}
}

#[async_trait]
impl NotificationInterface for WebhookNotifier {
	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(WebhookNotifierSchema)
	}

	async fn notify(
		&self,
		address: &str,
		order_id: &str,
		message: &str,
	) -> Result<(), NotifyError> {
		self.client
			.post(&self.endpoint)
			.json(&serde_json::json!({
				"address": address,
				"order_id": order_id,
				"message": message,
			}))
			.send()
			.await
			.map_err(|e| NotifyError::Dispatch(e.to_string()))?
			.error_for_status()
			.map_err(|e| NotifyError::Dispatch(e.to_string()))?;
		Ok(())
	}
}

/// Configuration schema for WebhookNotifier.
pub struct WebhookNotifierSchema;

impl ConfigSchema for WebhookNotifierSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![Field::new("endpoint", FieldType::String)],
			vec![Field::new(
				"timeout_secs",
				FieldType::Integer {
					min: Some(1),
					max: Some(120),
				},
			)],
		);
		schema.validate(config)
	}
}

/// Factory function to create a webhook notification channel.
///
/// Configuration parameters:
/// - `endpoint`: webhook URL (required)
/// - `timeout_secs`: request timeout, default 10 (optional)
pub fn create_notifier(config: &toml::Value) -> Result<Box<dyn NotificationInterface>, NotifyError> {
	WebhookNotifierSchema
		.validate(config)
		.map_err(|e| NotifyError::Configuration(e.to_string()))?;

	let endpoint = config
		.get("endpoint")
		.and_then(|v| v.as_str())
		.ok_or_else(|| NotifyError::Configuration("endpoint is required".into()))?;
	let timeout_secs = config
		.get("timeout_secs")
		.and_then(|v| v.as_integer())
		.unwrap_or(10) as u64;

	Ok(Box::new(WebhookNotifier::new(
		endpoint,
		Duration::from_secs(timeout_secs),
	)?))
}

/// Registry entry for the webhook channel.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "webhook";
	type Factory = NotificationFactory;

	fn factory() -> Self::Factory {
		create_notifier
	}
}

impl NotificationRegistry for Registry {}
