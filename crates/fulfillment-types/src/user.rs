//! Customer account types for the fulfillment workflow system.

use serde::{Deserialize, Serialize};

/// A customer account, identified by contact address.
///
/// The order history is append-only and mutated only through the user
/// store's atomic append, never a read-modify-write replace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
	/// Contact address, the account identifier.
	pub address: String,
	/// Identifiers of completed orders, in completion order.
	#[serde(default)]
	pub order_history: Vec<String>,
}

impl User {
	/// Creates an account with an empty history.
	pub fn new(address: impl Into<String>) -> Self {
		Self {
			address: address.into(),
			order_history: Vec::new(),
		}
	}
}
