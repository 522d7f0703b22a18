//! Common types module for the fulfillment workflow system.
//!
//! This module defines the core data types and structures used throughout
//! the workflow system. It provides a centralized location for shared types
//! to ensure consistency across all workflow components.

/// Canonical request and summary types exchanged between transport and core.
pub mod api;
/// Order lifecycle types: stages, history entries, and the order record.
pub mod order;
/// Registry trait for self-registering backend implementations.
pub mod registry;
/// Staff types: roles, worker records, and assignment snapshots.
pub mod staff;
/// Storage key namespaces for persistent collections.
pub mod storage;
/// Customer account types.
pub mod user;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use api::*;
pub use order::*;
pub use registry::*;
pub use staff::*;
pub use storage::*;
pub use user::*;
pub use validation::*;
