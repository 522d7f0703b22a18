//! Registry trait for self-registering implementations.
//!
//! Each pluggable backend module (storage, orchestration, notification) must
//! provide a Registry struct implementing this trait, declaring the name used
//! in configuration files together with its factory function.

/// Base trait for implementation registries.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation,
	/// for example "memory" for `storage.backend = "memory"`.
	const NAME: &'static str;

	/// The factory function type this implementation provides. Each module
	/// defines its own factory signature.
	type Factory;

	/// Returns the factory function that creates instances of this
	/// implementation from its configuration table.
	fn factory() -> Self::Factory;
}
