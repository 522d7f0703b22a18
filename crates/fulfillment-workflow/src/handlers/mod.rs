//! Stage-boundary handlers invoked by the orchestration engine.
//!
//! Each handler is a stateless unit: it owns no in-process state and is
//! safe to re-invoke under at-least-once delivery, relying on the stage
//! engine's conditional commit to reject duplicates.

pub mod finalize;
pub mod stage;
