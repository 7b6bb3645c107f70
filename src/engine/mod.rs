// Transition-approval engine: availability resolution, the approve/reject
// orchestrator, the skip cascade and cycle-safe cloning.

pub mod availability;
pub mod cycle;
pub mod skip;
pub mod transition;

// Re-export main types for convenient access
pub use availability::{rank_one, AvailabilityResolver};
pub use transition::TransitionEngine;
