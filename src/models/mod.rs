//! Data layer: graph nodes, edge templates and live approval records.

pub mod entity_ref;
pub mod state;
pub mod transition_approval;
pub mod transition_meta;

// Re-export core models for easy access
pub use entity_ref::EntityRef;
pub use state::State;
pub use transition_approval::{ApprovalStatus, NewTransitionApproval, TransitionApproval};
pub use transition_meta::{ApproverSlot, TransitionMeta};
