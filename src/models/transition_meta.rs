use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One approver position on a transition edge template.
///
/// Slots are ordered by `priority` (ascending); an approver at a higher
/// priority number cannot act while a lower-numbered slot is still pending.
/// A slot with no permission, group, or fixed-actor constraint is open to
/// anyone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApproverSlot {
    pub priority: i32,
    pub permissions: HashSet<String>,
    pub groups: HashSet<String>,
    pub actor: Option<i64>,
}

impl ApproverSlot {
    pub fn at_priority(priority: i32) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_actor(mut self, actor_id: i64) -> Self {
        self.actor = Some(actor_id);
        self
    }

    /// True when nothing constrains who may act on this slot.
    pub fn is_open(&self) -> bool {
        self.permissions.is_empty() && self.groups.is_empty() && self.actor.is_none()
    }
}

/// Directed edge template of a workflow graph.
///
/// Keyed by (entity-type, field, source state, destination state) and owning
/// the ordered approver slots for the step. Metas are authored once per
/// graph and immutable afterwards; live per-entity records are
/// [`TransitionApproval`](crate::models::TransitionApproval) instances
/// created from these templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionMeta {
    pub meta_id: i64,
    pub entity_type: String,
    pub field_name: String,
    pub source_state_id: i64,
    pub destination_state_id: i64,
    pub slots: Vec<ApproverSlot>,
}

impl TransitionMeta {
    /// Edge identity within the graph as a (source, destination) pair.
    pub fn edge(&self) -> (i64, i64) {
        (self.source_state_id, self.destination_state_id)
    }
}
