//! # Transition Approval Model
//!
//! The live, per-entity unit of work: one approver slot's pending / approved /
//! rejected record for one traversal of one edge.
//!
//! ## Overview
//!
//! Instances are bulk-created from [`TransitionMeta`] templates when an entity
//! enters a source state, mutated only by approve / reject / skip, and never
//! deleted: history is append-only. A second instance for the same
//! (entity, field, meta) arises only from skip-cascade fabrication (marked via
//! `skipped_from`) or cycle cloning (marked `cloned`).
//!
//! ## Ordering
//!
//! The original back/forward pointer chain is realized here as an append-only
//! log: every instance carries a `sort_key` allocated sequentially per
//! (entity, field) by the repository, giving chronological traversal order
//! for auditing and cycle bookkeeping.

use crate::models::{EntityRef, TransitionMeta};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Status of a single approval instance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    /// Waiting for its approver to act
    #[default]
    Pending,
    /// Approver signed off
    Approved,
    /// Approver turned the transition down
    Rejected,
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Approved => write!(f, "approved"),
            Self::Rejected => write!(f, "rejected"),
        }
    }
}

impl std::str::FromStr for ApprovalStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(format!("Invalid approval status: {s}")),
        }
    }
}

/// A concrete approval record for one edge traversal.
///
/// `priority`, `permissions`, `groups` and `fixed_actor` are copied from the
/// originating [`ApproverSlot`](crate::models::ApproverSlot) at creation so
/// the record stays self-describing even if the graph is re-authored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionApproval {
    pub approval_id: i64,
    pub entity: EntityRef,
    pub field_name: String,
    pub meta_id: i64,
    pub source_state_id: i64,
    pub destination_state_id: i64,
    pub priority: i32,
    pub status: ApprovalStatus,
    pub skipped: bool,
    pub enabled: bool,
    pub actor: Option<i64>,
    pub acted_at: Option<DateTime<Utc>>,
    pub permissions: HashSet<String>,
    pub groups: HashSet<String>,
    pub fixed_actor: Option<i64>,
    /// Position in the entity+field append-only log.
    pub sort_key: i32,
    /// Fabricated by cycle detection on a repeat traversal.
    pub cloned: bool,
    /// Ids of skipped approvals whose bypass fabricated this instance.
    pub skipped_from: Vec<i64>,
}

impl TransitionApproval {
    /// Pending, unskipped and enabled: the only records availability
    /// resolution considers.
    pub fn is_actionable(&self) -> bool {
        self.status == ApprovalStatus::Pending && !self.skipped && self.enabled
    }

    /// Consumed records no longer hold up their edge.
    pub fn is_consumed(&self) -> bool {
        !self.is_actionable()
    }

    pub fn edge(&self) -> (i64, i64) {
        (self.source_state_id, self.destination_state_id)
    }
}

/// Creation payload; `approval_id` and `sort_key` are allocated by the
/// repository on insert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewTransitionApproval {
    pub entity: EntityRef,
    pub field_name: String,
    pub meta_id: i64,
    pub source_state_id: i64,
    pub destination_state_id: i64,
    pub priority: i32,
    pub permissions: HashSet<String>,
    pub groups: HashSet<String>,
    pub fixed_actor: Option<i64>,
    pub cloned: bool,
    pub skipped_from: Vec<i64>,
}

impl NewTransitionApproval {
    /// Instantiate one record per approver slot of a meta edge.
    pub fn from_meta(meta: &TransitionMeta, entity: &EntityRef, cloned: bool) -> Vec<Self> {
        meta.slots
            .iter()
            .map(|slot| Self {
                entity: entity.clone(),
                field_name: meta.field_name.clone(),
                meta_id: meta.meta_id,
                source_state_id: meta.source_state_id,
                destination_state_id: meta.destination_state_id,
                priority: slot.priority,
                permissions: slot.permissions.clone(),
                groups: slot.groups.clone(),
                fixed_actor: slot.actor,
                cloned,
                skipped_from: Vec::new(),
            })
            .collect()
    }
}
