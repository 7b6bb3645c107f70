//! # Cycle Detection & Cloning
//!
//! A looping graph can bring an entity back to a state whose outgoing
//! approval records were already consumed on an earlier visit. Reusing those
//! records would replay stale actor history, so after every transition the
//! engine walks the states reachable next and, per meta edge, either leaves a
//! still-pending record alone, creates a first-ever set, or clones a fresh
//! pending set marked `cloned` while the historical records stay untouched
//! for auditing.
//!
//! Cloning runs one hop ahead of the entity: when a state is entered, the
//! outgoing edges of every destination now reachable are refreshed, so the
//! records exist before the next approve call needs them. The routine is
//! idempotent; invoked when nothing changed, it writes nothing. A pending
//! skip-fabricated route carrying an edge's meta also suppresses re-creation,
//! keeping an active bypass in force across re-entries.

use crate::error::Result;
use crate::graph::WorkflowGraph;
use crate::models::{
    ApprovalStatus, EntityRef, NewTransitionApproval, TransitionApproval,
};
use crate::repository::{ApprovalFilter, ApprovalRepository};
use tracing::debug;

/// Make sure every outgoing edge of `state_id` has live approval records for
/// the entity, cloning consumed edges and creating never-instantiated ones.
///
/// Returns the records written, empty when the call was a no-op.
pub async fn ensure_outgoing(
    graph: &WorkflowGraph,
    repository: &dyn ApprovalRepository,
    entity: &EntityRef,
    state_id: i64,
) -> Result<Vec<TransitionApproval>> {
    let mut written = Vec::new();

    for meta in graph.outgoing(state_id) {
        let existing = repository
            .query(
                &ApprovalFilter::new()
                    .for_entity(entity)
                    .for_field(graph.field_name())
                    .for_meta(meta.meta_id),
            )
            .await?;

        if existing.iter().any(TransitionApproval::is_actionable) {
            continue;
        }

        let cloned = !existing.is_empty();
        let batch = NewTransitionApproval::from_meta(meta, entity, cloned);
        let inserted = repository.insert_many(batch).await?;

        debug!(
            entity = %entity,
            meta_id = meta.meta_id,
            source = meta.source_state_id,
            destination = meta.destination_state_id,
            cloned,
            records = inserted.len(),
            "ensured outgoing approvals"
        );
        written.extend(inserted);
    }

    Ok(written)
}

/// Run cycle detection for an entity standing at `state_id`.
///
/// Refreshes the state's own outgoing edges, then the outgoing edges of every
/// destination reachable through a still-actionable record, so a repeat
/// traversal finds fresh pending records waiting.
pub async fn detect_and_clone(
    graph: &WorkflowGraph,
    repository: &dyn ApprovalRepository,
    entity: &EntityRef,
    state_id: i64,
) -> Result<Vec<TransitionApproval>> {
    let mut written = ensure_outgoing(graph, repository, entity, state_id).await?;

    let actionable = repository
        .query(
            &ApprovalFilter::new()
                .for_entity(entity)
                .for_field(graph.field_name())
                .from_source(state_id)
                .with_status(ApprovalStatus::Pending)
                .with_skipped(false)
                .with_enabled(true),
        )
        .await?;

    let mut destinations: Vec<i64> = actionable
        .iter()
        .map(|a| a.destination_state_id)
        .collect();
    destinations.sort_unstable();
    destinations.dedup();

    for destination in destinations {
        if destination == state_id {
            continue;
        }
        written.extend(ensure_outgoing(graph, repository, entity, destination).await?);
    }

    Ok(written)
}
