//! # Skip Cascade
//!
//! Lets an approval be bypassed without rewriting the graph. Skipping the
//! last unskipped record of an edge bypasses the whole step: for every record
//! skipped at that layer and every still-unskipped downstream record, a
//! routing approval is fabricated connecting the skipped edge's source
//! directly to the downstream destination, and the direct downstream records
//! are themselves marked skipped. Deeper cascades emerge from subsequent
//! skip calls on the propagated layer.

use crate::error::Result;
use crate::models::{NewTransitionApproval, TransitionApproval};
use crate::repository::{ApprovalFilter, ApprovalRepository};
use tracing::{debug, info};

/// Mark one approval skipped and cascade if its whole step is now bypassed.
///
/// Idempotent: skipping an already-skipped record is a logged no-op.
pub async fn skip_approval(
    repository: &dyn ApprovalRepository,
    approval: &TransitionApproval,
) -> Result<()> {
    if approval.skipped {
        info!(
            approval_id = approval.approval_id,
            "transition approval is already skipped"
        );
        return Ok(());
    }

    let approval = repository.mark_skipped(approval.approval_id).await?;

    let edge_filter = ApprovalFilter::new()
        .for_entity(&approval.entity)
        .for_field(&approval.field_name)
        .from_source(approval.source_state_id)
        .to_destination(approval.destination_state_id);

    let unskipped_peers = repository
        .query(&edge_filter.clone().with_skipped(false))
        .await?;
    if !unskipped_peers.is_empty() {
        // other approvers still hold the step
        return Ok(());
    }

    let skipped_layer = repository
        .query(&edge_filter.with_skipped(true))
        .await?;
    let downstream = repository
        .query(
            &ApprovalFilter::new()
                .for_entity(&approval.entity)
                .for_field(&approval.field_name)
                .from_source(approval.destination_state_id)
                .with_skipped(false),
        )
        .await?;

    for skipped_approval in &skipped_layer {
        for downstream_approval in &downstream {
            let (route, created) = repository
                .upsert_skip_route(NewTransitionApproval {
                    entity: approval.entity.clone(),
                    field_name: approval.field_name.clone(),
                    meta_id: approval.meta_id,
                    source_state_id: skipped_approval.source_state_id,
                    destination_state_id: downstream_approval.destination_state_id,
                    priority: downstream_approval.priority,
                    permissions: downstream_approval.permissions.clone(),
                    groups: downstream_approval.groups.clone(),
                    fixed_actor: downstream_approval.fixed_actor,
                    cloned: false,
                    skipped_from: vec![approval.approval_id],
                })
                .await?;
            debug!(
                approval_id = approval.approval_id,
                route_id = route.approval_id,
                created,
                source = route.source_state_id,
                destination = route.destination_state_id,
                "fabricated skip route"
            );
        }
    }

    // propagate the bypass one layer forward
    for downstream_approval in &downstream {
        repository
            .mark_skipped(downstream_approval.approval_id)
            .await?;
    }

    Ok(())
}
