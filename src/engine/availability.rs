//! # Availability Resolver
//!
//! Read-only computation of which destinations and approval records are
//! currently actionable. The "rank within partition" windowing of the source
//! design is an explicit in-memory grouping: pending, unskipped, enabled
//! records are grouped by (source, destination) and only the holders of the
//! lowest priority number in each group (rank 1) are considered live.
//!
//! Reads run unlocked and tolerate staleness; a candidate that disappears
//! between a read and the subsequent approve surfaces as
//! `NoAvailableNextStateForUser` from the write path.

use crate::authorization::{Actor, AuthorizationAdapter};
use crate::entity::EntityAdapter;
use crate::error::Result;
use crate::graph::WorkflowGraph;
use crate::models::{ApprovalStatus, EntityRef, TransitionApproval};
use crate::repository::{ApprovalFilter, ApprovalRepository};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Keep only rank-1 records per (source, destination) partition.
///
/// Rank is dense over priority ascending; every record tied at the minimum
/// priority of its partition survives.
pub fn rank_one(approvals: Vec<TransitionApproval>) -> Vec<TransitionApproval> {
    let mut minimums: HashMap<(i64, i64), i32> = HashMap::new();
    for approval in &approvals {
        minimums
            .entry(approval.edge())
            .and_modify(|m| *m = (*m).min(approval.priority))
            .or_insert(approval.priority);
    }

    approvals
        .into_iter()
        .filter(|a| minimums[&a.edge()] == a.priority)
        .collect()
}

/// Read path over one workflow graph.
pub struct AvailabilityResolver {
    graph: Arc<WorkflowGraph>,
    repository: Arc<dyn ApprovalRepository>,
    entities: Arc<dyn EntityAdapter>,
    authorizer: Arc<dyn AuthorizationAdapter>,
}

impl AvailabilityResolver {
    pub fn new(
        graph: Arc<WorkflowGraph>,
        repository: Arc<dyn ApprovalRepository>,
        entities: Arc<dyn EntityAdapter>,
        authorizer: Arc<dyn AuthorizationAdapter>,
    ) -> Self {
        Self {
            graph,
            repository,
            entities,
            authorizer,
        }
    }

    fn actionable_filter(&self) -> ApprovalFilter {
        ApprovalFilter::new()
            .for_field(self.graph.field_name())
            .with_status(ApprovalStatus::Pending)
            .with_skipped(false)
            .with_enabled(true)
    }

    /// Rank-1 actionable records outgoing from the entity's live state,
    /// optionally restricted to what `actor` is entitled to act on.
    pub async fn candidate_approvals(
        &self,
        entity: &EntityRef,
        actor: Option<&Actor>,
    ) -> Result<Vec<TransitionApproval>> {
        let current = match self
            .entities
            .get_field(entity, self.graph.field_name())
            .await?
        {
            Some(state_id) => state_id,
            None => return Ok(Vec::new()),
        };

        let pending = self
            .repository
            .query(&self.actionable_filter().for_entity(entity))
            .await?;
        let ranked = rank_one(pending);

        let mut candidates = Vec::new();
        for approval in ranked {
            if approval.source_state_id != current {
                continue;
            }
            if let Some(actor) = actor {
                if !self.authorizer.is_authorized(&approval, actor).await? {
                    continue;
                }
            }
            candidates.push(approval);
        }

        debug!(
            entity = %entity,
            current_state = current,
            candidates = candidates.len(),
            "resolved candidate approvals"
        );
        Ok(candidates)
    }

    /// Destination states reachable right now.
    ///
    /// With no actor given, authorization is not applied (introspection use).
    /// An empty set identifies a terminal or stalled state.
    pub async fn available_destinations(
        &self,
        entity: &EntityRef,
        actor: Option<&Actor>,
    ) -> Result<HashSet<i64>> {
        Ok(self
            .candidate_approvals(entity, actor)
            .await?
            .iter()
            .map(|a| a.destination_state_id)
            .collect())
    }

    /// "My pending approvals" across every entity of this graph's type.
    pub async fn available_approvals(&self, actor: &Actor) -> Result<Vec<TransitionApproval>> {
        let pending = self
            .repository
            .query(
                &self
                    .actionable_filter()
                    .for_entity_type(self.graph.entity_type()),
            )
            .await?;

        let mut per_entity: HashMap<EntityRef, Vec<TransitionApproval>> = HashMap::new();
        for approval in pending {
            per_entity
                .entry(approval.entity.clone())
                .or_default()
                .push(approval);
        }

        let mut visible = Vec::new();
        for (entity, records) in per_entity {
            let current = match self
                .entities
                .get_field(&entity, self.graph.field_name())
                .await?
            {
                Some(state_id) => state_id,
                None => continue,
            };
            for approval in rank_one(records) {
                if approval.source_state_id != current {
                    continue;
                }
                if self.authorizer.is_authorized(&approval, actor).await? {
                    visible.push(approval);
                }
            }
        }
        visible.sort_by_key(|a| (a.entity.entity_id, a.sort_key));
        Ok(visible)
    }

    /// Distinct entities with at least one approval visible to the actor.
    pub async fn on_approval_entities(&self, actor: &Actor) -> Result<Vec<EntityRef>> {
        let mut seen = HashSet::new();
        let mut entities = Vec::new();
        for approval in self.available_approvals(actor).await? {
            if seen.insert(approval.entity.clone()) {
                entities.push(approval.entity);
            }
        }
        Ok(entities)
    }
}
