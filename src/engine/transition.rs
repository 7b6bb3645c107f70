//! # Transition Engine
//!
//! The write path: registers entities into their workflow, executes
//! approve / reject under a per-(entity, field) lock, re-derives the current
//! state, triggers cycle cloning, and emits transition events.
//!
//! Validation happens before any write, so a failed call never leaves a
//! partially applied transition behind. Approvals on different entities or
//! fields proceed independently; no global lock is taken.

use crate::authorization::{Actor, AuthorizationAdapter};
use crate::engine::availability::AvailabilityResolver;
use crate::engine::{cycle, skip};
use crate::entity::{require_field, EntityAdapter};
use crate::error::{Result, WorkflowError};
use crate::events::{EventPublisher, TransitionEvent};
use crate::graph::WorkflowGraph;
use crate::models::{ApprovalStatus, EntityRef, NewTransitionApproval, TransitionApproval};
use crate::repository::{ApprovalFilter, ApprovalRepository};
use chrono::Utc;
use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

/// Orchestrator for one (entity-type, field) workflow graph.
pub struct TransitionEngine {
    graph: Arc<WorkflowGraph>,
    repository: Arc<dyn ApprovalRepository>,
    entities: Arc<dyn EntityAdapter>,
    publisher: EventPublisher,
    resolver: AvailabilityResolver,
    locks: DashMap<EntityRef, Arc<Mutex<()>>>,
}

impl TransitionEngine {
    pub fn new(
        graph: Arc<WorkflowGraph>,
        repository: Arc<dyn ApprovalRepository>,
        entities: Arc<dyn EntityAdapter>,
        authorizer: Arc<dyn AuthorizationAdapter>,
        publisher: EventPublisher,
    ) -> Self {
        let resolver = AvailabilityResolver::new(
            Arc::clone(&graph),
            Arc::clone(&repository),
            Arc::clone(&entities),
            authorizer,
        );
        Self {
            graph,
            repository,
            entities,
            publisher,
            resolver,
            locks: DashMap::new(),
        }
    }

    pub fn graph(&self) -> &WorkflowGraph {
        &self.graph
    }

    pub fn resolver(&self) -> &AvailabilityResolver {
        &self.resolver
    }

    /// Exclusive lock scoped to this entity and the engine's field.
    async fn entity_lock(&self, entity: &EntityRef) -> OwnedMutexGuard<()> {
        let lock = self
            .locks
            .entry(entity.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }

    /// Place an entity at the graph's initial state and lay out one approval
    /// record per approver slot of every meta edge, in authoring order.
    /// Idempotent: re-registering an entity that already holds a state
    /// performs no writes.
    pub async fn register(&self, entity: &EntityRef) -> Result<i64> {
        let _guard = self.entity_lock(entity).await;

        if let Some(current) = self
            .entities
            .get_field(entity, self.graph.field_name())
            .await?
        {
            debug!(entity = %entity, state = current, "entity already registered");
            return Ok(current);
        }

        let initial = self.graph.initial_state()?.state_id;
        self.entities
            .set_field(entity, self.graph.field_name(), initial)
            .await?;

        let batch: Vec<NewTransitionApproval> = self
            .graph
            .metas()
            .iter()
            .flat_map(|meta| NewTransitionApproval::from_meta(meta, entity, false))
            .collect();
        self.repository.insert_many(batch).await?;

        info!(entity = %entity, state = initial, "registered entity at initial state");
        Ok(initial)
    }

    /// Destination states currently reachable; without an actor the result is
    /// unfiltered by authorization (introspection/UI use).
    pub async fn available_states(
        &self,
        entity: &EntityRef,
        actor: Option<&Actor>,
    ) -> Result<HashSet<i64>> {
        self.resolver.available_destinations(entity, actor).await
    }

    /// Pending approval records actionable by the actor across all entities
    /// of this graph's type.
    pub async fn available_approvals(&self, actor: &Actor) -> Result<Vec<TransitionApproval>> {
        self.resolver.available_approvals(actor).await
    }

    /// Distinct entities with an approval awaiting the actor.
    pub async fn on_approval_entities(&self, actor: &Actor) -> Result<Vec<EntityRef>> {
        self.resolver.on_approval_entities(actor).await
    }

    pub async fn approve(
        &self,
        entity: &EntityRef,
        actor: &Actor,
        next_state: Option<i64>,
        god_mode: bool,
    ) -> Result<i64> {
        self.act(entity, actor, next_state, god_mode, ApprovalStatus::Approved)
            .await
    }

    /// Mark the actor's pending approval rejected. The field never moves and
    /// no event is emitted; later-priority approvers on the edge unlock.
    pub async fn reject(
        &self,
        entity: &EntityRef,
        actor: &Actor,
        next_state: Option<i64>,
        god_mode: bool,
    ) -> Result<i64> {
        self.act(entity, actor, next_state, god_mode, ApprovalStatus::Rejected)
            .await
    }

    async fn act(
        &self,
        entity: &EntityRef,
        actor: &Actor,
        next_state: Option<i64>,
        god_mode: bool,
        status: ApprovalStatus,
    ) -> Result<i64> {
        let _guard = self.entity_lock(entity).await;

        let current = require_field(self.entities.as_ref(), entity, self.graph.field_name()).await?;

        // god mode keeps the state machine but drops the authorization filter
        let candidates = self
            .resolver
            .candidate_approvals(entity, (!god_mode).then_some(actor))
            .await?;
        if candidates.is_empty() {
            return Err(WorkflowError::NoAvailableNextStateForUser);
        }

        let mut destinations: Vec<i64> = candidates
            .iter()
            .map(|a| a.destination_state_id)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        destinations.sort_unstable();

        let target = match next_state {
            None if destinations.len() == 1 => destinations[0],
            None => {
                return Err(WorkflowError::NextStateRequired {
                    candidates: destinations,
                })
            }
            Some(given) if destinations.contains(&given) => given,
            Some(given) => {
                return Err(WorkflowError::InvalidNextStateForUser {
                    given,
                    candidates: destinations,
                })
            }
        };

        let chosen = candidates
            .iter()
            .find(|a| a.destination_state_id == target)
            .expect("target validated against candidates");
        self.repository
            .mark_action(chosen.approval_id, status, actor.actor_id, Utc::now())
            .await?;

        if status != ApprovalStatus::Approved {
            info!(
                entity = %entity,
                approval_id = chosen.approval_id,
                actor = actor.actor_id,
                "transition approval rejected"
            );
            return Ok(current);
        }

        if !self.edge_complete(entity, current, target).await? {
            debug!(
                entity = %entity,
                source = current,
                destination = target,
                "step incomplete, further approvers pending"
            );
            return Ok(current);
        }

        self.entities
            .set_field(entity, self.graph.field_name(), target)
            .await?;
        cycle::detect_and_clone(&self.graph, self.repository.as_ref(), entity, target).await?;

        // fire-and-forget; a failed notification must not roll back the flip
        if let Err(e) = self.publisher.publish(TransitionEvent::new(
            entity.clone(),
            self.graph.field_name(),
            current,
            target,
            actor.actor_id,
        )) {
            warn!(entity = %entity, error = %e, "transition event not delivered");
        }

        info!(
            entity = %entity,
            source = current,
            destination = target,
            actor = actor.actor_id,
            "state transitioned"
        );
        Ok(target)
    }

    /// An edge completes when no pending, unskipped, enabled record remains
    /// on it.
    async fn edge_complete(&self, entity: &EntityRef, source: i64, destination: i64) -> Result<bool> {
        let remaining = self
            .repository
            .query(
                &ApprovalFilter::new()
                    .for_entity(entity)
                    .for_field(self.graph.field_name())
                    .from_source(source)
                    .to_destination(destination)
                    .with_status(ApprovalStatus::Pending)
                    .with_skipped(false)
                    .with_enabled(true),
            )
            .await?;
        Ok(remaining.is_empty())
    }

    /// Bypass one approval, cascading when its whole step is now skipped.
    pub async fn skip(&self, approval_id: i64) -> Result<()> {
        let approval = self.repository.get(approval_id).await?;
        let _guard = self.entity_lock(&approval.entity).await;

        // re-read under the lock; a concurrent skip may have landed first
        let approval = self.repository.get(approval_id).await?;
        skip::skip_approval(self.repository.as_ref(), &approval).await
    }

    /// The graph's unique initial state.
    pub fn initial_state(&self) -> Result<i64> {
        Ok(self.graph.initial_state()?.state_id)
    }

    /// Destinations of edges with no children.
    pub fn final_states(&self) -> Vec<i64> {
        self.graph
            .final_states()
            .iter()
            .map(|s| s.state_id)
            .collect()
    }
}
