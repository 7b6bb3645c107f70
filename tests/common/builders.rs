//! Scenario builders shared by the integration tests.

use approval_core::authorization::{Actor, PredicateAuthorizer};
use approval_core::engine::TransitionEngine;
use approval_core::entity::InMemoryEntityStore;
use approval_core::events::EventPublisher;
use approval_core::graph::{WorkflowGraph, WorkflowGraphBuilder};
use approval_core::models::{ApproverSlot, EntityRef, TransitionApproval};
use approval_core::repository::{ApprovalFilter, ApprovalRepository, InMemoryApprovalRepository};
use approval_core::Result;
use std::sync::Arc;

/// Engine plus direct handles on its collaborators for assertions.
pub struct WorkflowHarness {
    pub engine: TransitionEngine,
    pub repository: Arc<InMemoryApprovalRepository>,
    pub entities: Arc<InMemoryEntityStore>,
    pub publisher: EventPublisher,
}

impl WorkflowHarness {
    pub fn new(graph: WorkflowGraph) -> Self {
        let repository = Arc::new(InMemoryApprovalRepository::new());
        let entities = Arc::new(InMemoryEntityStore::new());
        let publisher = EventPublisher::default();
        let engine = TransitionEngine::new(
            Arc::new(graph),
            repository.clone(),
            entities.clone(),
            Arc::new(PredicateAuthorizer::new()),
            publisher.clone(),
        );
        Self {
            engine,
            repository,
            entities,
            publisher,
        }
    }

    /// Every approval record of the entity, in append order.
    pub async fn approvals_for(&self, entity: &EntityRef) -> Result<Vec<TransitionApproval>> {
        self.repository
            .query(&ApprovalFilter::new().for_entity(entity))
            .await
    }

    pub async fn approval_count(&self, entity: &EntityRef) -> Result<usize> {
        Ok(self.approvals_for(entity).await?.len())
    }

    /// Latest-created record of the entity's log.
    pub async fn latest_approval(&self, entity: &EntityRef) -> Result<TransitionApproval> {
        let approvals = self.approvals_for(entity).await?;
        Ok(approvals.last().expect("entity has approvals").clone())
    }
}

pub const STATE1: i64 = 1;
pub const STATE2: i64 = 2;
pub const STATE3: i64 = 3;
pub const STATE4: i64 = 4;
pub const STATE5: i64 = 5;

/// The linear-with-fork scenario:
/// s1 -> s2 (user1), s2 -> s3 (user2 then user3 in priority order),
/// s3 -> s4 / s3 -> s5 (user4, explicit destination).
pub fn standard_scenario() -> WorkflowGraph {
    WorkflowGraphBuilder::new("ticket", "my_field")
        .state(STATE1, "s1")
        .state(STATE2, "s2")
        .state(STATE3, "s3")
        .state(STATE4, "s4")
        .state(STATE5, "s5")
        .transition(
            STATE1,
            STATE2,
            vec![ApproverSlot::at_priority(0).with_permission("perm1")],
        )
        .transition(
            STATE2,
            STATE3,
            vec![
                ApproverSlot::at_priority(0).with_permission("perm2"),
                ApproverSlot::at_priority(1).with_permission("perm3"),
            ],
        )
        .transition(
            STATE3,
            STATE4,
            vec![ApproverSlot::at_priority(0).with_permission("perm4")],
        )
        .transition(
            STATE3,
            STATE5,
            vec![ApproverSlot::at_priority(0).with_permission("perm4")],
        )
        .build()
        .expect("standard scenario builds")
}

pub fn user1() -> Actor {
    Actor::new(2001).with_permission("perm1")
}

pub fn user2() -> Actor {
    Actor::new(2002).with_permission("perm2")
}

pub fn user3() -> Actor {
    Actor::new(2003).with_permission("perm3")
}

pub fn user4() -> Actor {
    Actor::new(2004).with_permission("perm4")
}

pub const OPEN: i64 = 1;
pub const IN_PROGRESS: i64 = 2;
pub const RESOLVED: i64 = 3;
pub const RE_OPENED: i64 = 4;
pub const CLOSED: i64 = 5;

/// The cyclic scenario:
/// open -> in_progress -> resolved <-> re_opened -> in_progress,
/// resolved -> closed. Every slot demands a permission the test actor lacks,
/// so traversal exercises god mode.
pub fn circular_scenario() -> WorkflowGraph {
    let slot = || vec![ApproverSlot::at_priority(0).with_permission("operate")];
    WorkflowGraphBuilder::new("issue", "my_field")
        .state(OPEN, "open")
        .state(IN_PROGRESS, "in_progress")
        .state(RESOLVED, "resolved")
        .state(RE_OPENED, "re_opened")
        .state(CLOSED, "closed")
        .transition(OPEN, IN_PROGRESS, slot())
        .transition(IN_PROGRESS, RESOLVED, slot())
        .transition(RESOLVED, RE_OPENED, slot())
        .transition(RE_OPENED, IN_PROGRESS, slot())
        .transition(RESOLVED, CLOSED, slot())
        .build()
        .expect("circular scenario builds")
}

/// Linear chain with a forked tail, used by the skip-cascade tests:
/// s1 -> s2 (user1), s2 -> s3 (user2), s3 -> s4 and s3 -> s5 (user4).
pub fn skip_scenario() -> WorkflowGraph {
    WorkflowGraphBuilder::new("ticket", "my_field")
        .state(STATE1, "s1")
        .state(STATE2, "s2")
        .state(STATE3, "s3")
        .state(STATE4, "s4")
        .state(STATE5, "s5")
        .transition(
            STATE1,
            STATE2,
            vec![ApproverSlot::at_priority(0).with_permission("perm1")],
        )
        .transition(
            STATE2,
            STATE3,
            vec![ApproverSlot::at_priority(0).with_permission("perm2")],
        )
        .transition(
            STATE3,
            STATE4,
            vec![ApproverSlot::at_priority(0).with_permission("perm4")],
        )
        .transition(
            STATE3,
            STATE5,
            vec![ApproverSlot::at_priority(0).with_permission("perm4")],
        )
        .build()
        .expect("skip scenario builds")
}
