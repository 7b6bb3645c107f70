//! End-to-end walkthrough of the linear-with-fork approval scenario.

mod common;

use approval_core::entity::EntityAdapter;
use approval_core::models::{ApprovalStatus, EntityRef};
use approval_core::repository::{ApprovalFilter, ApprovalRepository};
use approval_core::WorkflowError;
use common::builders::*;
use std::collections::HashSet;

fn ticket() -> EntityRef {
    EntityRef::new("ticket", 1)
}

#[tokio::test]
async fn test_get_available_states() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    harness.engine.register(&ticket()).await?;

    // unfiltered introspection sees the single outgoing edge of s1
    let states = harness.engine.available_states(&ticket(), None).await?;
    assert_eq!(states, HashSet::from([STATE2]));

    let states = harness
        .engine
        .available_states(&ticket(), Some(&user1()))
        .await?;
    assert_eq!(states, HashSet::from([STATE2]));

    for actor in [user2(), user3(), user4()] {
        let states = harness
            .engine
            .available_states(&ticket(), Some(&actor))
            .await?;
        assert!(states.is_empty());
    }
    Ok(())
}

#[tokio::test]
async fn test_proceed_through_fork() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let entity = ticket();
    harness.engine.register(&entity).await?;

    // s1 -> s2: only user1 may act
    for actor in [user2(), user3(), user4()] {
        let err = harness
            .engine
            .approve(&entity, &actor, None, false)
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::NoAvailableNextStateForUser);
    }
    assert_eq!(
        harness.entities.get_field(&entity, "my_field").await?,
        Some(STATE1)
    );

    let state = harness.engine.approve(&entity, &user1(), None, false).await?;
    assert_eq!(state, STATE2);

    let approved = harness
        .repository
        .query(
            &ApprovalFilter::new()
                .for_entity(&entity)
                .from_source(STATE1)
                .to_destination(STATE2)
                .with_status(ApprovalStatus::Approved),
        )
        .await?;
    assert_eq!(approved.len(), 1);
    assert_eq!(approved[0].actor, Some(user1().actor_id));
    assert!(approved[0].acted_at.is_some());

    // s2 -> s3: user2 first, then user3; turn order is enforced
    for actor in [user1(), user4(), user3()] {
        let err = harness
            .engine
            .approve(&entity, &actor, None, false)
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::NoAvailableNextStateForUser);
    }

    let state = harness.engine.approve(&entity, &user2(), None, false).await?;
    assert_eq!(state, STATE2, "first approver alone must not move the state");

    // user2 cannot act twice
    let err = harness
        .engine
        .approve(&entity, &user2(), None, false)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::NoAvailableNextStateForUser);

    let state = harness.engine.approve(&entity, &user3(), None, false).await?;
    assert_eq!(state, STATE3);

    let approved = harness
        .repository
        .query(
            &ApprovalFilter::new()
                .for_entity(&entity)
                .from_source(STATE2)
                .to_destination(STATE3)
                .with_status(ApprovalStatus::Approved),
        )
        .await?;
    assert_eq!(approved.len(), 2);
    assert_eq!(approved[0].actor, Some(user2().actor_id));
    assert_eq!(approved[1].actor, Some(user3().actor_id));

    // s3 -> s4 or s5: user4 must name the destination
    for actor in [user1(), user2(), user3()] {
        let err = harness
            .engine
            .approve(&entity, &actor, None, false)
            .await
            .unwrap_err();
        assert_eq!(err, WorkflowError::NoAvailableNextStateForUser);
    }

    let err = harness
        .engine
        .approve(&entity, &user4(), None, false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::NextStateRequired {
            candidates: vec![STATE4, STATE5]
        }
    );

    let err = harness
        .engine
        .approve(&entity, &user4(), Some(STATE3), false)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        WorkflowError::InvalidNextStateForUser {
            given: STATE3,
            candidates: vec![STATE4, STATE5]
        }
    );

    let state = harness
        .engine
        .approve(&entity, &user4(), Some(STATE5), false)
        .await?;
    assert_eq!(state, STATE5);
    assert_eq!(
        harness.entities.get_field(&entity, "my_field").await?,
        Some(STATE5)
    );
    Ok(())
}

#[tokio::test]
async fn test_failed_approve_mutates_nothing() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let entity = ticket();
    harness.engine.register(&entity).await?;
    let before = harness.approvals_for(&entity).await?;

    let err = harness
        .engine
        .approve(&entity, &user2(), None, false)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::NoAvailableNextStateForUser);

    assert_eq!(
        harness.entities.get_field(&entity, "my_field").await?,
        Some(STATE1)
    );
    assert_eq!(harness.approvals_for(&entity).await?, before);
    Ok(())
}

#[tokio::test]
async fn test_register_is_idempotent() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let entity = ticket();

    let state = harness.engine.register(&entity).await?;
    assert_eq!(state, STATE1);
    let count = harness.approval_count(&entity).await?;
    // one record per approver slot of every edge
    assert_eq!(count, 5);

    let state = harness.engine.register(&entity).await?;
    assert_eq!(state, STATE1);
    assert_eq!(harness.approval_count(&entity).await?, count);
    Ok(())
}

#[tokio::test]
async fn test_transition_events_are_published() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let entity = ticket();
    let mut events = harness.publisher.subscribe();
    harness.engine.register(&entity).await?;

    harness.engine.approve(&entity, &user1(), None, false).await?;
    harness.engine.approve(&entity, &user2(), None, false).await?;
    harness.engine.approve(&entity, &user3(), None, false).await?;

    let first = events.recv().await?;
    assert_eq!(first.source_state_id, STATE1);
    assert_eq!(first.destination_state_id, STATE2);
    assert_eq!(first.actor, user1().actor_id);

    // user2's approval alone completed nothing, so the next event is s2 -> s3
    let second = events.recv().await?;
    assert_eq!(second.source_state_id, STATE2);
    assert_eq!(second.destination_state_id, STATE3);
    assert_eq!(second.actor, user3().actor_id);
    Ok(())
}

#[tokio::test]
async fn test_reject_leaves_state_and_unlocks_next_priority() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let entity = ticket();
    harness.engine.register(&entity).await?;
    harness.engine.approve(&entity, &user1(), None, false).await?;

    // user2 (priority 0) rejects; the field stays put
    let state = harness.engine.reject(&entity, &user2(), None, false).await?;
    assert_eq!(state, STATE2);
    assert_eq!(
        harness.entities.get_field(&entity, "my_field").await?,
        Some(STATE2)
    );

    let rejected = harness
        .repository
        .query(
            &ApprovalFilter::new()
                .for_entity(&entity)
                .with_status(ApprovalStatus::Rejected),
        )
        .await?;
    assert_eq!(rejected.len(), 1);
    assert_eq!(rejected[0].actor, Some(user2().actor_id));

    // the rejection leaves the pending set, so user3's slot is now rank 1
    let state = harness.engine.approve(&entity, &user3(), None, false).await?;
    assert_eq!(state, STATE3);
    Ok(())
}

#[tokio::test]
async fn test_available_approvals_across_entities() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let first = EntityRef::new("ticket", 1);
    let second = EntityRef::new("ticket", 2);
    harness.engine.register(&first).await?;
    harness.engine.register(&second).await?;

    // advance the second ticket to s2 so user2 has work there only
    harness.engine.approve(&second, &user1(), None, false).await?;

    let mine = harness.engine.available_approvals(&user1()).await?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].entity, first);

    let mine = harness.engine.available_approvals(&user2()).await?;
    assert_eq!(mine.len(), 1);
    assert_eq!(mine[0].entity, second);
    assert_eq!(mine[0].source_state_id, STATE2);

    let entities = harness.engine.on_approval_entities(&user2()).await?;
    assert_eq!(entities, vec![second]);
    Ok(())
}

#[tokio::test]
async fn test_god_mode_bypasses_authorization_only() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    let entity = ticket();
    harness.engine.register(&entity).await?;

    let outsider = approval_core::Actor::new(9000);
    let err = harness
        .engine
        .approve(&entity, &outsider, None, false)
        .await
        .unwrap_err();
    assert_eq!(err, WorkflowError::NoAvailableNextStateForUser);

    // god mode lets the outsider act, but the state machine still applies
    let state = harness.engine.approve(&entity, &outsider, None, true).await?;
    assert_eq!(state, STATE2);

    let err = harness
        .engine
        .approve(&entity, &outsider, Some(STATE5), true)
        .await
        .unwrap_err();
    assert!(matches!(err, WorkflowError::InvalidNextStateForUser { .. }));
    Ok(())
}

#[tokio::test]
async fn test_initial_and_final_states_surface() -> anyhow::Result<()> {
    let harness = WorkflowHarness::new(standard_scenario());
    assert_eq!(harness.engine.initial_state()?, STATE1);
    assert_eq!(harness.engine.final_states(), vec![STATE4, STATE5]);
    Ok(())
}
