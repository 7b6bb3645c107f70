//! # Approval Instance Store
//!
//! Repository seam over the live [`TransitionApproval`] records. The engine
//! talks to storage exclusively through [`ApprovalRepository`]; an embedding
//! application implements the trait over its own store, and
//! [`InMemoryApprovalRepository`] is the reference implementation used by the
//! test suite.
//!
//! Queries are field-equality conjunctions expressed with [`ApprovalFilter`];
//! the "rank within partition by priority" windowing the resolver needs is an
//! explicit in-memory grouping on top of these filters rather than a storage
//! feature. Records are append-only: inserts allocate a per-(entity, field)
//! `sort_key`, updates only touch status and flags, nothing is ever deleted.

use crate::error::{Result, WorkflowError};
use crate::models::{
    ApprovalStatus, EntityRef, NewTransitionApproval, TransitionApproval,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Field-equality conjunction over approval records.
#[derive(Debug, Clone, Default)]
pub struct ApprovalFilter {
    pub entity: Option<EntityRef>,
    pub entity_type: Option<String>,
    pub field_name: Option<String>,
    pub meta_id: Option<i64>,
    pub source_state_id: Option<i64>,
    pub destination_state_id: Option<i64>,
    pub status: Option<ApprovalStatus>,
    pub skipped: Option<bool>,
    pub enabled: Option<bool>,
}

impl ApprovalFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_entity(mut self, entity: &EntityRef) -> Self {
        self.entity = Some(entity.clone());
        self
    }

    pub fn for_entity_type(mut self, entity_type: impl Into<String>) -> Self {
        self.entity_type = Some(entity_type.into());
        self
    }

    pub fn for_field(mut self, field_name: impl Into<String>) -> Self {
        self.field_name = Some(field_name.into());
        self
    }

    pub fn for_meta(mut self, meta_id: i64) -> Self {
        self.meta_id = Some(meta_id);
        self
    }

    pub fn from_source(mut self, state_id: i64) -> Self {
        self.source_state_id = Some(state_id);
        self
    }

    pub fn to_destination(mut self, state_id: i64) -> Self {
        self.destination_state_id = Some(state_id);
        self
    }

    pub fn with_status(mut self, status: ApprovalStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_skipped(mut self, skipped: bool) -> Self {
        self.skipped = Some(skipped);
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    pub fn matches(&self, approval: &TransitionApproval) -> bool {
        fn check<T: PartialEq>(want: &Option<T>, have: &T) -> bool {
            want.as_ref().is_none_or(|w| w == have)
        }

        check(&self.entity, &approval.entity)
            && check(&self.entity_type, &approval.entity.entity_type)
            && check(&self.field_name, &approval.field_name)
            && check(&self.meta_id, &approval.meta_id)
            && check(&self.source_state_id, &approval.source_state_id)
            && check(&self.destination_state_id, &approval.destination_state_id)
            && check(&self.status, &approval.status)
            && check(&self.skipped, &approval.skipped)
            && check(&self.enabled, &approval.enabled)
    }
}

/// Storage seam for approval instances.
///
/// Implementations must keep `query` results ordered by `sort_key` ascending
/// so callers can rely on append order for the entity+field log.
#[async_trait]
pub trait ApprovalRepository: Send + Sync {
    /// Insert a batch, allocating ids and per-(entity, field) sort keys in
    /// the given order.
    async fn insert_many(
        &self,
        batch: Vec<NewTransitionApproval>,
    ) -> Result<Vec<TransitionApproval>>;

    async fn get(&self, approval_id: i64) -> Result<TransitionApproval>;

    async fn query(&self, filter: &ApprovalFilter) -> Result<Vec<TransitionApproval>>;

    /// Stamp an approve/reject action onto a record.
    async fn mark_action(
        &self,
        approval_id: i64,
        status: ApprovalStatus,
        actor: i64,
        acted_at: DateTime<Utc>,
    ) -> Result<TransitionApproval>;

    async fn mark_skipped(&self, approval_id: i64) -> Result<TransitionApproval>;

    /// Atomic update-or-create for skip-cascade fabrication.
    ///
    /// Identity is (entity, field, meta, source, destination, priority,
    /// fixed actor) over still-pending records. On update the requirement
    /// sets and `skipped_from` links of `new` are merged into the existing
    /// record, keeping repeated cascades from duplicating routes. Returns the
    /// record and whether it was created.
    async fn upsert_skip_route(
        &self,
        new: NewTransitionApproval,
    ) -> Result<(TransitionApproval, bool)>;
}

/// Reference in-memory implementation.
#[derive(Debug)]
pub struct InMemoryApprovalRepository {
    records: RwLock<HashMap<i64, TransitionApproval>>,
    next_id: AtomicI64,
}

impl Default for InMemoryApprovalRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryApprovalRepository {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }

    fn next_sort_key(records: &HashMap<i64, TransitionApproval>, new: &NewTransitionApproval) -> i32 {
        records
            .values()
            .filter(|a| a.entity == new.entity && a.field_name == new.field_name)
            .map(|a| a.sort_key)
            .max()
            .unwrap_or(0)
            + 1
    }

    fn materialize(&self, new: NewTransitionApproval, sort_key: i32) -> TransitionApproval {
        TransitionApproval {
            approval_id: self.next_id.fetch_add(1, Ordering::SeqCst),
            entity: new.entity,
            field_name: new.field_name,
            meta_id: new.meta_id,
            source_state_id: new.source_state_id,
            destination_state_id: new.destination_state_id,
            priority: new.priority,
            status: ApprovalStatus::Pending,
            skipped: false,
            enabled: true,
            actor: None,
            acted_at: None,
            permissions: new.permissions,
            groups: new.groups,
            fixed_actor: new.fixed_actor,
            sort_key,
            cloned: new.cloned,
            skipped_from: new.skipped_from,
        }
    }
}

#[async_trait]
impl ApprovalRepository for InMemoryApprovalRepository {
    async fn insert_many(
        &self,
        batch: Vec<NewTransitionApproval>,
    ) -> Result<Vec<TransitionApproval>> {
        let mut records = self.records.write();
        let mut inserted = Vec::with_capacity(batch.len());
        for new in batch {
            let sort_key = Self::next_sort_key(&records, &new);
            let approval = self.materialize(new, sort_key);
            records.insert(approval.approval_id, approval.clone());
            inserted.push(approval);
        }
        Ok(inserted)
    }

    async fn get(&self, approval_id: i64) -> Result<TransitionApproval> {
        self.records
            .read()
            .get(&approval_id)
            .cloned()
            .ok_or(WorkflowError::ApprovalNotFound { approval_id })
    }

    async fn query(&self, filter: &ApprovalFilter) -> Result<Vec<TransitionApproval>> {
        let records = self.records.read();
        let mut matched: Vec<TransitionApproval> = records
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        matched.sort_by_key(|a| (a.sort_key, a.approval_id));
        Ok(matched)
    }

    async fn mark_action(
        &self,
        approval_id: i64,
        status: ApprovalStatus,
        actor: i64,
        acted_at: DateTime<Utc>,
    ) -> Result<TransitionApproval> {
        let mut records = self.records.write();
        let approval = records
            .get_mut(&approval_id)
            .ok_or(WorkflowError::ApprovalNotFound { approval_id })?;
        approval.status = status;
        approval.actor = Some(actor);
        approval.acted_at = Some(acted_at);
        Ok(approval.clone())
    }

    async fn mark_skipped(&self, approval_id: i64) -> Result<TransitionApproval> {
        let mut records = self.records.write();
        let approval = records
            .get_mut(&approval_id)
            .ok_or(WorkflowError::ApprovalNotFound { approval_id })?;
        approval.skipped = true;
        Ok(approval.clone())
    }

    async fn upsert_skip_route(
        &self,
        new: NewTransitionApproval,
    ) -> Result<(TransitionApproval, bool)> {
        let mut records = self.records.write();

        let existing_id = records
            .values()
            .find(|a| {
                a.entity == new.entity
                    && a.field_name == new.field_name
                    && a.meta_id == new.meta_id
                    && a.source_state_id == new.source_state_id
                    && a.destination_state_id == new.destination_state_id
                    && a.priority == new.priority
                    && a.fixed_actor == new.fixed_actor
                    && a.status == ApprovalStatus::Pending
            })
            .map(|a| a.approval_id);

        if let Some(approval_id) = existing_id {
            let approval = records.get_mut(&approval_id).expect("record present");
            approval.permissions.extend(new.permissions);
            approval.groups.extend(new.groups);
            for link in new.skipped_from {
                if !approval.skipped_from.contains(&link) {
                    approval.skipped_from.push(link);
                }
            }
            return Ok((approval.clone(), false));
        }

        let sort_key = Self::next_sort_key(&records, &new);
        let approval = self.materialize(new, sort_key);
        records.insert(approval.approval_id, approval.clone());
        Ok((approval, true))
    }
}
