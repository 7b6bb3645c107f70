//! # Entity Adapter
//!
//! The engine never owns business entities; it reads and writes the tracked
//! field through this seam, addressing entities by [`EntityRef`] handles.
//! Embedding applications implement [`EntityAdapter`] over their own entity
//! storage; [`InMemoryEntityStore`] backs the test suite.

use crate::error::{Result, WorkflowError};
use crate::models::EntityRef;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Field access over opaque entity handles.
#[async_trait]
pub trait EntityAdapter: Send + Sync {
    /// Current state id held in the entity's tracked field, if any.
    async fn get_field(&self, entity: &EntityRef, field_name: &str) -> Result<Option<i64>>;

    /// Write a new state id into the entity's tracked field.
    async fn set_field(&self, entity: &EntityRef, field_name: &str, state_id: i64) -> Result<()>;
}

/// Reference in-memory implementation keyed by (entity, field).
#[derive(Debug, Default)]
pub struct InMemoryEntityStore {
    fields: RwLock<HashMap<(EntityRef, String), i64>>,
}

impl InMemoryEntityStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EntityAdapter for InMemoryEntityStore {
    async fn get_field(&self, entity: &EntityRef, field_name: &str) -> Result<Option<i64>> {
        Ok(self
            .fields
            .read()
            .get(&(entity.clone(), field_name.to_string()))
            .copied())
    }

    async fn set_field(&self, entity: &EntityRef, field_name: &str, state_id: i64) -> Result<()> {
        self.fields
            .write()
            .insert((entity.clone(), field_name.to_string()), state_id);
        Ok(())
    }
}

/// Read the field and fail if the entity was never registered.
pub async fn require_field(
    adapter: &dyn EntityAdapter,
    entity: &EntityRef,
    field_name: &str,
) -> Result<i64> {
    adapter
        .get_field(entity, field_name)
        .await?
        .ok_or_else(|| {
            WorkflowError::Entity(format!(
                "entity {entity} has no value in tracked field {field_name}"
            ))
        })
}
