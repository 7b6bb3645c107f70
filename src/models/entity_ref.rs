use serde::{Deserialize, Serialize};
use std::fmt;

/// Polymorphic handle to an external business entity.
///
/// The engine never depends on concrete entity schemas; it identifies an
/// entity by a type tag plus an opaque id and reads/writes the tracked field
/// through the [`EntityAdapter`](crate::entity::EntityAdapter) seam.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityRef {
    pub entity_type: String,
    pub entity_id: i64,
}

impl EntityRef {
    pub fn new(entity_type: impl Into<String>, entity_id: i64) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id,
        }
    }
}

impl fmt::Display for EntityRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.entity_type, self.entity_id)
    }
}
