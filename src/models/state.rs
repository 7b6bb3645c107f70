use serde::{Deserialize, Serialize};
use std::fmt;

/// A node in a workflow graph.
///
/// States are opaque identifiers unique within an (entity-type, field) graph.
/// They carry no behavior; all transition semantics live on the edges.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct State {
    pub state_id: i64,
    pub slug: String,
}

impl State {
    pub fn new(state_id: i64, slug: impl Into<String>) -> Self {
        Self {
            state_id,
            slug: slug.into(),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.slug)
    }
}
