//! # Graph Definition Store
//!
//! Holds, per (entity-type, field), the state nodes and transition-meta edges
//! of a workflow. Graphs are authored once through [`WorkflowGraphBuilder`],
//! immutable afterwards, and looked up at runtime through [`GraphRegistry`].
//!
//! Parent/child linkage between edges is derived from adjacency: edge B is a
//! child of edge A when B's source is A's destination. From that linkage the
//! graph derives its unique initial state (source of an edge with no parents)
//! and its final states (destinations of edges with no children).

use crate::error::{Result, WorkflowError};
use crate::models::{ApproverSlot, State, TransitionMeta};
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Immutable workflow graph for one (entity-type, field).
#[derive(Debug, Clone)]
pub struct WorkflowGraph {
    entity_type: String,
    field_name: String,
    states: HashMap<i64, State>,
    metas: Vec<TransitionMeta>,
}

impl WorkflowGraph {
    pub fn entity_type(&self) -> &str {
        &self.entity_type
    }

    pub fn field_name(&self) -> &str {
        &self.field_name
    }

    pub fn state(&self, state_id: i64) -> Option<&State> {
        self.states.get(&state_id)
    }

    pub fn metas(&self) -> &[TransitionMeta] {
        &self.metas
    }

    pub fn meta(&self, meta_id: i64) -> Option<&TransitionMeta> {
        self.metas.iter().find(|m| m.meta_id == meta_id)
    }

    /// Edges whose source is the given state.
    pub fn outgoing(&self, state_id: i64) -> Vec<&TransitionMeta> {
        self.metas
            .iter()
            .filter(|m| m.source_state_id == state_id)
            .collect()
    }

    /// True when some edge ends at the given state.
    fn has_incoming(&self, state_id: i64) -> bool {
        self.metas.iter().any(|m| m.destination_state_id == state_id)
    }

    /// The unique source state of the edges with no parent edges.
    ///
    /// Authoring errors surface here: zero roots yield
    /// [`WorkflowError::NoAvailableInitialState`], more than one distinct root
    /// source yields [`WorkflowError::MultipleInitialState`].
    pub fn initial_state(&self) -> Result<&State> {
        let roots: HashSet<i64> = self
            .metas
            .iter()
            .filter(|m| !self.has_incoming(m.source_state_id))
            .map(|m| m.source_state_id)
            .collect();

        match roots.len() {
            0 => Err(WorkflowError::NoAvailableInitialState {
                entity_type: self.entity_type.clone(),
                field_name: self.field_name.clone(),
            }),
            1 => {
                let state_id = *roots.iter().next().expect("one root");
                Ok(&self.states[&state_id])
            }
            _ => Err(WorkflowError::MultipleInitialState {
                entity_type: self.entity_type.clone(),
                field_name: self.field_name.clone(),
            }),
        }
    }

    /// Destination states of the edges with no child edges.
    pub fn final_states(&self) -> Vec<&State> {
        let finals: HashSet<i64> = self
            .metas
            .iter()
            .filter(|m| self.outgoing(m.destination_state_id).is_empty())
            .map(|m| m.destination_state_id)
            .collect();

        let mut states: Vec<&State> = finals.iter().map(|id| &self.states[id]).collect();
        states.sort_by_key(|s| s.state_id);
        states
    }
}

/// Builder for authoring a [`WorkflowGraph`].
#[derive(Debug)]
pub struct WorkflowGraphBuilder {
    entity_type: String,
    field_name: String,
    states: HashMap<i64, State>,
    metas: Vec<TransitionMeta>,
    next_meta_id: i64,
}

impl WorkflowGraphBuilder {
    pub fn new(entity_type: impl Into<String>, field_name: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            field_name: field_name.into(),
            states: HashMap::new(),
            metas: Vec::new(),
            next_meta_id: 1,
        }
    }

    pub fn state(mut self, state_id: i64, slug: impl Into<String>) -> Self {
        self.states.insert(state_id, State::new(state_id, slug));
        self
    }

    /// Add an edge with its ordered approver slots. Meta ids are allocated in
    /// authoring order.
    pub fn transition(
        mut self,
        source_state_id: i64,
        destination_state_id: i64,
        slots: Vec<ApproverSlot>,
    ) -> Self {
        let meta_id = self.next_meta_id;
        self.next_meta_id += 1;
        self.metas.push(TransitionMeta {
            meta_id,
            entity_type: self.entity_type.clone(),
            field_name: self.field_name.clone(),
            source_state_id,
            destination_state_id,
            slots,
        });
        self
    }

    /// Validate state references and freeze the graph.
    pub fn build(self) -> Result<WorkflowGraph> {
        for meta in &self.metas {
            for state_id in [meta.source_state_id, meta.destination_state_id] {
                if !self.states.contains_key(&state_id) {
                    return Err(WorkflowError::UnknownState {
                        entity_type: self.entity_type.clone(),
                        field_name: self.field_name.clone(),
                        state_id,
                    });
                }
            }
        }

        Ok(WorkflowGraph {
            entity_type: self.entity_type,
            field_name: self.field_name,
            states: self.states,
            metas: self.metas,
        })
    }
}

/// Thread-safe lookup of authored graphs by (entity-type, field).
#[derive(Debug, Default)]
pub struct GraphRegistry {
    graphs: RwLock<HashMap<(String, String), Arc<WorkflowGraph>>>,
}

impl GraphRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, graph: WorkflowGraph) -> Arc<WorkflowGraph> {
        let key = (graph.entity_type.clone(), graph.field_name.clone());
        let graph = Arc::new(graph);
        self.graphs.write().insert(key, Arc::clone(&graph));
        graph
    }

    pub fn get(&self, entity_type: &str, field_name: &str) -> Result<Arc<WorkflowGraph>> {
        self.graphs
            .read()
            .get(&(entity_type.to_string(), field_name.to_string()))
            .cloned()
            .ok_or_else(|| WorkflowError::UnknownGraph {
                entity_type: entity_type.to_string(),
                field_name: field_name.to_string(),
            })
    }
}
