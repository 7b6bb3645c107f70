use thiserror::Error;

/// Crate-wide error taxonomy.
///
/// The transition-protocol variants are surfaced to callers exactly as the
/// operation that detects them; the rest wrap collaborator failures. All are
/// raised synchronously before any write, so a failed operation never leaves
/// partial state behind.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum WorkflowError {
    #[error("there is no available initial state for {entity_type}.{field_name}")]
    NoAvailableInitialState {
        entity_type: String,
        field_name: String,
    },

    #[error("there are multiple initial states for {entity_type}.{field_name}; have only one")]
    MultipleInitialState {
        entity_type: String,
        field_name: String,
    },

    #[error("there is no available state for destination for the user")]
    NoAvailableNextStateForUser,

    #[error(
        "next state must be given when there are multiple states for destination: {candidates:?}"
    )]
    NextStateRequired { candidates: Vec<i64> },

    #[error("invalid state is given ({given}); valid states are {candidates:?}")]
    InvalidNextStateForUser { given: i64, candidates: Vec<i64> },

    #[error("no workflow graph registered for {entity_type}.{field_name}")]
    UnknownGraph {
        entity_type: String,
        field_name: String,
    },

    #[error("unknown state {state_id} in {entity_type}.{field_name}")]
    UnknownState {
        entity_type: String,
        field_name: String,
        state_id: i64,
    },

    #[error("transition approval {approval_id} not found")]
    ApprovalNotFound { approval_id: i64 },

    #[error("repository error: {0}")]
    Repository(String),

    #[error("entity adapter error: {0}")]
    Entity(String),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, WorkflowError>;
