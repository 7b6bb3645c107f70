#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Approval Core
//!
//! Generic approval workflow engine: drives a single field of an arbitrary
//! business entity through a directed graph of states, where each edge may
//! require one or more approvers acting in priority order.
//!
//! ## Overview
//!
//! A workflow is authored once per (entity-type, field) as a graph of state
//! nodes and transition-meta edges, each edge carrying ordered approver
//! slots. At runtime the engine materializes per-entity approval records from
//! those templates, resolves which destinations are reachable by which
//! actors, executes approve/reject under priority gating, routes around
//! bypassed steps, and, since graphs may loop, clones fresh approval records
//! on repeat traversals instead of replaying consumed ones.
//!
//! Persistence, entity storage, entitlement resolution and event delivery
//! are all seams: the engine depends on the [`repository`], [`entity`],
//! [`authorization`] and [`events`] traits, never on a concrete store.
//!
//! ## Module Organization
//!
//! - [`models`] - Graph nodes, edge templates and live approval records
//! - [`graph`] - Graph authoring, registry, initial/final state derivation
//! - [`repository`] - Approval instance store seam + in-memory reference
//! - [`entity`] - Tracked-field access over opaque entity handles
//! - [`authorization`] - Actor entitlement predicates
//! - [`events`] - Transition event publishing
//! - [`engine`] - Availability resolution, transitions, skip cascade, cloning
//! - [`error`] - Structured error handling
//! - [`config`] - Configuration management
//!
//! ## Quick Start
//!
//! ```rust
//! use approval_core::authorization::{Actor, PredicateAuthorizer};
//! use approval_core::engine::TransitionEngine;
//! use approval_core::entity::InMemoryEntityStore;
//! use approval_core::events::EventPublisher;
//! use approval_core::graph::WorkflowGraphBuilder;
//! use approval_core::models::{ApproverSlot, EntityRef};
//! use approval_core::repository::InMemoryApprovalRepository;
//! use std::sync::Arc;
//!
//! # async fn example() -> approval_core::Result<()> {
//! let graph = WorkflowGraphBuilder::new("ticket", "status")
//!     .state(1, "draft")
//!     .state(2, "published")
//!     .transition(1, 2, vec![ApproverSlot::at_priority(0).with_group("editors")])
//!     .build()?;
//!
//! let engine = TransitionEngine::new(
//!     Arc::new(graph),
//!     Arc::new(InMemoryApprovalRepository::new()),
//!     Arc::new(InMemoryEntityStore::new()),
//!     Arc::new(PredicateAuthorizer::new()),
//!     EventPublisher::default(),
//! );
//!
//! let ticket = EntityRef::new("ticket", 1);
//! engine.register(&ticket).await?;
//!
//! let editor = Actor::new(2001).with_group("editors");
//! let state = engine.approve(&ticket, &editor, None, false).await?;
//! assert_eq!(state, 2);
//! # Ok(())
//! # }
//! ```

pub mod authorization;
pub mod config;
pub mod engine;
pub mod entity;
pub mod error;
pub mod events;
pub mod graph;
pub mod logging;
pub mod models;
pub mod repository;

pub use authorization::{AccessRule, Actor, AuthorizationAdapter, PredicateAuthorizer};
pub use config::EngineConfig;
pub use engine::{AvailabilityResolver, TransitionEngine};
pub use entity::{EntityAdapter, InMemoryEntityStore};
pub use error::{Result, WorkflowError};
pub use events::{EventPublisher, TransitionEvent};
pub use graph::{GraphRegistry, WorkflowGraph, WorkflowGraphBuilder};
pub use models::{
    ApprovalStatus, ApproverSlot, EntityRef, NewTransitionApproval, State, TransitionApproval,
    TransitionMeta,
};
pub use repository::{ApprovalFilter, ApprovalRepository, InMemoryApprovalRepository};
