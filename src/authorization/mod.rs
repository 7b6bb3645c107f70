//! # Authorization Adapter
//!
//! Answers "may this actor act on this approval slot". The engine receives a
//! resolved actor (identity plus group memberships and permission grants)
//! from the embedding application's own authentication layer and evaluates
//! slot requirements as a small predicate tree: OR within the group family,
//! OR within the permission family, AND across families, with an
//! unconstrained slot open to anyone.
//!
//! [`PredicateAuthorizer`] is the default adapter; applications with external
//! entitlement services implement [`AuthorizationAdapter`] themselves.

use crate::error::Result;
use crate::models::TransitionApproval;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// A resolved acting principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: i64,
    pub groups: HashSet<String>,
    pub permissions: HashSet<String>,
}

impl Actor {
    pub fn new(actor_id: i64) -> Self {
        Self {
            actor_id,
            groups: HashSet::new(),
            permissions: HashSet::new(),
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.insert(group.into());
        self
    }

    pub fn with_permission(mut self, permission: impl Into<String>) -> Self {
        self.permissions.insert(permission.into());
        self
    }
}

/// Set-membership predicate tree combined with AND / OR.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessRule {
    /// Always satisfied
    Open,
    IsActor(i64),
    HasPermission(String),
    InGroup(String),
    AnyOf(Vec<AccessRule>),
    AllOf(Vec<AccessRule>),
}

impl AccessRule {
    pub fn evaluate(&self, actor: &Actor) -> bool {
        match self {
            Self::Open => true,
            Self::IsActor(actor_id) => actor.actor_id == *actor_id,
            Self::HasPermission(permission) => actor.permissions.contains(permission),
            Self::InGroup(group) => actor.groups.contains(group),
            Self::AnyOf(rules) => rules.iter().any(|r| r.evaluate(actor)),
            Self::AllOf(rules) => rules.iter().all(|r| r.evaluate(actor)),
        }
    }

    /// Compile an approval's requirement sets into the OR-within-family,
    /// AND-across-families rule. An empty family places no constraint.
    pub fn for_approval(approval: &TransitionApproval) -> Self {
        let actor_rule = match approval.fixed_actor {
            Some(actor_id) => Self::IsActor(actor_id),
            None => Self::Open,
        };

        let permission_rule = if approval.permissions.is_empty() {
            Self::Open
        } else {
            Self::AnyOf(
                approval
                    .permissions
                    .iter()
                    .cloned()
                    .map(Self::HasPermission)
                    .collect(),
            )
        };

        let group_rule = if approval.groups.is_empty() {
            Self::Open
        } else {
            Self::AnyOf(approval.groups.iter().cloned().map(Self::InGroup).collect())
        };

        Self::AllOf(vec![actor_rule, permission_rule, group_rule])
    }
}

/// Seam towards the embedding application's entitlement resolution.
#[async_trait]
pub trait AuthorizationAdapter: Send + Sync {
    async fn is_authorized(&self, approval: &TransitionApproval, actor: &Actor) -> Result<bool>;
}

/// Default adapter evaluating the compiled predicate tree in-process.
#[derive(Debug, Clone, Default)]
pub struct PredicateAuthorizer;

impl PredicateAuthorizer {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthorizationAdapter for PredicateAuthorizer {
    async fn is_authorized(&self, approval: &TransitionApproval, actor: &Actor) -> Result<bool> {
        Ok(AccessRule::for_approval(approval).evaluate(actor))
    }
}
