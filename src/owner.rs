//! Owner Identity
//!
//! The guest-or-user identity that usage is tracked against, plus the
//! session-lookup seam for the external auth provider.

use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use uuid::Uuid;

use crate::quota::entitlement::Plan;
use crate::quota::key::OwnerType;

/// The identity usage counters are keyed by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub kind: OwnerType,
    pub id: String,
    pub plan: Option<Plan>,
}

impl Owner {
    /// Cookie-identified visitor.
    pub fn guest(id: impl Into<String>) -> Self {
        Self {
            kind: OwnerType::Guest,
            id: id.into(),
            plan: None,
        }
    }

    /// Authenticated account, with whatever plan the account records.
    pub fn user(id: impl Into<String>, plan: Option<Plan>) -> Self {
        Self {
            kind: OwnerType::User,
            id: id.into(),
            plan,
        }
    }

    /// Plan as reported to clients: resolved for users, absent for guests.
    pub fn effective_plan(&self) -> Option<Plan> {
        match self.kind {
            OwnerType::Guest => None,
            OwnerType::User => Some(self.plan.unwrap_or_default()),
        }
    }
}

/// Account record returned by the session collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UserAccount {
    pub user_id: String,
    #[serde(default)]
    pub plan: Option<Plan>,
}

/// Session lookup seam for the external auth/session provider.
///
/// The real provider (database-backed sessions) lives outside this service;
/// anything implementing this trait can stand in for it.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Resolve a bearer token to an account, if the session is live.
    async fn user_for_token(&self, token: &str) -> Result<Option<UserAccount>>;
}

/// Static token table, seeded from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticSessions {
    tokens: HashMap<String, UserAccount>,
}

impl StaticSessions {
    pub fn new(tokens: HashMap<String, UserAccount>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl SessionStore for StaticSessions {
    async fn user_for_token(&self, token: &str) -> Result<Option<UserAccount>> {
        Ok(self.tokens.get(token).cloned())
    }
}

/// Mint a fresh guest identifier.
///
/// UUIDs keep guest ids opaque and free of the key separator.
pub fn new_guest_id() -> String {
    Uuid::new_v4().to_string()
}
