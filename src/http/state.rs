//! Shared Handler State
//!
//! One explicit context struct threaded through every handler; nothing in
//! the request path reads ambient globals.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::Config;
use crate::owner::{SessionStore, StaticSessions, UserAccount};
use crate::quota::counter::{CounterStore, MemoryKv};
use crate::quota::service::UsageService;
use crate::upstream::{HttpBackend, ToolBackend};

/// Everything a request handler needs.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub usage: UsageService,
    pub sessions: Arc<dyn SessionStore>,
    pub backend: Arc<dyn ToolBackend>,
}

impl AppState {
    /// Wire production parts from a validated configuration.
    pub fn from_config(config: Config) -> Self {
        let counters = CounterStore::new(Arc::new(MemoryKv::new()));
        let usage = UsageService::new(counters, config.quota.window_secs);

        let tokens: HashMap<String, UserAccount> = config
            .sessions
            .iter()
            .map(|(token, entry)| {
                (
                    token.clone(),
                    UserAccount {
                        user_id: entry.user_id.clone(),
                        plan: entry.plan,
                    },
                )
            })
            .collect();
        let sessions = Arc::new(StaticSessions::new(tokens));

        let backend = Arc::new(HttpBackend::new(config.upstream_urls()));

        Self {
            config: Arc::new(config),
            usage,
            sessions,
            backend,
        }
    }
}
