//! Usage Metering and Quota Module
//!
//! This module provides per-owner, per-tool usage tracking with a rolling
//! 24-hour window and plan-based limits.
//!
//! # Features
//!
//! - Rolling-window counters stored as JSON in a key-value namespace
//! - Deterministic key derivation so independent tools never share counters
//! - Static plan-tier entitlement tables (guest, free, starter, pro)
//! - Fail-closed check-then-increment orchestration per request
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       Usage Service                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────┐  ┌──────────────┐  ┌──────────────────┐   │
//! │  │ Key Scheme  │  │ Entitlements │  │ Allow/Deny Logic │   │
//! │  └─────────────┘  └──────────────┘  └──────────────────┘   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌─────────────────────────────────────────────────────┐   │
//! │  │        Counter Store (JSON records over KV)          │   │
//! │  └─────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod counter;
pub mod entitlement;
pub mod key;
pub mod service;

pub use counter::{CounterRecord, CounterStore, KvStore, MemoryKv};
pub use entitlement::{Entitlement, Plan, Upscale};
pub use key::{usage_key, OwnerType, Resource, DAILY_WINDOW_SECS};
pub use service::{UsageService, UsageStatus};
