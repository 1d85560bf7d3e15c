//! Toolgate Library
//!
//! Usage metering and quota gateway for AI tool endpoints. Provides the
//! rolling-window counter store, plan entitlements, the fail-closed usage
//! service, and the HTTP surface that fronts upstream inference providers.

pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod owner;
pub mod quota;
pub mod upstream;
