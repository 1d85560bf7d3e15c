//! Usage Key Derivation
//!
//! Deterministic storage keys for (tool, owner) pairs so that independent
//! tools never share counters.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Seconds in the rolling usage window.
///
/// The window is anchored to the owner's first request, not to calendar
/// midnight.
pub const DAILY_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Tools whose requests consume metered quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resource {
    /// Image enhancement
    AiImage,
    /// Prompt enhancement
    Prompt,
    /// Voice transcription
    Voice,
    /// Web page evaluation
    WebEval,
}

impl Resource {
    /// All metered tools.
    pub const ALL: [Resource; 4] = [
        Resource::AiImage,
        Resource::Prompt,
        Resource::Voice,
        Resource::WebEval,
    ];

    /// Stable identifier used in counter keys.
    pub fn key_name(&self) -> &'static str {
        match self {
            Resource::AiImage => "ai-image",
            Resource::Prompt => "prompt",
            Resource::Voice => "voice",
            Resource::WebEval => "web-eval",
        }
    }

    /// URL path segment for the tool's endpoints.
    pub fn slug(&self) -> &'static str {
        match self {
            Resource::AiImage => "image-enhancer",
            Resource::Prompt => "prompt-enhancer",
            Resource::Voice => "voice",
            Resource::WebEval => "web-eval",
        }
    }

    /// Parse a URL path segment back into a tool.
    pub fn from_slug(slug: &str) -> Option<Resource> {
        Resource::ALL.iter().copied().find(|r| r.slug() == slug)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key_name())
    }
}

/// Type of owner a counter belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OwnerType {
    /// Cookie-identified visitor without an account
    Guest,
    /// Authenticated account
    User,
}

impl OwnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnerType::Guest => "guest",
            OwnerType::User => "user",
        }
    }
}

/// Derive the storage key for a (tool, owner) pair.
///
/// Owner ids are UUIDs or opaque account ids and never contain `:`, so the
/// separator alone keeps keys collision-free.
pub fn usage_key(resource: Resource, owner_type: OwnerType, owner_id: &str) -> String {
    format!("{}:{}:{}", resource.key_name(), owner_type.as_str(), owner_id)
}
