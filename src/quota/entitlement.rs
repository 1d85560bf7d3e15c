//! Plan Entitlements
//!
//! Static per-tier limit tables. Limits are compiled into the binary:
//! changing one is a deployment, never a data migration.

use serde::{Deserialize, Serialize};

use super::key::OwnerType;

/// Plan tiers for authenticated users.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Plan {
    /// No paid subscription recorded
    #[default]
    Free,
    /// Entry paid tier
    Starter,
    /// Full paid tier
    Pro,
}

impl Plan {
    pub fn as_str(&self) -> &'static str {
        match self {
            Plan::Free => "free",
            Plan::Starter => "starter",
            Plan::Pro => "pro",
        }
    }
}

/// Maximum image upscale factor available to a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upscale {
    X2,
    X4,
    X8,
}

/// Numeric and feature limits resolved for one owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entitlement {
    /// Requests allowed per rolling 24-hour window
    pub daily_burst_cap: u64,

    /// Images allowed per billing month
    pub monthly_images: u64,

    /// Largest upscale factor the tier may request
    pub max_upscale: Upscale,

    /// Whether face enhancement is available
    pub face_enhance: bool,
}

/// Most restrictive table, handed to every guest.
const GUEST: Entitlement = Entitlement {
    daily_burst_cap: 3,
    monthly_images: 10,
    max_upscale: Upscale::X2,
    face_enhance: false,
};

const FREE: Entitlement = Entitlement {
    daily_burst_cap: 10,
    monthly_images: 50,
    max_upscale: Upscale::X2,
    face_enhance: false,
};

const STARTER: Entitlement = Entitlement {
    daily_burst_cap: 20,
    monthly_images: 300,
    max_upscale: Upscale::X4,
    face_enhance: true,
};

const PRO: Entitlement = Entitlement {
    daily_burst_cap: 30,
    monthly_images: 1000,
    max_upscale: Upscale::X8,
    face_enhance: true,
};

/// Resolve the entitlement for an owner.
///
/// Guests always receive the guest table; any plan parameter is ignored for
/// them. Authenticated owners with no recorded plan fall back to the free
/// tier.
pub fn resolve(owner_type: OwnerType, plan: Option<Plan>) -> Entitlement {
    match owner_type {
        OwnerType::Guest => GUEST,
        OwnerType::User => match plan.unwrap_or_default() {
            Plan::Free => FREE,
            Plan::Starter => STARTER,
            Plan::Pro => PRO,
        },
    }
}
