//! Tool Endpoints
//!
//! JSON surface for usage status and quota-gated tool invocation. Usage
//! responses always carry cache-busting and diagnostic headers so clients
//! never act on stale quota state.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::{header, HeaderName, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::metrics;
use crate::owner::Owner;
use crate::quota::entitlement::{Plan, Upscale};
use crate::quota::key::{OwnerType, Resource};
use crate::quota::service::UsageStatus;

use super::cookies;
use super::identity::{resolve_owner, ResolvedOwner};
use super::state::AppState;

#[derive(Serialize)]
struct Envelope<T: Serialize> {
    success: bool,
    data: T,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageData {
    owner_type: OwnerType,
    plan: Option<Plan>,
    usage: UsageNumbers,
    limits: LimitNumbers,
    entitlements: FeatureFlags,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UsageNumbers {
    used: u64,
    limit: u64,
    reset_at: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LimitNumbers {
    daily_burst_cap: u64,
    monthly_images: u64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct FeatureFlags {
    max_upscale: Upscale,
    face_enhance: bool,
}

fn usage_data(owner: &Owner, status: &UsageStatus) -> UsageData {
    UsageData {
        owner_type: owner.kind,
        plan: owner.effective_plan(),
        usage: UsageNumbers {
            used: status.used,
            limit: status.limit,
            reset_at: status.reset_at,
        },
        limits: LimitNumbers {
            daily_burst_cap: status.entitlement.daily_burst_cap,
            monthly_images: status.entitlement.monthly_images,
        },
        entitlements: FeatureFlags {
            max_upscale: status.entitlement.max_upscale,
            face_enhance: status.entitlement.face_enhance,
        },
    }
}

/// Attach cache-busting, diagnostic, and cookie headers to a usage-bearing
/// response.
fn with_usage_headers(
    mut response: Response,
    state: &AppState,
    resolved: &ResolvedOwner,
    status: &UsageStatus,
) -> Response {
    let headers = response.headers_mut();

    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(
        HeaderName::from_static("x-usage-ownertype"),
        HeaderValue::from_static(resolved.owner.kind.as_str()),
    );
    headers.insert(
        HeaderName::from_static("x-usage-plan"),
        HeaderValue::from_static(
            resolved
                .owner
                .effective_plan()
                .map(|p| p.as_str())
                .unwrap_or("none"),
        ),
    );
    headers.insert(
        HeaderName::from_static("x-usage-limit"),
        HeaderValue::from(status.limit),
    );

    if let Some(guest_id) = &resolved.minted_guest_id {
        let cookie = cookies::guest_set_cookie(&state.config, guest_id);
        // Cookie name and uuid are validated ASCII; a failure here means a
        // misconfigured name slipped past validation.
        if let Ok(value) = HeaderValue::from_str(&cookie) {
            headers.append(header::SET_COOKIE, value);
        }
    }

    response
}

/// GET usage status for one tool.
pub async fn usage_handler(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    headers: axum::http::HeaderMap,
) -> Result<Response, ApiError> {
    let resource = Resource::from_slug(&tool).ok_or(ApiError::NotFound)?;
    let resolved = resolve_owner(&state, &headers).await?;

    let status = state.usage.status(&resolved.owner, resource).await?;

    let body = Envelope {
        success: true,
        data: usage_data(&resolved.owner, &status),
    };
    let response = (StatusCode::OK, Json(body)).into_response();
    Ok(with_usage_headers(response, &state, &resolved, &status))
}

/// POST a tool invocation: consume quota, then proxy to the provider.
pub async fn invoke_handler(
    State(state): State<AppState>,
    Path(tool): Path<String>,
    headers: axum::http::HeaderMap,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Response, ApiError> {
    let resource = Resource::from_slug(&tool).ok_or(ApiError::NotFound)?;

    let Json(payload) =
        payload.map_err(|_| ApiError::validation("request body must be valid JSON"))?;
    if !payload.is_object() {
        return Err(ApiError::validation("request body must be a JSON object"));
    }

    let resolved = resolve_owner(&state, &headers).await?;

    if !state.backend.supports(resource) {
        return Err(ApiError::FeatureDisabled);
    }

    // Quota is consumed before the provider call; a failed call is not
    // refunded.
    let status = state.usage.consume(&resolved.owner, resource).await?;

    let output = state.backend.run(resource, payload).await.map_err(|e| {
        metrics::record_upstream_failure(resource);
        warn!(tool = %resource, error = %e, "upstream provider call failed");
        ApiError::Server
    })?;

    let body = Envelope {
        success: true,
        data: output,
    };
    let response = (StatusCode::OK, Json(body)).into_response();
    Ok(with_usage_headers(response, &state, &resolved, &status))
}

/// Health check endpoint
pub async fn health_handler() -> impl IntoResponse {
    StatusCode::OK
}

/// Metrics endpoint handler
pub async fn metrics_handler() -> Response {
    match metrics::gather_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text).into_response(),
        Err(e) => {
            error!("Failed to gather metrics: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Error gathering metrics: {}", e),
            )
                .into_response()
        }
    }
}
