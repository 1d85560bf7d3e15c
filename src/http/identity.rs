//! Request Identity Resolution
//!
//! Maps request headers to the owner that usage is tracked against.

use axum::http::{header, HeaderMap};
use tracing::warn;

use crate::error::ApiError;
use crate::owner::{new_guest_id, Owner};

use super::cookies;
use super::state::AppState;

/// Owner for this request, plus a freshly minted guest id to set, if any.
#[derive(Debug, Clone)]
pub struct ResolvedOwner {
    pub owner: Owner,
    pub minted_guest_id: Option<String>,
}

/// Resolve the request's owner.
///
/// A presented bearer token must resolve to a live session; a token the
/// provider does not recognize is an auth error, never a silent guest
/// downgrade. Without a token, the guest cookie identifies the owner and is
/// minted on first contact.
pub async fn resolve_owner(
    state: &AppState,
    headers: &HeaderMap,
) -> Result<ResolvedOwner, ApiError> {
    if let Some(token) = bearer_token(headers) {
        let account = state.sessions.user_for_token(token).await.map_err(|e| {
            warn!(error = %e, "session lookup failed; denying");
            ApiError::Server
        })?;

        return match account {
            Some(account) => Ok(ResolvedOwner {
                owner: Owner::user(account.user_id, account.plan),
                minted_guest_id: None,
            }),
            None => Err(ApiError::Auth),
        };
    }

    match cookies::cookie_value(headers, &state.config.guest.cookie_name) {
        // A cookie value with the key separator in it can't be trusted as
        // an owner id; re-mint instead.
        Some(id) if !id.is_empty() && !id.contains(':') => Ok(ResolvedOwner {
            owner: Owner::guest(id),
            minted_guest_id: None,
        }),
        _ => {
            let id = new_guest_id();
            Ok(ResolvedOwner {
                owner: Owner::guest(id.clone()),
                minted_guest_id: Some(id),
            })
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
