//! Guest Cookie Plumbing

use axum::http::{header, HeaderMap};

use crate::config::Config;

/// Extract a cookie value from the request headers.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(header::COOKIE)?.to_str().ok()?;
    raw.split(';').find_map(|pair| {
        let (key, value) = pair.trim().split_once('=')?;
        (key == name).then(|| value.to_string())
    })
}

/// Render the `Set-Cookie` value for a freshly minted guest id.
///
/// Long-lived, HttpOnly, SameSite=Lax; `Secure` is added when the server is
/// configured for HTTPS.
pub fn guest_set_cookie(config: &Config, guest_id: &str) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; Max-Age={}; HttpOnly; SameSite=Lax",
        config.guest.cookie_name,
        guest_id,
        config.guest_cookie_max_age_secs()
    );
    if config.server.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}
