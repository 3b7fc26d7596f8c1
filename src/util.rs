//! Shared request helpers.

use axum::http::{HeaderMap, header};

const FALLBACK_BASE_URL: &str = "http://localhost:3000";

/// Extract a Bearer token from the Authorization header.
///
/// Returns the token string without the "Bearer " prefix, or None if
/// the header is missing, malformed, or empty after the prefix.
pub fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

/// Base URL the gateway should send the browser back to.
///
/// A configured public URL wins. Otherwise the request's `Host` is used with
/// `https` only when `x-forwarded-proto` says so.
pub fn callback_base_url(headers: &HeaderMap, configured: Option<&str>) -> String {
    if let Some(base) = configured {
        return base.trim_end_matches('/').to_string();
    }

    let host = headers
        .get(header::HOST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|h| !h.is_empty());

    match host {
        Some(host) => {
            let proto = headers
                .get("x-forwarded-proto")
                .and_then(|v| v.to_str().ok())
                .map(|p| p.split(',').next().unwrap_or("").trim());
            let scheme = if proto == Some("https") { "https" } else { "http" };
            format!("{}://{}", scheme, host)
        }
        None => FALLBACK_BASE_URL.to_string(),
    }
}

/// Minimal HTML escaping for text interpolated into server-rendered pages.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
