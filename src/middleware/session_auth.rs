use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::CookieJar;

use crate::db::{AppState, queries};
use crate::error::AppError;
use crate::util::extract_bearer_token;

/// Cookie set by the storefront's auth system.
pub const SESSION_COOKIE: &str = "session_token";

/// Resolve the caller's session and attach a `SessionUser` to the request.
///
/// Accepts the session token from the `session_token` cookie or an
/// `Authorization: Bearer` header. Missing, unknown and expired sessions
/// are rejected with 401 before the handler (and its body parsing) runs.
pub async fn session_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().trim().to_string())
        .filter(|t| !t.is_empty())
        .or_else(|| extract_bearer_token(request.headers()).map(String::from))
        .ok_or(AppError::Unauthorized)?;

    let user = {
        let conn = state.db.get()?;
        queries::get_session_user(&conn, &token)?
    }
    .ok_or(AppError::Unauthorized)?;

    tracing::debug!(user_id = %user.id, "Session authenticated");

    request.extensions_mut().insert(user);

    Ok(next.run(request).await)
}
