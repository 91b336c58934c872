use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::session::{SESSION_COOKIE, SessionUser};

/// Resolve the session cookie and attach the `SessionUser` to the request.
/// Requests without a live session stop here with 401.
pub async fn require_auth(
    State(state): State<AppState>,
    jar: CookieJar,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = current_user(&state, &jar)
        .await
        .ok_or_else(|| ApiError::Auth("unauthorized".into()))?;

    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

pub async fn current_user(state: &AppState, jar: &CookieJar) -> Option<SessionUser> {
    let token = jar.get(SESSION_COOKIE)?;
    state.sessions.get(token.value()).await
}
