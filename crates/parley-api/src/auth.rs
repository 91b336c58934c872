use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::{WithRejection, cookie::CookieJar};
use sha2::{Digest, Sha256};
use tracing::info;

use parley_db::Database;
use parley_db::models::UserRow;
use parley_types::api::{AuthResponse, CheckAuthResponse, CredentialsRequest, StatusResponse, UserView};

use crate::error::ApiError;
use crate::middleware::current_user;
use crate::session::{SESSION_COOKIE, SessionStore, SessionUser, removal_cookie, session_cookie};
use crate::with_db;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub sessions: SessionStore,
    /// Sets the `Secure` attribute on the session cookie.
    pub cookie_secure: bool,
}

pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = require_credentials(req)?;
    let password_hash = hash_password(&password);

    let user = with_db(&state, move |db| db.create_user(&username, &password_hash))
        .await?
        .ok_or_else(|| ApiError::Conflict("user already exists".into()))?;

    info!("Registered user {} ({})", user.username, user.id);
    let jar = start_session(&state, jar, &user).await;

    Ok((
        StatusCode::CREATED,
        jar,
        Json(AuthResponse {
            message: "registration successful".into(),
            user: UserView { id: user.id, username: user.username },
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<CredentialsRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (username, password) = require_credentials(req)?;

    let user = with_db(&state, move |db| db.get_user_by_username(&username)).await?;

    // Unknown user and wrong password must be indistinguishable
    let user = match user {
        Some(user) if user.password_hash == hash_password(&password) => user,
        _ => return Err(ApiError::Auth("invalid username or password".into())),
    };

    info!("User {} ({}) logged in", user.username, user.id);
    let jar = start_session(&state, jar, &user).await;

    Ok((
        StatusCode::OK,
        jar,
        Json(AuthResponse {
            message: "login successful".into(),
            user: UserView { id: user.id, username: user.username },
        }),
    ))
}

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        if state.sessions.destroy(cookie.value()).await {
            info!("Session ended");
        }
    }

    (
        StatusCode::OK,
        jar.remove(removal_cookie()),
        Json(StatusResponse { message: "logged out".into() }),
    )
}

pub async fn check_auth(State(state): State<AppState>, jar: CookieJar) -> Json<CheckAuthResponse> {
    let user = current_user(&state, &jar).await;

    Json(CheckAuthResponse {
        authenticated: user.is_some(),
        user: user.map(|u| UserView { id: u.id, username: u.username }),
    })
}

/// Hex-encoded SHA-256 of the password.
pub fn hash_password(password: &str) -> String {
    hex::encode(Sha256::digest(password.as_bytes()))
}

fn require_credentials(req: CredentialsRequest) -> Result<(String, String), ApiError> {
    match (req.username, req.password) {
        (Some(username), Some(password)) if !username.is_empty() && !password.is_empty() => {
            Ok((username, password))
        }
        _ => Err(ApiError::Validation("username and password are required".into())),
    }
}

/// Bind a fresh session to `user`, replacing any session the caller already held.
async fn start_session(state: &AppState, jar: CookieJar, user: &UserRow) -> CookieJar {
    if let Some(old) = jar.get(SESSION_COOKIE) {
        state.sessions.destroy(old.value()).await;
    }

    let token = state
        .sessions
        .create(SessionUser { id: user.id, username: user.username.clone() })
        .await;

    jar.add(session_cookie(token, state.cookie_secure))
}
