pub mod auth;
pub mod error;
pub mod messages;
pub mod middleware;
pub mod session;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tracing::error;

use parley_db::Database;

use crate::auth::AppState;
use crate::error::ApiError;
use crate::middleware::require_auth;

/// Assemble the `/api` router. Everything except the four session endpoints
/// sits behind `require_auth`.
pub fn routes(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/api/register", post(auth::register))
        .route("/api/login", post(auth::login))
        .route("/api/logout", post(auth::logout))
        .route("/api/check_auth", get(auth::check_auth));

    let protected_routes = Router::new()
        .route("/api/users", get(messages::list_users))
        .route("/api/messages", post(messages::send_message))
        .route("/api/messages/{receiver_id}", get(messages::get_conversation))
        .route("/api/unread_count", get(messages::unread_count))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
}

/// Run blocking DB work off the async runtime.
pub(crate) async fn with_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    let result = tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Server(anyhow::anyhow!("blocking task failed: {}", e))
        })?;

    Ok(result?)
}
