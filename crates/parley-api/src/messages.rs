use anyhow::Context;
use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::WithRejection;
use chrono::{DateTime, Utc};
use tracing::debug;

use parley_db::models::MessageRow;
use parley_types::api::{
    MessageView, SendMessageRequest, SendMessageResponse, UnreadCountResponse, UserView,
};

use crate::auth::AppState;
use crate::error::ApiError;
use crate::session::SessionUser;
use crate::with_db;

/// GET /api/users: everyone except the caller, by id.
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<UserView>>, ApiError> {
    let rows = with_db(&state, move |db| db.list_users_except(user.id)).await?;

    let users = rows
        .into_iter()
        .map(|row| UserView { id: row.id, username: row.username })
        .collect();

    Ok(Json(users))
}

/// GET /api/messages/{receiver_id}: the conversation with another user.
/// Fetching it marks the caller's inbound messages as read.
pub async fn get_conversation(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Path(other_id), _): WithRejection<Path<i64>, ApiError>,
) -> Result<Json<Vec<MessageView>>, ApiError> {
    let viewer = user.id;
    let rows = with_db(&state, move |db| db.read_conversation(viewer, other_id)).await?;

    debug!("User {} fetched {} messages with {}", viewer, rows.len(), other_id);

    let messages = rows
        .into_iter()
        .map(|row| message_view(row, viewer))
        .collect::<anyhow::Result<Vec<_>>>()?;
    Ok(Json(messages))
}

/// POST /api/messages. The receiver id is stored as given; it is not
/// checked against the users table.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    WithRejection(Json(req), _): WithRejection<Json<SendMessageRequest>, ApiError>,
) -> Result<impl IntoResponse, ApiError> {
    let (content, receiver_id) = match (req.content, req.receiver_id) {
        (Some(content), Some(receiver_id)) if !content.is_empty() && receiver_id != 0 => {
            (content, receiver_id)
        }
        _ => return Err(ApiError::Validation("content and receiver are required".into())),
    };

    let sender_id = user.id;
    let row = with_db(&state, move |db| db.insert_message(sender_id, receiver_id, &content)).await?;

    debug!("Message {} sent from {} to {}", row.id, sender_id, receiver_id);

    Ok((
        StatusCode::CREATED,
        Json(SendMessageResponse {
            message: "message sent".into(),
            id: row.id,
            timestamp: parse_timestamp(&row)?,
        }),
    ))
}

/// GET /api/unread_count
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<UnreadCountResponse>, ApiError> {
    let count = with_db(&state, move |db| db.unread_count(user.id)).await?;
    Ok(Json(UnreadCountResponse { count }))
}

fn message_view(row: MessageRow, viewer: i64) -> anyhow::Result<MessageView> {
    Ok(MessageView {
        timestamp: parse_timestamp(&row)?,
        is_mine: row.sender_id == viewer,
        id: row.id,
        content: row.content,
        sender_id: row.sender_id,
        receiver_id: row.receiver_id,
        is_read: row.is_read,
    })
}

fn parse_timestamp(row: &MessageRow) -> anyhow::Result<DateTime<Utc>> {
    let ts = DateTime::parse_from_rfc3339(&row.timestamp)
        .with_context(|| format!("corrupt timestamp '{}' on message {}", row.timestamp, row.id))?;
    Ok(ts.with_timezone(&Utc))
}
