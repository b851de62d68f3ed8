//! Notification feed for the in-app bell.
//!
//! JSON API Endpoints:
//! - `GET  /notifications?user_id=`       — ten most recent plus unread count
//! - `POST /notifications/{id}/read`      — mark one read
//! - `POST /notifications/read-all`       — mark everything read
//!
//! Session resolution is an upstream concern; handlers receive the resolved
//! user id.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::warn;

use bazari_core::domain::notification::NotificationId;
use bazari_core::domain::user::UserId;
use bazari_db::repositories::{NotificationRepository, SqlNotificationRepository};
use bazari_db::DbPool;

const FEED_LIMIT: u32 = 10;

#[derive(Clone)]
pub struct NotificationsState {
    db_pool: DbPool,
}

pub fn router(db_pool: DbPool) -> Router {
    Router::new()
        .route("/notifications", get(list_notifications))
        .route("/notifications/{id}/read", post(mark_read))
        .route("/notifications/read-all", post(mark_all_read))
        .with_state(NotificationsState { db_pool })
}

#[derive(Debug, Deserialize)]
pub struct FeedQuery {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct NotificationView {
    pub id: String,
    pub kind: &'static str,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub created_at: String,
}

#[derive(Debug, Serialize)]
pub struct FeedResponse {
    pub notifications: Vec<NotificationView>,
    pub unread_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct MarkReadBody {
    pub user_id: String,
}

#[derive(Debug, Serialize)]
pub struct MarkReadResponse {
    pub success: bool,
    pub marked: u64,
}

#[derive(Debug, Serialize)]
pub struct FeedError {
    pub error: String,
}

type FeedFailure = (StatusCode, Json<FeedError>);

fn store_unavailable(error: impl std::fmt::Display) -> FeedFailure {
    warn!(event_name = "notifications.store_unavailable", error = %error, "feed read failed");
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(FeedError { error: "notification store unavailable".to_string() }),
    )
}

pub async fn list_notifications(
    State(state): State<NotificationsState>,
    Query(query): Query<FeedQuery>,
) -> Result<Json<FeedResponse>, FeedFailure> {
    let repo = SqlNotificationRepository::new(state.db_pool.clone());
    let user = UserId(query.user_id);

    let recent = repo.recent_for_user(&user, FEED_LIMIT).await.map_err(store_unavailable)?;
    let unread_count = repo.unread_count(&user).await.map_err(store_unavailable)?;

    let notifications = recent
        .into_iter()
        .map(|notification| NotificationView {
            id: notification.id.0,
            kind: notification.kind.as_str(),
            title: notification.title,
            message: notification.message,
            is_read: notification.is_read,
            created_at: notification.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(FeedResponse { notifications, unread_count }))
}

pub async fn mark_read(
    State(state): State<NotificationsState>,
    Path(id): Path<String>,
    Json(body): Json<MarkReadBody>,
) -> Result<Json<MarkReadResponse>, FeedFailure> {
    let repo = SqlNotificationRepository::new(state.db_pool.clone());
    let marked = repo
        .mark_read(&NotificationId(id), &UserId(body.user_id))
        .await
        .map_err(store_unavailable)?;

    Ok(Json(MarkReadResponse { success: marked, marked: u64::from(marked) }))
}

pub async fn mark_all_read(
    State(state): State<NotificationsState>,
    Json(body): Json<MarkReadBody>,
) -> Result<Json<MarkReadResponse>, FeedFailure> {
    let repo = SqlNotificationRepository::new(state.db_pool.clone());
    let marked = repo.mark_all_read(&UserId(body.user_id)).await.map_err(store_unavailable)?;

    Ok(Json(MarkReadResponse { success: true, marked }))
}
