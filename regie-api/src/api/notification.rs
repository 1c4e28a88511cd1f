//! Notification inbox endpoints. Every route works on the caller's own
//! notifications only.

use rocket::Route;
use rocket::serde::json::Json;
use serde::Serialize;
use ts_rs::TS;

use crate::envelope::{Envelope, ok};
use crate::error::AppError;
use crate::models::Notification;
use crate::orm::DbConn;
use crate::orm::notification::{
    clamp_limit, count_unread, list_notifications, mark_all_read, mark_read,
};
use crate::session_guards::AuthenticatedUser;

#[derive(Serialize, TS)]
#[ts(export)]
pub struct NotificationList {
    pub success: bool,
    pub data: Vec<Notification>,
    pub unread_count: i64,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct MarkAllReadResponse {
    pub success: bool,
    pub updated: usize,
}

/// List Notifications endpoint.
///
/// - **URL:** `/api/1/notifications?unread_only=&limit=`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Newest first. `limit` defaults to 50 and is clamped to 1..=200.
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "data": [ { "id": 7, "kind": "mission_assignee", "is_read": false, ... } ],
///   "unread_count": 1
/// }
/// ```
#[get("/1/notifications?<unread_only>&<limit>")]
pub async fn list_notifications_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    unread_only: Option<bool>,
    limit: Option<i64>,
) -> Result<Json<NotificationList>, AppError> {
    let profile_id = user.profile.id;
    let unread_only = unread_only.unwrap_or(false);
    let limit = clamp_limit(limit);

    let (data, unread_count) = db
        .run(move |conn| -> Result<_, AppError> {
            let data = list_notifications(conn, profile_id, unread_only, limit)?;
            let unread = count_unread(conn, profile_id)?;
            Ok((data, unread))
        })
        .await?;

    Ok(Json(NotificationList {
        success: true,
        data,
        unread_count,
    }))
}

/// Mark one notification read. Another profile's notification gives 404.
#[post("/1/notifications/<id>/read")]
pub async fn mark_read_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Notification>>, AppError> {
    let profile_id = user.profile.id;
    Ok(ok(db.run(move |conn| mark_read(conn, profile_id, id)).await?))
}

#[post("/1/notifications/read-all")]
pub async fn mark_all_read_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
) -> Result<Json<MarkAllReadResponse>, AppError> {
    let profile_id = user.profile.id;
    let updated = db.run(move |conn| mark_all_read(conn, profile_id)).await?;
    Ok(Json(MarkAllReadResponse {
        success: true,
        updated,
    }))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_notifications_endpoint,
        mark_read_endpoint,
        mark_all_read_endpoint
    ]
}
