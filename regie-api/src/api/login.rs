//! Login, logout and current-profile endpoints.
//!
//! Sessions are opaque bearer tokens stored in the `sessions` table. The
//! token returned by `POST /api/1/login` goes in the `Authorization`
//! header of every authenticated request.

use chrono::NaiveDateTime;
use rocket::serde::json::{Json, Value, json};
use rocket::{Route, State};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::config::AppConfig;
use crate::envelope::{Envelope, ok};
use crate::error::AppError;
use crate::logged_json::LoggedJson;
use crate::models::ProfileInfo;
use crate::orm::DbConn;
use crate::orm::login::{process_login, revoke_session};
use crate::orm::profile::profile_info;
use crate::session_guards::AuthenticatedUser;

/// Body of `POST /api/1/login`. Missing fields read as empty strings so
/// that they are reported as a 400 rather than a parse failure.
#[derive(Debug, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct LoginSuccessResponse {
    pub success: bool,
    pub token: String,
    #[ts(type = "string | null")]
    pub expires_at: Option<NaiveDateTime>,
    pub profile: ProfileInfo,
}

/// Login endpoint.
///
/// - **URL:** `/api/1/login`
/// - **Method:** `POST`
/// - **Purpose:** Exchanges an email and password for a bearer token
/// - **Authentication:** None required
///
/// # Request Format
///
/// ```json
/// {
///   "email": "regie@lac.ch",
///   "password": "secret"
/// }
/// ```
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "token": "5b0e4c1e-...",
///   "expires_at": "2025-04-02T09:00:00",
///   "profile": { "id": 3, "email": "regie@lac.ch", "role": "regie", ... }
/// }
/// ```
///
/// **Failure:** 400 when a field is empty, 401 `"Invalid credentials"`
/// when the email is unknown or the password does not match.
#[post("/1/login", data = "<login>")]
pub async fn login(
    db: DbConn,
    config: &State<AppConfig>,
    login: LoggedJson<LoginRequest>,
) -> Result<Json<LoginSuccessResponse>, AppError> {
    let LoginRequest { email, password } = login.into_inner();
    let outcome = process_login(&db, &email, &password, config.session_ttl_hours).await?;

    Ok(Json(LoginSuccessResponse {
        success: true,
        token: outcome.token,
        expires_at: outcome.expires_at,
        profile: profile_info(&outcome.profile, &outcome.actor),
    }))
}

/// Logout endpoint.
///
/// - **URL:** `/api/1/logout`
/// - **Method:** `POST`
/// - **Authentication:** Required
///
/// Revokes the session named by the bearer token. Further requests with
/// that token get 401.
#[post("/1/logout")]
pub async fn logout(db: DbConn, user: AuthenticatedUser) -> Result<Json<Value>, AppError> {
    let token = user.session_id;
    db.run(move |conn| revoke_session(conn, &token)).await?;
    info!("Profile {} logged out", user.profile.id);
    Ok(Json(json!({ "success": true })))
}

/// Current profile endpoint.
///
/// - **URL:** `/api/1/me`
/// - **Method:** `GET`
/// - **Authentication:** Required
#[get("/1/me")]
pub fn me(user: AuthenticatedUser) -> Json<Envelope<ProfileInfo>> {
    ok(profile_info(&user.profile, &user.actor))
}

pub fn routes() -> Vec<Route> {
    routes![login, logout, me]
}
