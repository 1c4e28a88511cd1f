//! Health check and public runtime configuration.
//!
//! Both endpoints are unauthenticated: load balancers poll the first and
//! front ends read the second at boot.

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State};
use serde::Serialize;
use ts_rs::TS;

use crate::config::{AppConfig, PublicConfig};
use crate::envelope::{Envelope, ok};
use crate::orm::DbConn;
use crate::orm::health::ping;

pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Serialize, TS)]
#[ts(export)]
pub struct HealthStatus {
    success: bool,
    status: &'static str,
    version: &'static str,
    built: &'static str,
    git_commit: Option<&'static str>,
    database: &'static str,
}

/// Health check endpoint.
///
/// - **URL:** `/api/1/healthcheck`
/// - **Method:** `GET`
/// - **Purpose:** Reports whether the service and its database respond
/// - **Authentication:** None required
///
/// Runs `SELECT 1` on a pooled connection.
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "status": "ok",
///   "version": "0.3.2",
///   "built": "Tue, 01 Apr 2025 09:00:00 +0000",
///   "git_commit": "cd51275141a2e7d49737aa7dd4e8ff7c9a804d67",
///   "database": "ok"
/// }
/// ```
///
/// **Failure (HTTP 500):** same body with `success: false`,
/// `status: "degraded"` and `database: "unavailable"`.
#[get("/1/healthcheck")]
pub async fn healthcheck(db: DbConn) -> status::Custom<Json<HealthStatus>> {
    let database_ok = match db.run(ping).await {
        Ok(ok) => ok,
        Err(e) => {
            error!("Health check query failed: {}", e);
            false
        }
    };

    let status = if database_ok { Status::Ok } else { Status::InternalServerError };
    status::Custom(
        status,
        Json(HealthStatus {
            success: database_ok,
            status: if database_ok { "ok" } else { "degraded" },
            version: built_info::PKG_VERSION,
            built: built_info::BUILT_TIME_UTC,
            git_commit: built_info::GIT_COMMIT_HASH,
            database: if database_ok { "ok" } else { "unavailable" },
        }),
    )
}

/// Public configuration endpoint.
///
/// - **URL:** `/api/1/config`
/// - **Method:** `GET`
/// - **Authentication:** None required
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "data": {
///     "name": "Régie",
///     "environment": "development",
///     "public_url": null,
///     "support_email": null,
///     "tva_rate_bp": 2000,
///     "api_version": "1"
///   }
/// }
/// ```
#[get("/1/config")]
pub fn public_config(config: &State<AppConfig>) -> Json<Envelope<PublicConfig>> {
    ok(config.public())
}

pub fn routes() -> Vec<Route> {
    routes![healthcheck, public_config]
}
