//! Plan and subscription endpoints.

use rocket::Route;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::envelope::{Envelope, ok};
use crate::error::AppError;
use crate::logged_json::LoggedJson;
use crate::models::{Abonnement, AbonnementInput, Plan, UpgradeInput};
use crate::orm::DbConn;
use crate::orm::abonnement::{
    cancel_abonnement, create_abonnement, list_abonnements, list_plans, reactivate_abonnement,
    suspend_abonnement, upgrade_abonnement,
};
use crate::session_guards::{AdminUser, AuthenticatedUser};

/// Plans, cheapest first.
#[get("/1/plans")]
pub async fn list_plans_endpoint(
    db: DbConn,
    _user: AuthenticatedUser,
) -> Result<Json<Envelope<Vec<Plan>>>, AppError> {
    Ok(ok(db.run(list_plans).await?))
}

/// List Abonnements endpoint.
///
/// - **URL:** `/api/1/abonnements`
/// - **Method:** `GET`
/// - **Authentication:** Required, role `regie`, `entreprise` or `admin_jtec`
///
/// Régies and entreprises see their own subscriptions, administrators all.
#[get("/1/abonnements")]
pub async fn list_abonnements_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
) -> Result<Json<Envelope<Vec<Abonnement>>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| list_abonnements(conn, &actor)).await?))
}

/// Create Abonnement endpoint.
///
/// - **URL:** `/api/1/abonnements`
/// - **Method:** `POST`
/// - **Authentication:** Required, role `regie`, `entreprise` or `admin_jtec`
///
/// # Request Format
///
/// ```json
/// { "plan_code": "pro", "regie_id": null, "entreprise_id": 2 }
/// ```
///
/// A régie or entreprise subscribes itself; ids in the body must match its
/// own organisation (403 otherwise). An administrator names exactly one
/// subscriber (400 otherwise).
///
/// **Success (HTTP 201 Created):** `{"success": true, "data": <Abonnement>}`
///
/// **Failure:** 400 for an unknown plan, 409 when the subscriber already
/// has an active abonnement.
#[post("/1/abonnements", data = "<input>")]
pub async fn create_abonnement_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    input: LoggedJson<AbonnementInput>,
) -> Result<status::Created<Json<Envelope<Abonnement>>>, AppError> {
    let actor = user.actor;
    let input = input.into_inner();
    let abonnement = db
        .run(move |conn| create_abonnement(conn, &actor, input))
        .await?;
    Ok(status::Created::new(format!("/api/1/abonnements/{}", abonnement.id)).body(ok(abonnement)))
}

/// Upgrade Abonnement endpoint.
///
/// - **URL:** `/api/1/abonnements/<id>/upgrade`
/// - **Method:** `POST`
/// - **Authentication:** Required, owner or `admin_jtec`
///
/// `{"plan_code": "premium"}`. The abonnement must be `actif` and the new
/// plan must rank strictly higher. The plan is changed on the existing row.
#[post("/1/abonnements/<id>/upgrade", data = "<input>")]
pub async fn upgrade_abonnement_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
    input: LoggedJson<UpgradeInput>,
) -> Result<Json<Envelope<Abonnement>>, AppError> {
    let actor = user.actor;
    let plan_code = input.into_inner().plan_code;
    Ok(ok(db
        .run(move |conn| upgrade_abonnement(conn, &actor, id, &plan_code))
        .await?))
}

/// Ends a subscription: `resilie` with `date_fin` set to now.
#[post("/1/abonnements/<id>/resilier")]
pub async fn cancel_abonnement_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Abonnement>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| cancel_abonnement(conn, &actor, id)).await?))
}

/// Suspend Abonnement endpoint.
///
/// - **URL:** `/api/1/abonnements/<id>/suspendre`
/// - **Method:** `POST`
/// - **Authentication:** Required, role `admin_jtec`
///
/// `actif` -> `suspendu`. Any other starting status gives 400.
#[post("/1/abonnements/<id>/suspendre")]
pub async fn suspend_abonnement_endpoint(
    db: DbConn,
    user: AdminUser,
    id: i32,
) -> Result<Json<Envelope<Abonnement>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| suspend_abonnement(conn, &actor, id)).await?))
}

/// `suspendu` -> `actif` (admin only). 409 if the subscriber took out
/// another abonnement in the meantime.
#[post("/1/abonnements/<id>/reactiver")]
pub async fn reactivate_abonnement_endpoint(
    db: DbConn,
    user: AdminUser,
    id: i32,
) -> Result<Json<Envelope<Abonnement>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| reactivate_abonnement(conn, &actor, id)).await?))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_plans_endpoint,
        list_abonnements_endpoint,
        create_abonnement_endpoint,
        upgrade_abonnement_endpoint,
        cancel_abonnement_endpoint,
        suspend_abonnement_endpoint,
        reactivate_abonnement_endpoint
    ]
}
