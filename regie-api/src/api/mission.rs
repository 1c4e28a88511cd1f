//! Mission endpoints: listing and the field lifecycle
//! (technicien assignment, start, completion, validation, cancellation).

use rocket::Route;
use rocket::serde::json::Json;

use crate::api::parse_filter;
use crate::envelope::{Envelope, Paginated, ok, paginated};
use crate::error::AppError;
use crate::logged_json::LoggedJson;
use crate::models::{AssignTechnicienInput, Mission, TerminerMissionInput};
use crate::orm::DbConn;
use crate::orm::mission::{
    assign_technicien, cancel_mission, complete_mission, get_mission, list_missions,
    start_mission, validate_mission,
};
use crate::pagination::{Page, PageQuery};
use crate::session_guards::{AuthenticatedUser, EntrepriseUser, RegieUser};
use crate::workflow::MissionStatus;

/// List Missions endpoint.
///
/// - **URL:** `/api/1/missions?statut=&page=&limit=`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// An entreprise sees its missions, a technicien the missions assigned to
/// them, a régie the missions on its tickets and an administrator all.
/// Locataires get 403.
#[get("/1/missions?<statut>&<paging..>")]
pub async fn list_missions_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    statut: Option<String>,
    paging: PageQuery,
) -> Result<Json<Paginated<Mission>>, AppError> {
    let statut = parse_filter::<MissionStatus>(statut)?;
    let page = Page::from(paging);
    let actor = user.actor;
    let (rows, total) = db
        .run(move |conn| list_missions(conn, &actor, statut, page))
        .await?;
    Ok(paginated(rows, page.info(total)))
}

#[get("/1/missions/<id>")]
pub async fn get_mission_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Mission>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| get_mission(conn, &actor, id)).await?))
}

/// Assign Technicien endpoint.
///
/// - **URL:** `/api/1/missions/<id>/technicien`
/// - **Method:** `POST`
/// - **Authentication:** Required, role `entreprise` (owning entreprise)
///
/// # Request Format
///
/// ```json
/// { "technicien_id": 4, "date_intervention": "2025-04-10T08:00:00" }
/// ```
///
/// The technicien must work for the entreprise. The mission moves to
/// `planifiee` and the technicien is notified. Calling it again on a
/// planned mission re-plans it.
#[post("/1/missions/<id>/technicien", data = "<input>")]
pub async fn assign_technicien_endpoint(
    db: DbConn,
    user: EntrepriseUser,
    id: i32,
    input: LoggedJson<AssignTechnicienInput>,
) -> Result<Json<Envelope<Mission>>, AppError> {
    let actor = user.actor;
    let input = input.into_inner();
    Ok(ok(db
        .run(move |conn| assign_technicien(conn, &actor, id, input))
        .await?))
}

/// Start Mission endpoint.
///
/// - **URL:** `/api/1/missions/<id>/start`
/// - **Method:** `POST`
/// - **Authentication:** Required, the assigned technicien or the entreprise
#[post("/1/missions/<id>/start")]
pub async fn start_mission_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Mission>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| start_mission(conn, &actor, id)).await?))
}

/// Complete Mission endpoint.
///
/// - **URL:** `/api/1/missions/<id>/terminer`
/// - **Method:** `POST`
/// - **Authentication:** Required, the assigned technicien or the entreprise
///
/// The body is optional: `{"rapport": "Joint remplacé"}`. The ticket moves
/// to `termine` and the régie and locataire are notified.
#[post("/1/missions/<id>/terminer", data = "<input>")]
pub async fn complete_mission_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
    input: Option<LoggedJson<TerminerMissionInput>>,
) -> Result<Json<Envelope<Mission>>, AppError> {
    let actor = user.actor;
    let rapport = input.map(|i| i.into_inner()).unwrap_or_default().rapport;
    Ok(ok(db
        .run(move |conn| complete_mission(conn, &actor, id, rapport))
        .await?))
}

/// Validate Mission endpoint.
///
/// - **URL:** `/api/1/missions/<id>/valider`
/// - **Method:** `POST`
/// - **Authentication:** Required, role `regie` (owning régie)
///
/// `terminee` → `validee`; the ticket is closed.
#[post("/1/missions/<id>/valider")]
pub async fn validate_mission_endpoint(
    db: DbConn,
    user: RegieUser,
    id: i32,
) -> Result<Json<Envelope<Mission>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| validate_mission(conn, &actor, id)).await?))
}

/// Cancel Mission endpoint.
///
/// - **URL:** `/api/1/missions/<id>/annuler`
/// - **Method:** `POST`
/// - **Authentication:** Required, the owning régie or entreprise
///
/// The ticket is cancelled with the mission; it is not reopened.
#[post("/1/missions/<id>/annuler")]
pub async fn cancel_mission_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Mission>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| cancel_mission(conn, &actor, id)).await?))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_missions_endpoint,
        get_mission_endpoint,
        assign_technicien_endpoint,
        start_mission_endpoint,
        complete_mission_endpoint,
        validate_mission_endpoint,
        cancel_mission_endpoint
    ]
}
