//! Ticket endpoints.
//!
//! Locataires file tickets, the owning régie routes them to an entreprise
//! (which creates the mission) or cancels them.

use rocket::Route;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::api::parse_filter;
use crate::envelope::{Envelope, Paginated, ok, paginated};
use crate::error::AppError;
use crate::logged_json::LoggedJson;
use crate::models::{AssignTicketInput, Mission, Ticket, TicketInput};
use crate::orm::DbConn;
use crate::orm::ticket::{assign_ticket, cancel_ticket, create_ticket, get_ticket, list_tickets};
use crate::pagination::{Page, PageQuery};
use crate::session_guards::{AuthenticatedUser, LocataireUser, RegieUser};
use crate::workflow::TicketStatus;

/// Create Ticket endpoint.
///
/// - **URL:** `/api/1/tickets`
/// - **Method:** `POST`
/// - **Purpose:** Files a maintenance request with the caller's régie
/// - **Authentication:** Required, role `locataire`
///
/// # Request Format
///
/// ```json
/// {
///   "titre": "Fuite sous l'évier",
///   "description": "L'eau coule depuis ce matin",
///   "categorie": "plomberie",
///   "priorite": "haute"
/// }
/// ```
///
/// `priorite` is optional and defaults to `normale`.
///
/// # Response
///
/// **Success (HTTP 201 Created):** `{"success": true, "data": <Ticket>}`
///
/// **Failure:** 400 for empty fields or when the locataire is not attached
/// to a régie.
#[post("/1/tickets", data = "<input>")]
pub async fn create_ticket_endpoint(
    db: DbConn,
    user: LocataireUser,
    input: LoggedJson<TicketInput>,
) -> Result<status::Created<Json<Envelope<Ticket>>>, AppError> {
    let actor = user.actor;
    let input = input.into_inner();
    let ticket = db.run(move |conn| create_ticket(conn, &actor, input)).await?;
    Ok(status::Created::new(format!("/api/1/tickets/{}", ticket.id)).body(ok(ticket)))
}

/// List Tickets endpoint.
///
/// - **URL:** `/api/1/tickets?statut=&page=&limit=`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// A locataire sees their own tickets, a régie the tickets filed with it,
/// an entreprise those it holds a mission for, and an administrator all of
/// them. Techniciens get 403. Results are newest first.
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "data": [ ... ],
///   "pagination": { "page": 1, "limit": 20, "total": 42 }
/// }
/// ```
#[get("/1/tickets?<statut>&<paging..>")]
pub async fn list_tickets_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    statut: Option<String>,
    paging: PageQuery,
) -> Result<Json<Paginated<Ticket>>, AppError> {
    let statut = parse_filter::<TicketStatus>(statut)?;
    let page = Page::from(paging);
    let actor = user.actor;
    let (rows, total) = db
        .run(move |conn| list_tickets(conn, &actor, statut, page))
        .await?;
    Ok(paginated(rows, page.info(total)))
}

/// Get Ticket endpoint.
///
/// - **URL:** `/api/1/tickets/<id>`
/// - **Method:** `GET`
/// - **Authentication:** Required
///
/// Same visibility as the list. A ticket outside it is reported as 404.
#[get("/1/tickets/<id>")]
pub async fn get_ticket_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Ticket>>, AppError> {
    let actor = user.actor;
    let ticket = db.run(move |conn| get_ticket(conn, &actor, id)).await?;
    Ok(ok(ticket))
}

/// Assign Ticket endpoint.
///
/// - **URL:** `/api/1/tickets/<id>/assign`
/// - **Method:** `POST`
/// - **Purpose:** Routes a new ticket to an entreprise
/// - **Authentication:** Required, role `regie` (owning régie only)
///
/// # Request Format
///
/// ```json
/// { "entreprise_id": 2, "date_intervention": "2025-04-10T08:00:00" }
/// ```
///
/// Creates the mission in `en_attente`, moves the ticket to `en_cours` and
/// notifies the entreprise.
///
/// **Success (HTTP 201 Created):** `{"success": true, "data": <Mission>}`
#[post("/1/tickets/<id>/assign", data = "<input>")]
pub async fn assign_ticket_endpoint(
    db: DbConn,
    user: RegieUser,
    id: i32,
    input: LoggedJson<AssignTicketInput>,
) -> Result<status::Created<Json<Envelope<Mission>>>, AppError> {
    let actor = user.actor;
    let input = input.into_inner();
    let mission = db.run(move |conn| assign_ticket(conn, &actor, id, input)).await?;
    Ok(status::Created::new(format!("/api/1/missions/{}", mission.id)).body(ok(mission)))
}

/// Cancel Ticket endpoint.
///
/// - **URL:** `/api/1/tickets/<id>/annuler`
/// - **Method:** `POST`
/// - **Authentication:** Required, the ticket's locataire or its régie
///
/// Only a `nouveau` ticket can be cancelled here. Once a mission exists the
/// mission must be cancelled instead.
#[post("/1/tickets/<id>/annuler")]
pub async fn cancel_ticket_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Ticket>>, AppError> {
    let actor = user.actor;
    let ticket = db.run(move |conn| cancel_ticket(conn, &actor, id)).await?;
    Ok(ok(ticket))
}

pub fn routes() -> Vec<Route> {
    routes![
        create_ticket_endpoint,
        list_tickets_endpoint,
        get_ticket_endpoint,
        assign_ticket_endpoint,
        cancel_ticket_endpoint
    ]
}
