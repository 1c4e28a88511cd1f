//! Facture endpoints.
//!
//! Entreprises raise a facture once a mission is finished and send it to
//! the régie, which pays it. Amounts are integer cents.

use rocket::response::status;
use rocket::serde::json::Json;
use rocket::{Route, State};

use crate::api::parse_filter;
use crate::config::AppConfig;
use crate::envelope::{Envelope, Paginated, ok, paginated};
use crate::error::AppError;
use crate::logged_json::LoggedJson;
use crate::models::{Facture, FactureInput};
use crate::orm::DbConn;
use crate::orm::facture::{
    BillingTerms, cancel_facture, create_facture, get_facture, list_factures, pay_facture,
    send_facture,
};
use crate::pagination::{Page, PageQuery};
use crate::session_guards::{AuthenticatedUser, EntrepriseUser, RegieUser};
use crate::workflow::FactureStatus;

/// List Factures endpoint.
///
/// - **URL:** `/api/1/factures?statut=&page=&limit=`
/// - **Method:** `GET`
/// - **Purpose:** Paginated factures, newest first
/// - **Authentication:** Required, role `regie`, `entreprise` or `admin_jtec`
///
/// A régie sees the factures addressed to it and an entreprise the ones it
/// issued. `page` defaults to 1 and `limit` to 20 (clamped to 1..=100).
///
/// # Response
///
/// **Success (HTTP 200 OK):**
/// ```json
/// {
///   "success": true,
///   "data": [
///     {
///       "id": 1,
///       "numero": "FAC-2025-00001",
///       "montant_ht": 100000,
///       "montant_tva": 20000,
///       "montant_ttc": 120000,
///       "statut": "envoyee",
///       ...
///     }
///   ],
///   "pagination": { "page": 1, "limit": 20, "total": 1 }
/// }
/// ```
///
/// **Failure:** 403 for locataires and techniciens, 400 for an unknown
/// `statut`.
#[get("/1/factures?<statut>&<paging..>")]
pub async fn list_factures_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    statut: Option<String>,
    paging: PageQuery,
) -> Result<Json<Paginated<Facture>>, AppError> {
    let statut = parse_filter::<FactureStatus>(statut)?;
    let page = Page::from(paging);
    let actor = user.actor;
    let (rows, total) = db
        .run(move |conn| list_factures(conn, &actor, statut, page))
        .await?;
    Ok(paginated(rows, page.info(total)))
}

#[get("/1/factures/<id>")]
pub async fn get_facture_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Facture>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| get_facture(conn, &actor, id)).await?))
}

/// Create Facture endpoint.
///
/// - **URL:** `/api/1/missions/<id>/facture`
/// - **Method:** `POST`
/// - **Authentication:** Required, role `entreprise` (owning entreprise)
///
/// # Request Format
///
/// ```json
/// { "montant_ht": 100000, "date_echeance": "2025-05-01T00:00:00" }
/// ```
///
/// TVA uses the configured `tva_rate_bp`, the commission uses the régie's
/// rate and `date_echeance` defaults to today plus the payment terms.
///
/// **Success (HTTP 201 Created):** `{"success": true, "data": <Facture>}`
///
/// **Failure:** 400 when the mission is not finished, 409 when it already
/// has a facture.
#[post("/1/missions/<id>/facture", data = "<input>")]
pub async fn create_facture_endpoint(
    db: DbConn,
    config: &State<AppConfig>,
    user: EntrepriseUser,
    id: i32,
    input: LoggedJson<FactureInput>,
) -> Result<status::Created<Json<Envelope<Facture>>>, AppError> {
    let terms = BillingTerms {
        tva_rate_bp: config.tva_rate_bp,
        payment_terms_days: config.payment_terms_days,
    };
    let actor = user.actor;
    let input = input.into_inner();
    let facture = db
        .run(move |conn| create_facture(conn, &actor, id, input, terms))
        .await?;
    Ok(status::Created::new(format!("/api/1/factures/{}", facture.id)).body(ok(facture)))
}

/// `brouillon` → `envoyee`. The régie is notified.
#[post("/1/factures/<id>/envoyer")]
pub async fn send_facture_endpoint(
    db: DbConn,
    user: EntrepriseUser,
    id: i32,
) -> Result<Json<Envelope<Facture>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| send_facture(conn, &actor, id)).await?))
}

/// `envoyee` → `payee`. The entreprise is notified.
#[post("/1/factures/<id>/payer")]
pub async fn pay_facture_endpoint(
    db: DbConn,
    user: RegieUser,
    id: i32,
) -> Result<Json<Envelope<Facture>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| pay_facture(conn, &actor, id)).await?))
}

#[post("/1/factures/<id>/annuler")]
pub async fn cancel_facture_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Facture>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| cancel_facture(conn, &actor, id)).await?))
}

pub fn routes() -> Vec<Route> {
    routes![
        list_factures_endpoint,
        get_facture_endpoint,
        create_facture_endpoint,
        send_facture_endpoint,
        pay_facture_endpoint,
        cancel_facture_endpoint
    ]
}
