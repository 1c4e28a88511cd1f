//! Organisation directories used when routing work: régies pick an
//! entreprise for a ticket, entreprises pick a technicien for a mission.

use rocket::Route;
use rocket::serde::json::Json;

use crate::envelope::{Envelope, ok};
use crate::error::AppError;
use crate::models::{Entreprise, Role, Technicien};
use crate::orm::DbConn;
use crate::orm::entreprise::list_entreprises;
use crate::orm::technicien::list_techniciens;
use crate::session_guards::AuthenticatedUser;

/// Entreprises, by name. Régies and administrators only.
#[get("/1/entreprises")]
pub async fn list_entreprises_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
) -> Result<Json<Envelope<Vec<Entreprise>>>, AppError> {
    if !user.has_any_role(&[Role::Regie, Role::AdminJtec]) {
        return Err(AppError::forbidden("Only régies may browse entreprises"));
    }
    Ok(ok(db.run(list_entreprises).await?))
}

/// Techniciens. An entreprise sees its own staff, an administrator all.
#[get("/1/techniciens")]
pub async fn list_techniciens_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
) -> Result<Json<Envelope<Vec<Technicien>>>, AppError> {
    let scope = if user.is_admin() {
        None
    } else {
        Some(user.actor.entreprise()?)
    };
    Ok(ok(db.run(move |conn| list_techniciens(conn, scope)).await?))
}

pub fn routes() -> Vec<Route> {
    routes![list_entreprises_endpoint, list_techniciens_endpoint]
}
