//! HTTP route handlers, mounted under `/api`.
//!
//! Handlers stay thin: they authenticate the caller through a session
//! guard, parse query parameters and forward to an ORM procedure on the
//! pooled connection. Failures come back as [`crate::error::AppError`],
//! which renders the `{"success": false, "error": ...}` envelope.

use std::str::FromStr;

use rocket::Route;

use crate::error::AppError;

pub mod abonnement;
pub mod admin;
pub mod directory;
pub mod facture;
pub mod health;
pub mod login;
pub mod message;
pub mod mission;
pub mod notification;
pub mod ticket;

/// Parses an optional `?statut=` filter.
pub(crate) fn parse_filter<S>(value: Option<String>) -> Result<Option<S>, AppError>
where
    S: FromStr<Err = AppError>,
{
    match value.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(text) => text.parse().map(Some),
    }
}

pub fn routes() -> Vec<Route> {
    let mut routes = Vec::new();
    routes.extend(health::routes());
    routes.extend(login::routes());
    routes.extend(ticket::routes());
    routes.extend(mission::routes());
    routes.extend(facture::routes());
    routes.extend(message::routes());
    routes.extend(notification::routes());
    routes.extend(abonnement::routes());
    routes.extend(directory::routes());
    routes.extend(admin::routes());
    routes
}
