//! Mission conversation endpoints.

use rocket::Route;
use rocket::response::status;
use rocket::serde::json::Json;

use crate::envelope::{Envelope, ok};
use crate::error::AppError;
use crate::logged_json::LoggedJson;
use crate::models::{Message, MessageInput};
use crate::orm::DbConn;
use crate::orm::message::{list_messages, post_message};
use crate::session_guards::AuthenticatedUser;

/// List Messages endpoint.
///
/// - **URL:** `/api/1/missions/<id>/messages`
/// - **Method:** `GET`
/// - **Authentication:** Required, mission participant
///
/// Participants are the administrator, the ticket's régie and locataire,
/// the mission's entreprise and the assigned technicien. Anyone else gets
/// 403; an unknown mission gives 404. Messages come oldest first.
#[get("/1/missions/<id>/messages")]
pub async fn list_messages_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
) -> Result<Json<Envelope<Vec<Message>>>, AppError> {
    let actor = user.actor;
    Ok(ok(db.run(move |conn| list_messages(conn, &actor, id)).await?))
}

/// Post Message endpoint.
///
/// - **URL:** `/api/1/missions/<id>/messages`
/// - **Method:** `POST`
/// - **Authentication:** Required, mission participant
///
/// # Request Format
///
/// ```json
/// { "contenu": "Je passe demain à 8h" }
/// ```
///
/// The locataire and the technicien are notified, except whichever of them
/// sent the message.
///
/// **Success (HTTP 201 Created):** `{"success": true, "data": <Message>}`
#[post("/1/missions/<id>/messages", data = "<input>")]
pub async fn post_message_endpoint(
    db: DbConn,
    user: AuthenticatedUser,
    id: i32,
    input: LoggedJson<MessageInput>,
) -> Result<status::Created<Json<Envelope<Message>>>, AppError> {
    let actor = user.actor;
    let contenu = input.into_inner().contenu;
    let message = db
        .run(move |conn| post_message(conn, &actor, id, &contenu))
        .await?;
    Ok(status::Created::new(format!("/api/1/missions/{}/messages", id)).body(ok(message)))
}

pub fn routes() -> Vec<Route> {
    routes![list_messages_endpoint, post_message_endpoint]
}
