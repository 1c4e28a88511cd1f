//! Bearer-token authentication and role guards for Rocket routes.
//!
//! # Basic Authentication
//!
//! ```rust,ignore
//! use rocket::get;
//! use regie_api::session_guards::AuthenticatedUser;
//!
//! #[get("/whoami")]
//! fn whoami(user: AuthenticatedUser) -> String {
//!     format!("{} ({})", user.profile.email, user.actor.role)
//! }
//! ```
//!
//! # Role-Based Authorization
//!
//! ```rust,ignore
//! use rocket::get;
//! use regie_api::session_guards::RegieUser;
//!
//! #[get("/regie-only")]
//! fn regie_only(user: RegieUser) -> String {
//!     format!("Régie access granted to {}", user.profile.email)
//! }
//! ```
//!
//! Guards only decide *who* the caller is and which role they hold. Row
//! ownership is checked by the ORM procedures through [`crate::access`].

use rocket::http::Status;
use rocket::outcome::Outcome;
use rocket::request::{self, FromRequest, Request};

use crate::DbConn;
use crate::access::Actor;
use crate::models::{Profile, Role};
use crate::orm::login::find_session_profile;

/// Extracts the token from an `Authorization: Bearer <token>` value.
pub fn parse_bearer(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() { None } else { Some(token) }
}

/// A request guard for routes that require an authenticated caller.
///
/// The request must carry `Authorization: Bearer <token>` naming a session
/// that is neither revoked nor expired and whose profile still exists.
/// Anything else fails with `401 Unauthorized`.
#[derive(Debug)]
pub struct AuthenticatedUser {
    pub profile: Profile,
    pub actor: Actor,
    /// The bearer token, which is also the session id.
    pub session_id: String,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for AuthenticatedUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let token = match request.headers().get_one("Authorization").and_then(parse_bearer) {
            Some(token) => token.to_string(),
            None => return Outcome::Error((Status::Unauthorized, ())),
        };

        let db = match request.guard::<DbConn>().await {
            Outcome::Success(db) => db,
            _ => {
                error!("No database connection available for session lookup");
                return Outcome::Error((Status::Unauthorized, ()));
            }
        };

        match db.run(move |conn| find_session_profile(conn, &token)).await {
            Ok(Some((session, profile, actor))) => Outcome::Success(AuthenticatedUser {
                profile,
                actor,
                session_id: session.id,
            }),
            Ok(None) => Outcome::Error((Status::Unauthorized, ())),
            Err(e) => {
                error!("Database error finding session: {:?}", e);
                Outcome::Error((Status::Unauthorized, ()))
            }
        }
    }
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.actor.role == role
    }

    pub fn has_any_role(&self, roles: &[Role]) -> bool {
        roles.contains(&self.actor.role)
    }

    pub fn is_admin(&self) -> bool {
        self.actor.is_admin()
    }
}

/// Creates a guard that accepts only callers holding one role.
macro_rules! create_role_guard {
    ($name:ident, $role:expr) => {
        #[derive(Debug)]
        pub struct $name {
            pub profile: Profile,
            pub actor: Actor,
            pub session_id: String,
        }

        #[rocket::async_trait]
        impl<'r> FromRequest<'r> for $name {
            type Error = ();

            async fn from_request(request: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
                let auth_user = match AuthenticatedUser::from_request(request).await {
                    Outcome::Success(user) => user,
                    Outcome::Error(e) => return Outcome::Error(e),
                    Outcome::Forward(f) => return Outcome::Forward(f),
                };

                if auth_user.has_role($role) {
                    Outcome::Success($name {
                        profile: auth_user.profile,
                        actor: auth_user.actor,
                        session_id: auth_user.session_id,
                    })
                } else {
                    Outcome::Error((Status::Forbidden, ()))
                }
            }
        }
    };
}

// Platform administrators.
create_role_guard!(AdminUser, Role::AdminJtec);

create_role_guard!(RegieUser, Role::Regie);

create_role_guard!(EntrepriseUser, Role::Entreprise);

create_role_guard!(LocataireUser, Role::Locataire);

create_role_guard!(TechnicienUser, Role::Technicien);
