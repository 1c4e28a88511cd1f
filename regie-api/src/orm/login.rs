//! Database operations for login and bearer session management.
//!
//! Functions here are generic over [`DbRunner`] so the same code runs
//! against the Rocket pool in production and against a plain in-memory
//! connection in unit tests.

use argon2::{
    Argon2, PasswordHasher,
    password_hash::{self, PasswordHash, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, NaiveDateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::DbConn;
use crate::access::Actor;
use crate::error::AppError;
use crate::models::{NewSession, Profile, Session};
#[cfg(any(test, feature = "test-staging"))]
use crate::orm::testing::FakeDbConn;
use crate::orm::profile::{get_profile, get_profile_by_email, load_actor};
use crate::schema::sessions;

/// Abstraction over "something that runs a closure on a SQLite connection".
pub trait DbRunner {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static;
}

impl DbRunner for DbConn {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        DbConn::run(self, f)
    }
}

#[cfg(any(test, feature = "test-staging"))]
impl<'a> DbRunner for FakeDbConn<'a> {
    fn run<F, R>(&self, f: F) -> impl std::future::Future<Output = R>
    where
        F: FnOnce(&mut diesel::SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        FakeDbConn::run(self, f)
    }
}

/// Result of a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub token: String,
    pub expires_at: Option<NaiveDateTime>,
    pub profile: Profile,
    pub actor: Actor,
}

fn generate_session_token() -> String {
    Uuid::new_v4().to_string()
}

/// Hashes a password with Argon2 and a random salt.
pub fn hash_password(password: &str) -> Result<String, password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)?
        .to_string())
}

/// `false` for a wrong password and for a malformed stored hash.
pub fn verify_password(password: &str, stored_hash: &str) -> bool {
    match PasswordHash::new(stored_hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(e) => {
            warn!("Stored password hash is malformed: {}", e);
            false
        }
    }
}

/// Expiry for a session opened at `now`. Zero, or a TTL too large to
/// represent, means the session never expires.
pub fn session_expiry(now: NaiveDateTime, ttl_hours: i64) -> Option<NaiveDateTime> {
    if ttl_hours <= 0 {
        return None;
    }
    Duration::try_hours(ttl_hours).and_then(|ttl| now.checked_add_signed(ttl))
}

/// Stores a new session. A `ttl_hours` of zero gives a session that never
/// expires.
pub async fn create_and_store_session<D: DbRunner>(
    db: &D,
    profile_id: i32,
    ttl_hours: i64,
) -> Result<(String, Option<NaiveDateTime>), AppError> {
    let token = generate_session_token();
    let now = Utc::now().naive_utc();
    let expires_at = session_expiry(now, ttl_hours);

    let new_session = NewSession {
        id: token.clone(),
        profile_id,
        created_at: now,
        expires_at,
        revoked: false,
    };

    db.run(move |conn| {
        diesel::insert_into(sessions::table)
            .values(&new_session)
            .execute(conn)
    })
    .await?;

    Ok((token, expires_at))
}

pub async fn process_login<D: DbRunner>(
    db: &D,
    email: &str,
    password: &str,
    ttl_hours: i64,
) -> Result<LoginOutcome, AppError> {
    if email.trim().is_empty() || password.is_empty() {
        return Err(AppError::bad_request("Email and password are required"));
    }

    let email = email.trim().to_lowercase();
    let lookup = db
        .run(move |conn| -> Result<Option<(Profile, Actor)>, AppError> {
            match get_profile_by_email(conn, &email)? {
                Some(profile) => {
                    let actor = load_actor(conn, &profile)?;
                    Ok(Some((profile, actor)))
                }
                None => Ok(None),
            }
        })
        .await?;

    let invalid = || AppError::Unauthorized;
    let (profile, actor) = lookup.ok_or_else(invalid)?;
    if !verify_password(password, &profile.password_hash) {
        return Err(invalid());
    }

    let (token, expires_at) = create_and_store_session(db, profile.id, ttl_hours).await?;
    info!("Profile {} ({}) logged in", profile.id, actor.role);

    Ok(LoginOutcome {
        token,
        expires_at,
        profile,
        actor,
    })
}

/// Session and profile for a bearer token, if the session is still usable.
pub fn find_session_profile(
    conn: &mut SqliteConnection,
    token: &str,
) -> Result<Option<(Session, Profile, Actor)>, AppError> {
    let now = Utc::now().naive_utc();
    let session = sessions::table
        .filter(sessions::id.eq(token))
        .filter(sessions::revoked.eq(false))
        .filter(
            sessions::expires_at
                .is_null()
                .or(sessions::expires_at.gt(now)),
        )
        .first::<Session>(conn)
        .optional()?;

    let Some(session) = session else {
        return Ok(None);
    };
    let Some(profile) = get_profile(conn, session.profile_id)? else {
        return Ok(None);
    };
    let actor = load_actor(conn, &profile)?;
    Ok(Some((session, profile, actor)))
}

pub fn revoke_session(conn: &mut SqliteConnection, token: &str) -> QueryResult<usize> {
    diesel::update(sessions::table.find(token))
        .set(sessions::revoked.eq(true))
        .execute(conn)
}

/// Revokes every session of a profile, e.g. after a password change.
pub fn revoke_profile_sessions(conn: &mut SqliteConnection, profile_id: i32) -> QueryResult<usize> {
    diesel::update(sessions::table.filter(sessions::profile_id.eq(profile_id)))
        .set(sessions::revoked.eq(true))
        .execute(conn)
}
