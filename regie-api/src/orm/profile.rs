//! Profile (account) storage and resolution of the calling [`Actor`].

use diesel::prelude::*;

use crate::access::Actor;
use crate::error::AppError;
use crate::models::{NewProfile, Profile, ProfileInfo, Role};
use crate::orm::last_insert_rowid;
use crate::orm::technicien::get_technicien_by_profile;
use crate::schema::profiles;

pub fn insert_profile(conn: &mut SqliteConnection, new_profile: NewProfile) -> QueryResult<Profile> {
    diesel::insert_into(profiles::table)
        .values(&new_profile)
        .execute(conn)?;
    let id = last_insert_rowid(conn)?;
    profiles::table.find(id).first(conn)
}

pub fn get_profile(conn: &mut SqliteConnection, profile_id: i32) -> QueryResult<Option<Profile>> {
    profiles::table.find(profile_id).first(conn).optional()
}

pub fn get_profile_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> QueryResult<Option<Profile>> {
    profiles::table
        .filter(profiles::email.eq(email))
        .first(conn)
        .optional()
}

pub fn list_profiles(conn: &mut SqliteConnection) -> QueryResult<Vec<Profile>> {
    profiles::table.order(profiles::id.asc()).load(conn)
}

pub fn update_password_hash(
    conn: &mut SqliteConnection,
    profile_id: i32,
    password_hash: &str,
) -> QueryResult<usize> {
    diesel::update(profiles::table.find(profile_id))
        .set(profiles::password_hash.eq(password_hash))
        .execute(conn)
}

pub fn delete_profile(conn: &mut SqliteConnection, profile_id: i32) -> QueryResult<usize> {
    diesel::delete(profiles::table.find(profile_id)).execute(conn)
}

/// Ids of the régie accounts attached to a régie.
pub fn regie_profile_ids(conn: &mut SqliteConnection, regie_id: i32) -> QueryResult<Vec<i32>> {
    profiles::table
        .filter(profiles::regie_id.eq(regie_id))
        .filter(profiles::role.eq(Role::Regie.as_str()))
        .select(profiles::id)
        .load(conn)
}

pub fn entreprise_profile_ids(
    conn: &mut SqliteConnection,
    entreprise_id: i32,
) -> QueryResult<Vec<i32>> {
    profiles::table
        .filter(profiles::entreprise_id.eq(entreprise_id))
        .filter(profiles::role.eq(Role::Entreprise.as_str()))
        .select(profiles::id)
        .load(conn)
}

fn parse_role(profile: &Profile) -> Result<Role, AppError> {
    profile.role.parse().map_err(|e: String| {
        AppError::Internal(format!("profile {} has {}", profile.id, e))
    })
}

pub fn load_actor(conn: &mut SqliteConnection, profile: &Profile) -> Result<Actor, AppError> {
    let role = parse_role(profile)?;
    let technicien_id = match role {
        Role::Technicien => get_technicien_by_profile(conn, profile.id)?.map(|t| t.id),
        _ => None,
    };
    Ok(Actor {
        profile_id: profile.id,
        role,
        regie_id: profile.regie_id,
        entreprise_id: profile.entreprise_id,
        technicien_id,
    })
}

pub fn profile_info(profile: &Profile, actor: &Actor) -> ProfileInfo {
    ProfileInfo {
        id: profile.id,
        email: profile.email.clone(),
        role: actor.role,
        regie_id: profile.regie_id,
        entreprise_id: profile.entreprise_id,
        technicien_id: actor.technicien_id,
    }
}
