use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::models::Role;
use crate::schema::profiles;

/// A login account. `role` holds the text form of [`Role`].
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: i32,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
}

/// Profile as exposed by the API (no password hash).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProfileInfo {
    pub id: i32,
    pub email: String,
    pub role: Role,
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
    pub technicien_id: Option<i32>,
}
