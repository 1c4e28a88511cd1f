use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::notifications;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = notifications)]
#[ts(export)]
pub struct Notification {
    pub id: i32,
    pub profile_id: i32,
    pub kind: String,
    pub titre: String,
    pub message: String,
    pub ticket_id: Option<i32>,
    pub mission_id: Option<i32>,
    pub facture_id: Option<i32>,
    pub is_read: bool,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string | null")]
    pub read_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug, Clone)]
#[diesel(table_name = notifications)]
pub struct NewNotification {
    pub profile_id: i32,
    pub kind: String,
    pub titre: String,
    pub message: String,
    pub ticket_id: Option<i32>,
    pub mission_id: Option<i32>,
    pub facture_id: Option<i32>,
}
