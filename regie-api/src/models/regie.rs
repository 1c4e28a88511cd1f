use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::regies;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = regies)]
#[ts(export)]
pub struct Regie {
    pub id: i32,
    pub nom: String,
    pub email: Option<String>,
    /// Commission taken on invoice HT amounts, in basis points.
    pub commission_rate_bp: i32,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Deserialize)]
#[diesel(table_name = regies)]
pub struct NewRegie {
    pub nom: String,
    pub email: Option<String>,
    pub commission_rate_bp: i32,
}
