use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::techniciens;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = techniciens)]
#[ts(export)]
pub struct Technicien {
    pub id: i32,
    pub profile_id: i32,
    pub entreprise_id: i32,
    pub nom: String,
    pub telephone: Option<String>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = techniciens)]
pub struct NewTechnicien {
    pub profile_id: i32,
    pub entreprise_id: i32,
    pub nom: String,
    pub telephone: Option<String>,
}
