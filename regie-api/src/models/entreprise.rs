use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::entreprises;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = entreprises)]
#[ts(export)]
pub struct Entreprise {
    pub id: i32,
    pub nom: String,
    pub siret: Option<String>,
    pub email: Option<String>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
}

#[derive(Insertable, Debug, Deserialize)]
#[diesel(table_name = entreprises)]
pub struct NewEntreprise {
    pub nom: String,
    pub siret: Option<String>,
    pub email: Option<String>,
}
