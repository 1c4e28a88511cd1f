use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::{abonnements, plans};

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = plans, primary_key(code))]
#[ts(export)]
pub struct Plan {
    pub code: String,
    pub nom: String,
    pub rang: i32,
    /// Monthly price in cents.
    pub prix_mensuel: i64,
    pub max_utilisateurs: Option<i32>,
}

/// A subscription held by exactly one régie or one entreprise.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = abonnements)]
#[ts(export)]
pub struct Abonnement {
    pub id: i32,
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
    pub plan_code: String,
    pub statut: String,
    #[ts(type = "string")]
    pub date_debut: NaiveDateTime,
    #[ts(type = "string | null")]
    pub date_fin: Option<NaiveDateTime>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = abonnements)]
pub struct NewAbonnement {
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
    pub plan_code: String,
    pub date_debut: NaiveDateTime,
}

/// Body of `POST /api/1/abonnements`.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AbonnementInput {
    pub plan_code: String,
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
}

/// Body of `POST /api/1/abonnements/<id>/upgrade`.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct UpgradeInput {
    pub plan_code: String,
}
