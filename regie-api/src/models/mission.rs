use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::missions;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = missions)]
#[ts(export)]
pub struct Mission {
    pub id: i32,
    pub ticket_id: i32,
    pub entreprise_id: i32,
    pub technicien_id: Option<i32>,
    pub statut: String,
    #[ts(type = "string | null")]
    pub date_intervention: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub started_at: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub completed_at: Option<NaiveDateTime>,
    #[ts(type = "string | null")]
    pub validated_at: Option<NaiveDateTime>,
    pub rapport: Option<String>,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = missions)]
pub struct NewMission {
    pub ticket_id: i32,
    pub entreprise_id: i32,
    pub date_intervention: Option<NaiveDateTime>,
}

/// Body of `POST /api/1/missions/<id>/technicien`.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AssignTechnicienInput {
    pub technicien_id: i32,
    #[ts(type = "string | null")]
    pub date_intervention: Option<NaiveDateTime>,
}

/// Body of `POST /api/1/missions/<id>/terminer`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TerminerMissionInput {
    pub rapport: Option<String>,
}
