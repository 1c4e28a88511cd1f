use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::tickets;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = tickets)]
#[ts(export)]
pub struct Ticket {
    pub id: i32,
    pub locataire_id: i32,
    pub regie_id: i32,
    pub titre: String,
    pub description: String,
    pub categorie: String,
    pub priorite: String,
    pub statut: String,
    #[ts(type = "string")]
    pub created_at: NaiveDateTime,
    #[ts(type = "string")]
    pub updated_at: NaiveDateTime,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = tickets)]
pub struct NewTicket {
    pub locataire_id: i32,
    pub regie_id: i32,
    pub titre: String,
    pub description: String,
    pub categorie: String,
    pub priorite: String,
}

#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct TicketInput {
    pub titre: String,
    pub description: String,
    pub categorie: String,
    pub priorite: Option<String>,
}

/// Body of `POST /api/1/tickets/<id>/assign`.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct AssignTicketInput {
    pub entreprise_id: i32,
    #[ts(type = "string | null")]
    pub date_intervention: Option<NaiveDateTime>,
}
