use chrono::NaiveDateTime;
use diesel::{Identifiable, Insertable, Queryable, Selectable};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::schema::factures;

/// An invoice. Amounts are cents, rates are basis points.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone, Serialize, Deserialize, TS)]
#[diesel(table_name = factures)]
#[ts(export)]
pub struct Facture {
    pub id: i32,
    pub mission_id: i32,
    pub entreprise_id: i32,
    pub regie_id: i32,
    pub numero: String,
    pub montant_ht: i64,
    pub taux_tva_bp: i32,
    pub montant_tva: i64,
    pub montant_ttc: i64,
    pub taux_commission_bp: i32,
    pub montant_commission: i64,
    pub statut: String,
    #[ts(type = "string")]
    pub date_emission: NaiveDateTime,
    #[ts(type = "string")]
    pub date_echeance: NaiveDateTime,
    #[ts(type = "string | null")]
    pub paid_at: Option<NaiveDateTime>,
}

#[derive(Insertable, Debug)]
#[diesel(table_name = factures)]
pub struct NewFacture {
    pub mission_id: i32,
    pub entreprise_id: i32,
    pub regie_id: i32,
    pub numero: String,
    pub montant_ht: i64,
    pub taux_tva_bp: i32,
    pub montant_tva: i64,
    pub montant_ttc: i64,
    pub taux_commission_bp: i32,
    pub montant_commission: i64,
    pub date_emission: NaiveDateTime,
    pub date_echeance: NaiveDateTime,
}

/// Body of `POST /api/1/missions/<id>/facture`.
#[derive(Debug, Clone, Deserialize, Serialize, TS)]
#[ts(export)]
pub struct FactureInput {
    pub montant_ht: i64,
    #[ts(type = "string | null")]
    pub date_echeance: Option<NaiveDateTime>,
}
