use std::collections::BTreeMap;

use serde::Serialize;
use ts_rs::TS;

/// Platform-wide figures for the admin dashboard.
#[derive(Debug, Clone, Default, Serialize, TS)]
#[ts(export)]
pub struct AdminStats {
    pub regies: i64,
    pub entreprises: i64,
    pub techniciens: i64,
    pub locataires: i64,
    pub tickets_par_statut: BTreeMap<String, i64>,
    pub missions_par_statut: BTreeMap<String, i64>,
    pub factures_par_statut: BTreeMap<String, i64>,
    /// Sum of TTC amounts of paid factures, in cents.
    pub chiffre_affaires_ttc: i64,
    /// Sum of commissions on paid factures, in cents.
    pub commissions: i64,
    pub abonnements_actifs_par_plan: BTreeMap<String, i64>,
}
