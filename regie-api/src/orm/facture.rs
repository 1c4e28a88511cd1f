//! Facture procedures: creation from a finished mission, the
//! brouillon/envoyee/payee lifecycle and bulk recomputation of amounts.

use chrono::{Datelike, Duration, Utc};
use diesel::prelude::*;
use diesel::sqlite::Sqlite;

use crate::access::Actor;
use crate::billing::{FactureAmounts, compute_amounts, format_numero, numero_prefix};
use crate::error::AppError;
use crate::models::{Facture, FactureInput, NewFacture, Role};
use crate::orm::last_insert_rowid;
use crate::orm::mission::load_mission;
use crate::orm::notification::{NotificationRefs, kind, notify};
use crate::orm::profile::{entreprise_profile_ids, regie_profile_ids};
use crate::orm::regie::get_regie;
use crate::pagination::Page;
use crate::schema::factures;
use crate::workflow::{FactureStatus, Lifecycle, MissionStatus, ensure_transition};

type BoxedFactures = factures::BoxedQuery<'static, Sqlite>;

diesel::define_sql_function!(fn length(x: diesel::sql_types::Text) -> diesel::sql_types::Integer);

/// Settings a new facture takes from the application config.
#[derive(Debug, Clone, Copy)]
pub struct BillingTerms {
    pub tva_rate_bp: i32,
    pub payment_terms_days: i64,
}

fn visible_factures(actor: &Actor) -> Result<BoxedFactures, AppError> {
    let query = factures::table.into_boxed();
    Ok(match actor.role {
        Role::AdminJtec => query,
        Role::Regie => query.filter(factures::regie_id.eq(actor.regie()?)),
        Role::Entreprise => query.filter(factures::entreprise_id.eq(actor.entreprise()?)),
        Role::Locataire | Role::Technicien => {
            return Err(AppError::forbidden("Factures are restricted to régies and entreprises"));
        }
    })
}

fn load_facture(conn: &mut SqliteConnection, facture_id: i32) -> Result<Facture, AppError> {
    factures::table
        .find(facture_id)
        .first(conn)
        .optional()?
        .ok_or_else(|| AppError::not_found("Facture"))
}

fn set_facture_status(
    conn: &mut SqliteConnection,
    facture: &Facture,
    to: FactureStatus,
) -> Result<(), AppError> {
    let from = FactureStatus::from_stored(&facture.statut)?;
    ensure_transition(from, to)?;
    diesel::update(factures::table.find(facture.id))
        .set(factures::statut.eq(to.as_str()))
        .execute(conn)?;
    Ok(())
}

fn refs(facture: &Facture) -> NotificationRefs {
    NotificationRefs {
        ticket_id: None,
        mission_id: Some(facture.mission_id),
        facture_id: Some(facture.id),
    }
}

/// Next `FAC-<year>-NNNNN` number. Sequences restart every year.
pub fn next_numero(conn: &mut SqliteConnection, year: i32) -> QueryResult<String> {
    let prefix = numero_prefix(year);
    let last: Option<String> = factures::table
        .filter(factures::numero.like(format!("{}%", prefix)))
        .select(factures::numero)
        // Longer suffixes sort first once the sequence outgrows five digits
        .order((length(factures::numero).desc(), factures::numero.desc()))
        .first(conn)
        .optional()?;

    let sequence = last
        .as_deref()
        .and_then(|numero| numero.strip_prefix(&prefix))
        .and_then(|seq| seq.parse::<i64>().ok())
        .unwrap_or(0);
    Ok(format_numero(year, sequence + 1))
}

pub fn list_factures(
    conn: &mut SqliteConnection,
    actor: &Actor,
    statut: Option<FactureStatus>,
    page: Page,
) -> Result<(Vec<Facture>, i64), AppError> {
    let filtered = |actor: &Actor| -> Result<BoxedFactures, AppError> {
        let query = visible_factures(actor)?;
        Ok(match statut {
            Some(s) => query.filter(factures::statut.eq(s.as_str())),
            None => query,
        })
    };

    let total: i64 = filtered(actor)?.count().get_result(conn)?;
    let rows = filtered(actor)?
        .order((factures::date_emission.desc(), factures::id.desc()))
        .limit(page.limit)
        .offset(page.offset())
        .load(conn)?;
    Ok((rows, total))
}

pub fn get_facture(
    conn: &mut SqliteConnection,
    actor: &Actor,
    facture_id: i32,
) -> Result<Facture, AppError> {
    visible_factures(actor)?;
    let facture = load_facture(conn, facture_id)?;
    if actor.can_see_facture(&facture) {
        Ok(facture)
    } else {
        Err(AppError::not_found("Facture"))
    }
}

/// Raises the `brouillon` facture of a finished mission.
pub fn create_facture(
    conn: &mut SqliteConnection,
    actor: &Actor,
    mission_id: i32,
    input: FactureInput,
    terms: BillingTerms,
) -> Result<Facture, AppError> {
    let entreprise_id = actor.entreprise()?;

    conn.transaction(|conn| {
        let (mission, ticket) = load_mission(conn, mission_id)?;
        if mission.entreprise_id != entreprise_id {
            return Err(AppError::not_found("Mission"));
        }
        if !MissionStatus::from_stored(&mission.statut)?.is_billable() {
            return Err(AppError::bad_request(format!(
                "Mission must be terminee or validee to be invoiced (is {})",
                mission.statut
            )));
        }
        let existing: i64 = factures::table
            .filter(factures::mission_id.eq(mission.id))
            .count()
            .get_result(conn)?;
        if existing > 0 {
            return Err(AppError::conflict("Mission already has a facture"));
        }

        let regie = get_regie(conn, ticket.regie_id)?
            .ok_or_else(|| AppError::Internal(format!("régie {} missing", ticket.regie_id)))?;
        let amounts = compute_amounts(input.montant_ht, terms.tva_rate_bp, regie.commission_rate_bp)?;

        let now = Utc::now().naive_utc();
        let date_echeance = input
            .date_echeance
            .unwrap_or_else(|| now + Duration::days(terms.payment_terms_days));
        if date_echeance < now - Duration::days(1) {
            return Err(AppError::bad_request("date_echeance is in the past"));
        }

        let new_facture = NewFacture {
            mission_id: mission.id,
            entreprise_id,
            regie_id: regie.id,
            numero: next_numero(conn, now.year())?,
            montant_ht: amounts.montant_ht,
            taux_tva_bp: terms.tva_rate_bp,
            montant_tva: amounts.montant_tva,
            montant_ttc: amounts.montant_ttc,
            taux_commission_bp: regie.commission_rate_bp,
            montant_commission: amounts.montant_commission,
            date_emission: now,
            date_echeance,
        };
        diesel::insert_into(factures::table)
            .values(&new_facture)
            .execute(conn)?;
        let facture: Facture = factures::table.find(last_insert_rowid(conn)?).first(conn)?;

        info!(
            "Facture {} created for mission {} (ttc={})",
            facture.numero, mission.id, facture.montant_ttc
        );
        Ok(facture)
    })
}

pub fn send_facture(
    conn: &mut SqliteConnection,
    actor: &Actor,
    facture_id: i32,
) -> Result<Facture, AppError> {
    let entreprise_id = actor.entreprise()?;

    conn.transaction(|conn| {
        let facture = load_facture(conn, facture_id)?;
        if facture.entreprise_id != entreprise_id {
            return Err(AppError::not_found("Facture"));
        }
        set_facture_status(conn, &facture, FactureStatus::Envoyee)?;

        let recipients = regie_profile_ids(conn, facture.regie_id)?;
        notify(
            conn,
            &recipients,
            kind::FACTURE_ENVOYEE,
            "Nouvelle facture",
            &format!("Facture {} reçue", facture.numero),
            refs(&facture),
        )?;
        load_facture(conn, facture.id)
    })
}

pub fn pay_facture(
    conn: &mut SqliteConnection,
    actor: &Actor,
    facture_id: i32,
) -> Result<Facture, AppError> {
    let regie_id = actor.regie()?;

    conn.transaction(|conn| {
        let facture = load_facture(conn, facture_id)?;
        if facture.regie_id != regie_id {
            return Err(AppError::not_found("Facture"));
        }
        set_facture_status(conn, &facture, FactureStatus::Payee)?;
        diesel::update(factures::table.find(facture.id))
            .set(factures::paid_at.eq(Some(Utc::now().naive_utc())))
            .execute(conn)?;

        let recipients = entreprise_profile_ids(conn, facture.entreprise_id)?;
        notify(
            conn,
            &recipients,
            kind::FACTURE_PAYEE,
            "Facture payée",
            &format!("La facture {} a été payée", facture.numero),
            refs(&facture),
        )?;
        load_facture(conn, facture.id)
    })
}

pub fn cancel_facture(
    conn: &mut SqliteConnection,
    actor: &Actor,
    facture_id: i32,
) -> Result<Facture, AppError> {
    conn.transaction(|conn| {
        let facture = load_facture(conn, facture_id)?;
        match actor.role {
            Role::AdminJtec => {}
            Role::Entreprise if actor.entreprise_id == Some(facture.entreprise_id) => {}
            Role::Entreprise => return Err(AppError::not_found("Facture")),
            _ => {
                return Err(AppError::forbidden(
                    "Only the entreprise or an administrator may cancel a facture",
                ));
            }
        }
        set_facture_status(conn, &facture, FactureStatus::Annulee)?;
        load_facture(conn, facture.id)
    })
}

/// A facture whose stored amounts differ from a recomputation.
#[derive(Debug, Clone)]
pub struct AmountsChange {
    pub facture_id: i32,
    pub numero: String,
    pub before: FactureAmounts,
    pub after: FactureAmounts,
}

pub fn stored_amounts(facture: &Facture) -> FactureAmounts {
    FactureAmounts {
        montant_ht: facture.montant_ht,
        montant_tva: facture.montant_tva,
        montant_ttc: facture.montant_ttc,
        montant_commission: facture.montant_commission,
    }
}

/// Recomputes TVA, TTC and commission of unpaid factures from their HT
/// amount and stored rates. With `dry_run` nothing is written.
pub fn recompute_factures(
    conn: &mut SqliteConnection,
    dry_run: bool,
) -> Result<Vec<AmountsChange>, AppError> {
    conn.transaction(|conn| {
        let open: Vec<Facture> = factures::table
            .filter(factures::statut.eq_any([
                FactureStatus::Brouillon.as_str(),
                FactureStatus::Envoyee.as_str(),
            ]))
            .order(factures::id.asc())
            .load(conn)?;

        let mut changes = Vec::new();
        for facture in open {
            let before = stored_amounts(&facture);
            let after = compute_amounts(
                facture.montant_ht,
                facture.taux_tva_bp,
                facture.taux_commission_bp,
            )?;
            if before == after {
                continue;
            }
            if !dry_run {
                diesel::update(factures::table.find(facture.id))
                    .set((
                        factures::montant_tva.eq(after.montant_tva),
                        factures::montant_ttc.eq(after.montant_ttc),
                        factures::montant_commission.eq(after.montant_commission),
                    ))
                    .execute(conn)?;
            }
            changes.push(AmountsChange {
                facture_id: facture.id,
                numero: facture.numero,
                before,
                after,
            });
        }
        Ok(changes)
    })
}
