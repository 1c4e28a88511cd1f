use std::collections::BTreeMap;
use std::fmt;

use chrono::{Duration, NaiveDateTime, Utc};
use clap::Subcommand;
use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};
use diesel::sqlite::SqliteConnection;
use regie_api::billing::{compute_amounts, format_cents};
use regie_api::config::MAX_PAYMENT_TERMS_DAYS;
use regie_api::models::Facture;
use regie_api::orm::facture::stored_amounts;
use regie_api::orm::stats::admin_stats;
use regie_api::schema::{abonnements, factures, missions, tickets};
use regie_api::workflow::{AbonnementStatus, Lifecycle, MissionStatus, TicketStatus};

use super::utils::CliResult;

/// Tables the application expects, in migration order.
pub const EXPECTED_TABLES: &[&str] = &[
    "regies",
    "entreprises",
    "profiles",
    "techniciens",
    "sessions",
    "tickets",
    "missions",
    "factures",
    "messages",
    "notifications",
    "plans",
    "abonnements",
];

#[derive(Subcommand)]
pub enum AuditAction {
    #[command(about = "List tables and report missing ones")]
    Schema,
    #[command(about = "Status counts and consistency checks")]
    State {
        #[arg(long, help = "Exit non-zero when any check fails")]
        strict: bool,
        #[arg(
            long,
            default_value_t = 30,
            value_parser = clap::value_parser!(i64).range(0..=MAX_PAYMENT_TERMS_DAYS),
            help = "Days after validation a mission should be invoiced"
        )]
        payment_terms_days: i64,
    },
}

pub fn handle_audit_command_with_conn(
    conn: &mut SqliteConnection,
    action: AuditAction,
) -> CliResult {
    match action {
        AuditAction::Schema => audit_schema_impl(conn),
        AuditAction::State {
            strict,
            payment_terms_days,
        } => audit_state_impl(conn, strict, payment_terms_days),
    }
}

#[derive(QueryableByName)]
struct TableName {
    #[diesel(sql_type = Text)]
    name: String,
}

#[derive(QueryableByName)]
struct ColumnCount {
    #[diesel(sql_type = BigInt)]
    columns: i64,
}

/// User tables with their column counts, sorted by name.
pub fn table_columns(conn: &mut SqliteConnection) -> QueryResult<Vec<(String, i64)>> {
    let tables: Vec<TableName> = diesel::sql_query(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )
    .load(conn)?;

    let mut result = Vec::with_capacity(tables.len());
    for table in tables {
        let count: ColumnCount =
            diesel::sql_query("SELECT COUNT(*) AS columns FROM pragma_table_info(?)")
                .bind::<Text, _>(&table.name)
                .get_result(conn)?;
        result.push((table.name, count.columns));
    }
    Ok(result)
}

pub fn missing_tables(present: &[(String, i64)]) -> Vec<&'static str> {
    EXPECTED_TABLES
        .iter()
        .copied()
        .filter(|expected| !present.iter().any(|(name, _)| name == expected))
        .collect()
}

pub fn audit_schema_impl(conn: &mut SqliteConnection) -> CliResult {
    let tables = table_columns(conn)?;

    println!("Tables ({}):", tables.len());
    for (name, columns) in &tables {
        println!("  {:<32} {} column(s)", name, columns);
    }

    let missing = missing_tables(&tables);
    if missing.is_empty() {
        println!("All {} expected tables are present.", EXPECTED_TABLES.len());
        Ok(())
    } else {
        for name in &missing {
            eprintln!("Missing table: {}", name);
        }
        Err(format!("{} expected table(s) missing", missing.len()).into())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    TicketBehindMission {
        mission_id: i32,
        mission_statut: String,
        ticket_id: i32,
        ticket_statut: String,
    },
    FactureAmounts {
        numero: String,
        detail: String,
    },
    UninvoicedMission {
        mission_id: i32,
        validated_at: NaiveDateTime,
    },
    DuplicateAbonnement {
        subscriber: String,
        active: i64,
    },
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TicketBehindMission {
                mission_id,
                mission_statut,
                ticket_id,
                ticket_statut,
            } => write!(
                f,
                "mission {} is {} but ticket {} is {}",
                mission_id, mission_statut, ticket_id, ticket_statut
            ),
            Self::FactureAmounts { numero, detail } => write!(f, "facture {}: {}", numero, detail),
            Self::UninvoicedMission {
                mission_id,
                validated_at,
            } => write!(
                f,
                "mission {} validated on {} has no facture",
                mission_id,
                validated_at.format("%Y-%m-%d")
            ),
            Self::DuplicateAbonnement { subscriber, active } => {
                write!(f, "{} has {} active abonnements", subscriber, active)
            }
        }
    }
}

fn tickets_behind_missions(conn: &mut SqliteConnection) -> QueryResult<Vec<Finding>> {
    let rows: Vec<(i32, String, i32, String)> = missions::table
        .inner_join(tickets::table)
        .filter(missions::statut.eq_any([
            MissionStatus::Terminee.as_str(),
            MissionStatus::Validee.as_str(),
        ]))
        .filter(tickets::statut.ne_all([TicketStatus::Termine.as_str(), TicketStatus::Clos.as_str()]))
        .select((missions::id, missions::statut, tickets::id, tickets::statut))
        .order(missions::id.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .map(|(mission_id, mission_statut, ticket_id, ticket_statut)| {
            Finding::TicketBehindMission {
                mission_id,
                mission_statut,
                ticket_id,
                ticket_statut,
            }
        })
        .collect())
}

fn facture_amount_findings(conn: &mut SqliteConnection) -> QueryResult<Vec<Finding>> {
    let all: Vec<Facture> = factures::table.order(factures::id.asc()).load(conn)?;

    let mut findings = Vec::new();
    for facture in all {
        let stored = stored_amounts(&facture);
        if stored.montant_ht.checked_add(stored.montant_tva) != Some(stored.montant_ttc) {
            findings.push(Finding::FactureAmounts {
                numero: facture.numero.clone(),
                detail: format!(
                    "ttc {} != ht {} + tva {}",
                    format_cents(stored.montant_ttc),
                    format_cents(stored.montant_ht),
                    format_cents(stored.montant_tva)
                ),
            });
        }
        match compute_amounts(facture.montant_ht, facture.taux_tva_bp, facture.taux_commission_bp) {
            Ok(expected) if expected.montant_commission != stored.montant_commission => {
                findings.push(Finding::FactureAmounts {
                    numero: facture.numero.clone(),
                    detail: format!(
                        "commission {} should be {}",
                        format_cents(stored.montant_commission),
                        format_cents(expected.montant_commission)
                    ),
                });
            }
            Ok(_) => {}
            Err(e) => findings.push(Finding::FactureAmounts {
                numero: facture.numero.clone(),
                detail: e.to_string(),
            }),
        }
    }
    Ok(findings)
}

fn uninvoiced_missions(
    conn: &mut SqliteConnection,
    cutoff: NaiveDateTime,
) -> QueryResult<Vec<Finding>> {
    let rows: Vec<(i32, Option<NaiveDateTime>)> = missions::table
        .left_join(factures::table)
        .filter(missions::statut.eq(MissionStatus::Validee.as_str()))
        .filter(missions::validated_at.lt(cutoff))
        .filter(factures::id.is_null())
        .select((missions::id, missions::validated_at))
        .order(missions::id.asc())
        .load(conn)?;

    Ok(rows
        .into_iter()
        .filter_map(|(mission_id, validated_at)| {
            validated_at.map(|validated_at| Finding::UninvoicedMission {
                mission_id,
                validated_at,
            })
        })
        .collect())
}

fn duplicate_abonnements(conn: &mut SqliteConnection) -> QueryResult<Vec<Finding>> {
    let actif = AbonnementStatus::Actif.as_str();

    let by_regie: Vec<(Option<i32>, i64)> = abonnements::table
        .filter(abonnements::statut.eq(actif))
        .filter(abonnements::regie_id.is_not_null())
        .group_by(abonnements::regie_id)
        .having(count_star().gt(1))
        .select((abonnements::regie_id, count_star()))
        .load(conn)?;
    let by_entreprise: Vec<(Option<i32>, i64)> = abonnements::table
        .filter(abonnements::statut.eq(actif))
        .filter(abonnements::entreprise_id.is_not_null())
        .group_by(abonnements::entreprise_id)
        .having(count_star().gt(1))
        .select((abonnements::entreprise_id, count_star()))
        .load(conn)?;

    let regies = by_regie.into_iter().filter_map(|(id, active)| {
        id.map(|id| Finding::DuplicateAbonnement {
            subscriber: format!("régie {}", id),
            active,
        })
    });
    let entreprises = by_entreprise.into_iter().filter_map(|(id, active)| {
        id.map(|id| Finding::DuplicateAbonnement {
            subscriber: format!("entreprise {}", id),
            active,
        })
    });
    Ok(regies.chain(entreprises).collect())
}

/// Runs every consistency check. Missions validated before `now` minus
/// the payment terms must have a facture.
pub fn collect_findings(
    conn: &mut SqliteConnection,
    payment_terms_days: i64,
    now: NaiveDateTime,
) -> QueryResult<Vec<Finding>> {
    let mut findings = tickets_behind_missions(conn)?;
    findings.extend(facture_amount_findings(conn)?);
    findings.extend(uninvoiced_missions(conn, now - Duration::days(payment_terms_days))?);
    findings.extend(duplicate_abonnements(conn)?);
    Ok(findings)
}

fn print_counts(title: &str, counts: &BTreeMap<String, i64>) {
    println!("{}:", title);
    if counts.is_empty() {
        println!("  (none)");
    }
    for (statut, count) in counts {
        println!("  {:<12} {}", statut, count);
    }
}

pub fn audit_state_impl(
    conn: &mut SqliteConnection,
    strict: bool,
    payment_terms_days: i64,
) -> CliResult {
    let stats = admin_stats(conn)?;
    println!(
        "Régies: {}, entreprises: {}, techniciens: {}, locataires: {}",
        stats.regies, stats.entreprises, stats.techniciens, stats.locataires
    );
    print_counts("Tickets", &stats.tickets_par_statut);
    print_counts("Missions", &stats.missions_par_statut);
    print_counts("Factures", &stats.factures_par_statut);
    print_counts("Active abonnements", &stats.abonnements_actifs_par_plan);
    println!(
        "Paid TTC: {}, commissions: {}",
        format_cents(stats.chiffre_affaires_ttc),
        format_cents(stats.commissions)
    );

    let findings = collect_findings(conn, payment_terms_days, Utc::now().naive_utc())?;
    if findings.is_empty() {
        println!("No consistency issues found.");
        return Ok(());
    }

    println!("{} finding(s):", findings.len());
    for finding in &findings {
        println!("  - {}", finding);
    }
    if strict {
        return Err(format!("{} consistency finding(s)", findings.len()).into());
    }
    Ok(())
}
