use std::collections::BTreeMap;

use diesel::dsl::count_star;
use diesel::prelude::*;
use diesel::sql_types::{BigInt, Text};

use crate::models::{AdminStats, Role};
use crate::schema::{abonnements, entreprises, factures, missions, profiles, regies, techniciens, tickets};
use crate::workflow::{AbonnementStatus, FactureStatus, Lifecycle};

#[derive(QueryableByName)]
struct PaidTotals {
    #[diesel(sql_type = BigInt)]
    ttc: i64,
    #[diesel(sql_type = BigInt)]
    commission: i64,
}

fn paid_totals(conn: &mut SqliteConnection) -> QueryResult<PaidTotals> {
    // SUM over BIGINT maps to Numeric in Diesel, so the totals go through SQL.
    diesel::sql_query(
        "SELECT COALESCE(SUM(montant_ttc), 0) AS ttc, \
                COALESCE(SUM(montant_commission), 0) AS commission \
         FROM factures WHERE statut = ?",
    )
    .bind::<Text, _>(FactureStatus::Payee.as_str())
    .get_result(conn)
}

fn to_map(rows: Vec<(String, i64)>) -> BTreeMap<String, i64> {
    rows.into_iter().collect()
}

/// Platform-wide counts and paid totals.
pub fn admin_stats(conn: &mut SqliteConnection) -> QueryResult<AdminStats> {
    let tickets_par_statut = tickets::table
        .group_by(tickets::statut)
        .select((tickets::statut, count_star()))
        .load::<(String, i64)>(conn)?;
    let missions_par_statut = missions::table
        .group_by(missions::statut)
        .select((missions::statut, count_star()))
        .load::<(String, i64)>(conn)?;
    let factures_par_statut = factures::table
        .group_by(factures::statut)
        .select((factures::statut, count_star()))
        .load::<(String, i64)>(conn)?;
    let abonnements_actifs_par_plan = abonnements::table
        .filter(abonnements::statut.eq(AbonnementStatus::Actif.as_str()))
        .group_by(abonnements::plan_code)
        .select((abonnements::plan_code, count_star()))
        .load::<(String, i64)>(conn)?;

    let totals = paid_totals(conn)?;

    Ok(AdminStats {
        regies: regies::table.count().get_result(conn)?,
        entreprises: entreprises::table.count().get_result(conn)?,
        techniciens: techniciens::table.count().get_result(conn)?,
        locataires: profiles::table
            .filter(profiles::role.eq(Role::Locataire.as_str()))
            .count()
            .get_result(conn)?,
        tickets_par_statut: to_map(tickets_par_statut),
        missions_par_statut: to_map(missions_par_statut),
        factures_par_statut: to_map(factures_par_statut),
        chiffre_affaires_ttc: totals.ttc,
        commissions: totals.commission,
        abonnements_actifs_par_plan: to_map(abonnements_actifs_par_plan),
    })
}

#[cfg(test)]
mod tests {
    use diesel::connection::SimpleConnection;

    use super::*;
    use crate::orm::testing::{setup_seeded_test_db, setup_test_db};

    #[test]
    fn test_empty_database() {
        let mut conn = setup_test_db();
        let stats = admin_stats(&mut conn).unwrap();
        assert_eq!(stats.regies, 0);
        assert!(stats.tickets_par_statut.is_empty());
        assert_eq!(stats.chiffre_affaires_ttc, 0);
    }

    #[test]
    fn test_counts_fixture_set() {
        let mut conn = setup_seeded_test_db();
        let stats = admin_stats(&mut conn).unwrap();
        assert_eq!(stats.regies, 2);
        assert_eq!(stats.entreprises, 2);
        assert_eq!(stats.techniciens, 2);
        assert_eq!(stats.locataires, 3);
        assert_eq!(stats.abonnements_actifs_par_plan.get("essentiel"), Some(&1));
    }

    #[test]
    fn test_paid_totals_ignore_unpaid_factures() {
        let mut conn = setup_seeded_test_db();
        // Raw rows: the lifecycle procedures are exercised elsewhere.
        conn.batch_execute(
            r#"
            INSERT INTO tickets (id, locataire_id, regie_id, titre, description, categorie, statut)
                SELECT 1, p.id, p.regie_id, 't', 'd', 'c', 'clos' FROM profiles p WHERE p.email = 'locataire@lac.ch';
            INSERT INTO tickets (id, locataire_id, regie_id, titre, description, categorie, statut)
                SELECT 2, p.id, p.regie_id, 't', 'd', 'c', 'termine' FROM profiles p WHERE p.email = 'locataire@lac.ch';
            INSERT INTO missions (id, ticket_id, entreprise_id, statut) VALUES (1, 1, 1, 'validee'), (2, 2, 1, 'terminee');
            INSERT INTO factures (mission_id, entreprise_id, regie_id, numero, montant_ht, taux_tva_bp,
                                  montant_tva, montant_ttc, taux_commission_bp, montant_commission,
                                  statut, date_emission, date_echeance)
            VALUES (1, 1, 1, 'FAC-2025-00001', 1000, 2000, 200, 1200, 1000, 100, 'payee', '2025-01-01 00:00:00', '2025-02-01 00:00:00'),
                   (2, 1, 1, 'FAC-2025-00002', 5000, 2000, 1000, 6000, 1000, 500, 'envoyee', '2025-01-02 00:00:00', '2025-02-02 00:00:00');
            "#,
        )
        .unwrap();

        let stats = admin_stats(&mut conn).unwrap();
        assert_eq!(stats.chiffre_affaires_ttc, 1200);
        assert_eq!(stats.commissions, 100);
        assert_eq!(stats.factures_par_statut.get("envoyee"), Some(&1));
        assert_eq!(stats.missions_par_statut.get("validee"), Some(&1));
        assert_eq!(stats.tickets_par_statut.get("termine"), Some(&1));
    }
}
