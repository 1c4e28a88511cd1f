//! Test helpers: in-memory databases, an async connection shim and a fully
//! wired Rocket instance seeded with a fixed set of organisations and
//! accounts.
//!
//! Fixture accounts (all with password [`TEST_PASSWORD`]):
//!
//! | email | role | organisation |
//! |---|---|---|
//! | regie@lac.ch | regie | Régie du Lac |
//! | regie@montagne.ch | regie | Régie Montagne |
//! | locataire@lac.ch | locataire | Régie du Lac |
//! | locataire2@montagne.ch | locataire | Régie Montagne |
//! | orphan@locataire.ch | locataire | none |
//! | entreprise@plomberie.ch | entreprise | Plomberie Rapide |
//! | entreprise@electricite.ch | entreprise | Électricité Générale |
//! | tech@plomberie.ch | technicien | Plomberie Rapide |
//! | tech@electricite.ch | technicien | Électricité Générale |
//!
//! The administrator comes from the admin-init fairing
//! (`admin@regie.local` / `admin` unless overridden by the environment).
//! Régie du Lac holds an active `essentiel` abonnement.

use std::sync::Mutex;

use chrono::Utc;
use diesel::connection::SimpleConnection;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use rocket::figment::{
    util::map,
    value::{Map, Value},
};
use rocket::{Build, Rocket, fairing::AdHoc};

use super::db::{DbConn, run_pending_migrations, set_foreign_keys};
use crate::access::Actor;
use crate::admin_init_fairing::admin_init_fairing;
use crate::config::app_config_fairing;
use crate::models::{
    NewAbonnement, NewEntreprise, NewProfile, NewRegie, NewTechnicien, Role,
};
use crate::orm::entreprise::{get_entreprise_by_name, insert_entreprise};
use crate::orm::login::hash_password;
use crate::orm::profile::{get_profile_by_email, insert_profile, load_actor};
use crate::orm::regie::{get_regie_by_name, insert_regie};
use crate::orm::technicien::insert_technicien;
use crate::schema::abonnements;

pub const TEST_PASSWORD: &str = "password";

/// Disables synchronous writes and the rollback journal. Only for tests.
fn set_sqlite_test_pragmas(conn: &mut SqliteConnection) -> QueryResult<()> {
    conn.batch_execute(
        r#"
        PRAGMA synchronous = OFF;
        PRAGMA journal_mode = OFF;
        "#,
    )
}

fn set_sqlite_test_pragmas_fairing() -> AdHoc {
    AdHoc::on_ignite("Set SQLite Test Pragmas", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test pragmas");
        conn.run(set_sqlite_test_pragmas)
            .await
            .expect("Failed to set SQLite PRAGMAs");
        rocket
    })
}

fn test_data_init_fairing() -> AdHoc {
    AdHoc::on_ignite("Test Data Initialization", |rocket| async {
        let conn = DbConn::get_one(&rocket)
            .await
            .expect("database connection for test data initialization");

        conn.run(|c| {
            if let Err(e) = create_test_data(c) {
                eprintln!("[test-data-init] ERROR: Failed to create test data: {:?}", e);
            }
        })
        .await;

        rocket
    })
}

struct FixtureProfile {
    email: &'static str,
    role: Role,
    regie: Option<&'static str>,
    entreprise: Option<&'static str>,
    technicien_nom: Option<&'static str>,
}

const FIXTURE_PROFILES: &[FixtureProfile] = &[
    FixtureProfile { email: "regie@lac.ch", role: Role::Regie, regie: Some("Régie du Lac"), entreprise: None, technicien_nom: None },
    FixtureProfile { email: "regie@montagne.ch", role: Role::Regie, regie: Some("Régie Montagne"), entreprise: None, technicien_nom: None },
    FixtureProfile { email: "locataire@lac.ch", role: Role::Locataire, regie: Some("Régie du Lac"), entreprise: None, technicien_nom: None },
    FixtureProfile { email: "locataire2@montagne.ch", role: Role::Locataire, regie: Some("Régie Montagne"), entreprise: None, technicien_nom: None },
    FixtureProfile { email: "orphan@locataire.ch", role: Role::Locataire, regie: None, entreprise: None, technicien_nom: None },
    FixtureProfile { email: "entreprise@plomberie.ch", role: Role::Entreprise, regie: None, entreprise: Some("Plomberie Rapide"), technicien_nom: None },
    FixtureProfile { email: "entreprise@electricite.ch", role: Role::Entreprise, regie: None, entreprise: Some("Électricité Générale"), technicien_nom: None },
    FixtureProfile { email: "tech@plomberie.ch", role: Role::Technicien, regie: None, entreprise: Some("Plomberie Rapide"), technicien_nom: Some("Paul Tuyau") },
    FixtureProfile { email: "tech@electricite.ch", role: Role::Technicien, regie: None, entreprise: Some("Électricité Générale"), technicien_nom: Some("Élodie Volt") },
];

fn find_or_create_regie(
    conn: &mut SqliteConnection,
    nom: &str,
    commission_rate_bp: i32,
) -> QueryResult<i32> {
    if let Some(regie) = get_regie_by_name(conn, nom)? {
        return Ok(regie.id);
    }
    insert_regie(
        conn,
        NewRegie {
            nom: nom.to_string(),
            email: None,
            commission_rate_bp,
        },
    )
    .map(|r| r.id)
}

fn find_or_create_entreprise(conn: &mut SqliteConnection, nom: &str) -> QueryResult<i32> {
    if let Some(entreprise) = get_entreprise_by_name(conn, nom)? {
        return Ok(entreprise.id);
    }
    insert_entreprise(
        conn,
        NewEntreprise {
            nom: nom.to_string(),
            siret: None,
            email: None,
        },
    )
    .map(|e| e.id)
}

/// Creates the standard fixture set. Safe to run twice.
pub fn create_test_data(conn: &mut SqliteConnection) -> QueryResult<()> {
    let lac = find_or_create_regie(conn, "Régie du Lac", 1000)?;
    find_or_create_regie(conn, "Régie Montagne", 1500)?;
    find_or_create_entreprise(conn, "Plomberie Rapide")?;
    find_or_create_entreprise(conn, "Électricité Générale")?;

    // One hash for every fixture account keeps seeding fast.
    let password_hash = hash_password(TEST_PASSWORD).expect("hash test password");

    for fixture in FIXTURE_PROFILES {
        if get_profile_by_email(conn, fixture.email)?.is_some() {
            continue;
        }
        let regie_id = match fixture.regie {
            Some(nom) => get_regie_by_name(conn, nom)?.map(|r| r.id),
            None => None,
        };
        let entreprise_id = match fixture.entreprise {
            Some(nom) => get_entreprise_by_name(conn, nom)?.map(|e| e.id),
            None => None,
        };
        let profile = insert_profile(
            conn,
            NewProfile {
                email: fixture.email.to_string(),
                password_hash: password_hash.clone(),
                role: fixture.role.as_str().to_string(),
                regie_id,
                entreprise_id,
            },
        )?;
        if let (Some(nom), Some(entreprise_id)) = (fixture.technicien_nom, entreprise_id) {
            insert_technicien(
                conn,
                NewTechnicien {
                    profile_id: profile.id,
                    entreprise_id,
                    nom: nom.to_string(),
                    telephone: None,
                },
            )?;
        }
    }

    let has_abonnement: i64 = abonnements::table
        .filter(abonnements::regie_id.eq(lac))
        .count()
        .get_result(conn)?;
    if has_abonnement == 0 {
        diesel::insert_into(abonnements::table)
            .values(&NewAbonnement {
                regie_id: Some(lac),
                entreprise_id: None,
                plan_code: "essentiel".to_string(),
                date_debut: Utc::now().naive_utc(),
            })
            .execute(conn)?;
    }

    Ok(())
}

/// Builds a Rocket instance over a uniquely named shared-cache in-memory
/// database, with every production fairing plus the fixture seeding.
pub fn test_rocket() -> Rocket<Build> {
    use uuid::Uuid;

    let unique_db_name = format!("file:test_db_{}?mode=memory&cache=shared", Uuid::new_v4());

    let db_config: Map<_, Value> = map! {
        "url" => unique_db_name.into(),
        "pool_size" => 5.into(),
        "timeout" => 5.into(),
    };

    let figment = rocket::Config::figment()
        .merge(("databases", map!["regie_db" => db_config]))
        .merge(("log_level", "critical"));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(super::db::set_foreign_keys_fairing())
        .attach(set_sqlite_test_pragmas_fairing())
        .attach(super::db::run_migrations_fairing())
        .attach(app_config_fairing())
        .attach(admin_init_fairing())
        .attach(test_data_init_fairing());

    crate::mount_api_routes(crate::register_catchers(rocket))
}

/// A fresh in-memory database with foreign keys on and all migrations run.
pub fn setup_test_db() -> SqliteConnection {
    let mut conn = SqliteConnection::establish(":memory:")
        .expect("Failed to create in-memory SQLite database");
    set_foreign_keys(&mut conn).expect("Failed to enable foreign keys");
    run_pending_migrations(&mut conn).expect("Failed to run migrations");
    conn
}

/// Same as [`setup_test_db`], with the fixture set loaded. There is no
/// administrator in this database.
pub fn setup_seeded_test_db() -> SqliteConnection {
    let mut conn = setup_test_db();
    create_test_data(&mut conn).expect("Failed to create test data");
    conn
}

/// Resolves a fixture account to its [`Actor`].
pub fn actor_for(conn: &mut SqliteConnection, email: &str) -> Actor {
    let profile = get_profile_by_email(conn, email)
        .expect("profile lookup")
        .unwrap_or_else(|| panic!("fixture profile '{}' should exist", email));
    load_actor(conn, &profile).expect("actor")
}

/// Async `.run()` wrapper around a borrowed connection, so code written
/// against [`crate::orm::login::DbRunner`] can be unit tested.
pub struct FakeDbConn<'a>(Mutex<&'a mut SqliteConnection>);

impl<'a> FakeDbConn<'a> {
    pub async fn run<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut SqliteConnection) -> R + Send + 'static,
        R: Send + 'static,
    {
        let mut conn = self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut **conn)
    }
}

pub fn setup_test_dbconn(conn: &mut SqliteConnection) -> FakeDbConn<'_> {
    FakeDbConn(Mutex::new(conn))
}
