use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use diesel_migrations::MigrationHarness;
use regie_api::MIGRATIONS;

use super::utils::CliResult;

#[derive(Subcommand)]
pub enum MigrateAction {
    #[command(about = "List applied and pending migrations")]
    Status,
    #[command(about = "Apply all pending migrations")]
    Run,
    #[command(about = "Revert the most recent migration")]
    Revert,
}

pub fn handle_migrate_command_with_conn(
    conn: &mut SqliteConnection,
    action: MigrateAction,
) -> CliResult {
    match action {
        MigrateAction::Status => migrate_status_impl(conn),
        MigrateAction::Run => migrate_run_impl(conn),
        MigrateAction::Revert => migrate_revert_impl(conn),
    }
}

/// Applied and pending migration versions, oldest first.
pub fn migration_versions(conn: &mut SqliteConnection) -> CliResult<(Vec<String>, Vec<String>)> {
    let mut applied: Vec<String> = conn
        .applied_migrations()
        .map_err(|e| format!("Failed to read applied migrations: {}", e))?
        .iter()
        .map(|v| v.to_string())
        .collect();
    applied.sort();

    let pending: Vec<String> = conn
        .pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Failed to read pending migrations: {}", e))?
        .iter()
        .map(|m| m.name().version().to_string())
        .collect();

    Ok((applied, pending))
}

pub fn migrate_status_impl(conn: &mut SqliteConnection) -> CliResult {
    let (applied, pending) = migration_versions(conn)?;

    println!("Applied migrations ({}):", applied.len());
    for version in &applied {
        println!("  [x] {}", version);
    }
    println!("Pending migrations ({}):", pending.len());
    for version in &pending {
        println!("  [ ] {}", version);
    }
    Ok(())
}

pub fn migrate_run_impl(conn: &mut SqliteConnection) -> CliResult {
    let versions = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| format!("Failed to run migrations: {}", e))?;

    if versions.is_empty() {
        println!("Database is up to date.");
    } else {
        for version in &versions {
            println!("Applied {}", version);
        }
        println!("Applied {} migration(s).", versions.len());
    }
    Ok(())
}

pub fn migrate_revert_impl(conn: &mut SqliteConnection) -> CliResult {
    let version = conn
        .revert_last_migration(MIGRATIONS)
        .map_err(|e| format!("Failed to revert migration: {}", e))?;
    println!("Reverted {}", version);
    Ok(())
}
