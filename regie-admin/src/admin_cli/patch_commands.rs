use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use regie_api::billing::format_cents;
use regie_api::orm::facture::recompute_factures;

use super::utils::CliResult;

#[derive(Subcommand)]
pub enum PatchAction {
    #[command(about = "Recompute TVA, TTC and commission of unpaid factures")]
    RecomputeFactures {
        #[arg(long, help = "Report changes without writing them")]
        dry_run: bool,
    },
}

pub fn handle_patch_command_with_conn(
    conn: &mut SqliteConnection,
    action: PatchAction,
) -> CliResult {
    match action {
        PatchAction::RecomputeFactures { dry_run } => recompute_factures_impl(conn, dry_run),
    }
}

pub fn recompute_factures_impl(conn: &mut SqliteConnection, dry_run: bool) -> CliResult {
    let changes = recompute_factures(conn, dry_run)?;

    if changes.is_empty() {
        println!("All unpaid factures are consistent.");
        return Ok(());
    }

    for change in &changes {
        println!(
            "{} (id {}): tva {} -> {}, ttc {} -> {}, commission {} -> {}",
            change.numero,
            change.facture_id,
            format_cents(change.before.montant_tva),
            format_cents(change.after.montant_tva),
            format_cents(change.before.montant_ttc),
            format_cents(change.after.montant_ttc),
            format_cents(change.before.montant_commission),
            format_cents(change.after.montant_commission),
        );
    }
    if dry_run {
        println!("{} facture(s) would change (dry run, nothing written).", changes.len());
    } else {
        println!("Updated {} facture(s).", changes.len());
    }
    Ok(())
}
