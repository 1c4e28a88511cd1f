mod admin_cli;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use admin_cli::audit_commands::{AuditAction, handle_audit_command_with_conn};
use admin_cli::migrate_commands::{MigrateAction, handle_migrate_command_with_conn};
use admin_cli::org_commands::{
    EntrepriseAction, RegieAction, TechnicienAction, handle_entreprise_command_with_conn,
    handle_regie_command_with_conn, handle_technicien_command_with_conn,
};
use admin_cli::patch_commands::{PatchAction, handle_patch_command_with_conn};
use admin_cli::profile_commands::{ProfileAction, handle_profile_command_with_conn};
use admin_cli::sql_commands::{SqlAction, handle_sql_command_with_conn};
use admin_cli::system_commands::{SystemAction, handle_system_command};
use admin_cli::utils::{CliResult, establish_connection};

mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

#[derive(Parser)]
#[command(name = "regie-admin")]
#[command(about = "Administration tool for the régie database")]
#[command(version)]
struct Cli {
    /// Show extended version information
    #[arg(long, action = clap::ArgAction::SetTrue)]
    version_info: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Inspect and apply schema migrations")]
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    #[command(about = "Run SQL scripts against the database")]
    Sql {
        #[command(subcommand)]
        action: SqlAction,
    },
    #[command(about = "Check schema and data consistency")]
    Audit {
        #[command(subcommand)]
        action: AuditAction,
    },
    #[command(about = "Repair stored data")]
    Patch {
        #[command(subcommand)]
        action: PatchAction,
    },
    #[command(about = "Profile (login account) management")]
    Profile {
        #[command(subcommand)]
        action: ProfileAction,
    },
    #[command(about = "Régie management")]
    Regie {
        #[command(subcommand)]
        action: RegieAction,
    },
    #[command(about = "Entreprise management")]
    Entreprise {
        #[command(subcommand)]
        action: EntrepriseAction,
    },
    #[command(about = "Technicien management")]
    Technicien {
        #[command(subcommand)]
        action: TechnicienAction,
    },
    #[command(about = "Talk to a running server")]
    System {
        #[command(subcommand)]
        action: SystemAction,
    },
}

fn print_version_info() {
    println!("regie-admin {}", built_info::PKG_VERSION);
    println!("Built: {}", built_info::BUILT_TIME_UTC);
    if let Some(commit) = built_info::GIT_COMMIT_HASH {
        println!("Git commit: {}", commit);
    }
    println!("Target: {}", built_info::TARGET);
}

fn run(command: Commands) -> CliResult {
    match command {
        Commands::System { action } => handle_system_command(action),
        Commands::Migrate { action } => {
            handle_migrate_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::Sql { action } => handle_sql_command_with_conn(&mut establish_connection()?, action),
        Commands::Audit { action } => {
            handle_audit_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::Patch { action } => {
            handle_patch_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::Profile { action } => {
            handle_profile_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::Regie { action } => {
            handle_regie_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::Entreprise { action } => {
            handle_entreprise_command_with_conn(&mut establish_connection()?, action)
        }
        Commands::Technicien { action } => {
            handle_technicien_command_with_conn(&mut establish_connection()?, action)
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if cli.version_info {
        print_version_info();
        return ExitCode::SUCCESS;
    }

    let Some(command) = cli.command else {
        eprintln!("No command given. Run `regie-admin --help` for usage.");
        return ExitCode::FAILURE;
    };

    match run(command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
