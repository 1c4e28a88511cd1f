use clap::Subcommand;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use regie_api::billing::DEFAULT_COMMISSION_RATE_BP;
use regie_api::models::{NewEntreprise, NewProfile, NewRegie, NewTechnicien, Role};
use regie_api::orm::entreprise::{get_entreprise_by_name, insert_entreprise, list_entreprises};
use regie_api::orm::login::hash_password;
use regie_api::orm::profile::{get_profile_by_email, insert_profile};
use regie_api::orm::regie::{get_regie_by_name, insert_regie, list_regies};
use regie_api::orm::technicien::{insert_technicien, list_techniciens};

use super::utils::{CliResult, prompt_for_password, resolve_entreprise_id};

#[derive(Subcommand)]
pub enum RegieAction {
    #[command(about = "List régies")]
    Ls,
    #[command(about = "Add a régie")]
    Add {
        #[arg(short, long, help = "Régie name")]
        nom: String,
        #[arg(short, long, help = "Contact email")]
        email: Option<String>,
        #[arg(short, long, help = "Commission on invoices, in basis points (1000 = 10 %)")]
        commission_bp: Option<i32>,
    },
}

#[derive(Subcommand)]
pub enum EntrepriseAction {
    #[command(about = "List entreprises")]
    Ls,
    #[command(about = "Add an entreprise")]
    Add {
        #[arg(short, long, help = "Entreprise name")]
        nom: String,
        #[arg(short, long, help = "SIRET number")]
        siret: Option<String>,
        #[arg(short, long, help = "Contact email")]
        email: Option<String>,
    },
}

#[derive(Subcommand)]
pub enum TechnicienAction {
    #[command(about = "List techniciens, optionally of one entreprise")]
    Ls {
        #[arg(long, help = "Entreprise ID or name")]
        entreprise: Option<String>,
    },
    #[command(about = "Create a technicien login attached to an entreprise")]
    Add {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Display name")]
        nom: String,
        #[arg(long, help = "Entreprise ID or name")]
        entreprise: String,
        #[arg(short, long, help = "Phone number")]
        telephone: Option<String>,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
}

pub fn handle_regie_command_with_conn(conn: &mut SqliteConnection, action: RegieAction) -> CliResult {
    match action {
        RegieAction::Ls => list_regies_impl(conn),
        RegieAction::Add {
            nom,
            email,
            commission_bp,
        } => add_regie_impl(conn, &nom, email, commission_bp).map(|_| ()),
    }
}

pub fn handle_entreprise_command_with_conn(
    conn: &mut SqliteConnection,
    action: EntrepriseAction,
) -> CliResult {
    match action {
        EntrepriseAction::Ls => list_entreprises_impl(conn),
        EntrepriseAction::Add { nom, siret, email } => {
            add_entreprise_impl(conn, &nom, siret, email).map(|_| ())
        }
    }
}

pub fn handle_technicien_command_with_conn(
    conn: &mut SqliteConnection,
    action: TechnicienAction,
) -> CliResult {
    match action {
        TechnicienAction::Ls { entreprise } => list_techniciens_impl(conn, entreprise.as_deref()),
        TechnicienAction::Add {
            email,
            nom,
            entreprise,
            telephone,
            password,
        } => add_technicien_impl(conn, &email, &nom, &entreprise, telephone, password).map(|_| ()),
    }
}

pub fn list_regies_impl(conn: &mut SqliteConnection) -> CliResult {
    let regies = list_regies(conn)?;
    if regies.is_empty() {
        println!("No régies found.");
        return Ok(());
    }
    println!("Régies:");
    for regie in regies {
        println!(
            "  ID: {}, Nom: {}, Email: {}, Commission: {} bp",
            regie.id,
            regie.nom,
            regie.email.as_deref().unwrap_or("-"),
            regie.commission_rate_bp
        );
    }
    Ok(())
}

pub fn add_regie_impl(
    conn: &mut SqliteConnection,
    nom: &str,
    email: Option<String>,
    commission_bp: Option<i32>,
) -> CliResult<i32> {
    let nom = nom.trim();
    if nom.is_empty() {
        return Err("Régie name cannot be empty".into());
    }
    let commission_rate_bp = commission_bp.unwrap_or(DEFAULT_COMMISSION_RATE_BP);
    if !(0..=10_000).contains(&commission_rate_bp) {
        return Err(format!(
            "Commission must be between 0 and 10000 basis points, got {}",
            commission_rate_bp
        )
        .into());
    }
    if get_regie_by_name(conn, nom)?.is_some() {
        return Err(format!("Régie '{}' already exists", nom).into());
    }

    let regie = insert_regie(
        conn,
        NewRegie {
            nom: nom.to_string(),
            email: email.map(|e| e.trim().to_lowercase()),
            commission_rate_bp,
        },
    )?;
    println!("Régie created successfully!");
    println!("ID: {}", regie.id);
    println!("Nom: {}", regie.nom);
    println!("Commission: {} bp", regie.commission_rate_bp);
    Ok(regie.id)
}

pub fn list_entreprises_impl(conn: &mut SqliteConnection) -> CliResult {
    let entreprises = list_entreprises(conn)?;
    if entreprises.is_empty() {
        println!("No entreprises found.");
        return Ok(());
    }
    println!("Entreprises:");
    for entreprise in entreprises {
        println!(
            "  ID: {}, Nom: {}, SIRET: {}, Email: {}",
            entreprise.id,
            entreprise.nom,
            entreprise.siret.as_deref().unwrap_or("-"),
            entreprise.email.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

pub fn add_entreprise_impl(
    conn: &mut SqliteConnection,
    nom: &str,
    siret: Option<String>,
    email: Option<String>,
) -> CliResult<i32> {
    let nom = nom.trim();
    if nom.is_empty() {
        return Err("Entreprise name cannot be empty".into());
    }
    if get_entreprise_by_name(conn, nom)?.is_some() {
        return Err(format!("Entreprise '{}' already exists", nom).into());
    }

    let entreprise = insert_entreprise(
        conn,
        NewEntreprise {
            nom: nom.to_string(),
            siret,
            email: email.map(|e| e.trim().to_lowercase()),
        },
    )?;
    println!("Entreprise created successfully!");
    println!("ID: {}", entreprise.id);
    println!("Nom: {}", entreprise.nom);
    Ok(entreprise.id)
}

pub fn list_techniciens_impl(conn: &mut SqliteConnection, entreprise: Option<&str>) -> CliResult {
    let entreprise_id = entreprise
        .map(|e| resolve_entreprise_id(conn, e))
        .transpose()?;
    let techniciens = list_techniciens(conn, entreprise_id)?;
    if techniciens.is_empty() {
        println!("No techniciens found.");
        return Ok(());
    }
    println!("Techniciens:");
    for technicien in techniciens {
        println!(
            "  ID: {}, Nom: {}, Entreprise: {}, Téléphone: {}",
            technicien.id,
            technicien.nom,
            technicien.entreprise_id,
            technicien.telephone.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}

/// Creates the technicien's profile and its techniciens row together.
pub fn add_technicien_impl(
    conn: &mut SqliteConnection,
    email: &str,
    nom: &str,
    entreprise: &str,
    telephone: Option<String>,
    password: Option<String>,
) -> CliResult<i32> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(format!("Invalid email address '{}'", email).into());
    }
    let nom = nom.trim().to_string();
    if nom.is_empty() {
        return Err("Technicien name cannot be empty".into());
    }
    let entreprise_id = resolve_entreprise_id(conn, entreprise)?;
    if get_profile_by_email(conn, &email)?.is_some() {
        return Err(format!("A profile with email '{}' already exists", email).into());
    }

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };
    let password_hash =
        hash_password(&password).map_err(|e| format!("Failed to hash password: {}", e))?;

    let technicien = conn.transaction(|conn| {
        let profile = insert_profile(
            conn,
            NewProfile {
                email: email.clone(),
                password_hash,
                role: Role::Technicien.as_str().to_string(),
                regie_id: None,
                entreprise_id: Some(entreprise_id),
            },
        )?;
        insert_technicien(
            conn,
            NewTechnicien {
                profile_id: profile.id,
                entreprise_id,
                nom,
                telephone,
            },
        )
    })?;

    println!("Technicien created successfully!");
    println!("ID: {}", technicien.id);
    println!("Email: {}", email);
    println!("Nom: {}", technicien.nom);
    Ok(technicien.id)
}
