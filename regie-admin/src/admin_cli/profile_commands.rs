use clap::Subcommand;
use diesel::sqlite::SqliteConnection;
use regie_api::models::{NewProfile, Role};
use regie_api::orm::login::{hash_password, revoke_profile_sessions};
use regie_api::orm::profile::{
    delete_profile, get_profile_by_email, insert_profile, list_profiles, update_password_hash,
};

use super::utils::{
    CliResult, TermFilter, confirm, prompt_for_password, resolve_entreprise_id, resolve_regie_id,
};

#[derive(Subcommand)]
pub enum ProfileAction {
    #[command(about = "List profiles, optionally filtered by search term")]
    Ls {
        #[arg(help = "Search term (regex by default, use -F for fixed string)")]
        search_term: Option<String>,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
    },
    #[command(about = "Add a profile (use `technicien add` for techniciens)")]
    Add {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "Role: locataire, regie, entreprise or admin_jtec")]
        role: String,
        #[arg(short, long, help = "Password (will be prompted securely if not provided)")]
        password: Option<String>,
        #[arg(long, help = "Régie ID or name")]
        regie: Option<String>,
        #[arg(long, help = "Entreprise ID or name")]
        entreprise: Option<String>,
    },
    #[command(about = "Change a profile's password and revoke its sessions")]
    SetPassword {
        #[arg(short, long, help = "Email address")]
        email: String,
        #[arg(short, long, help = "New password (will be prompted securely if not provided)")]
        password: Option<String>,
    },
    #[command(about = "Remove profiles matching search term")]
    Rm {
        #[arg(help = "Search term to match profiles for removal (regex by default, use -F for fixed string)")]
        search_term: String,
        #[arg(short = 'F', long = "fixed-string", help = "Treat search term as fixed string instead of regex")]
        fixed_string: bool,
        #[arg(short = 'y', long = "yes", help = "Skip confirmation prompt")]
        yes: bool,
    },
}

pub fn handle_profile_command_with_conn(
    conn: &mut SqliteConnection,
    action: ProfileAction,
) -> CliResult {
    match action {
        ProfileAction::Ls {
            search_term,
            fixed_string,
        } => list_profiles_impl(conn, search_term.as_deref(), fixed_string),
        ProfileAction::Add {
            email,
            role,
            password,
            regie,
            entreprise,
        } => add_profile_impl(
            conn,
            &email,
            &role,
            password,
            regie.as_deref(),
            entreprise.as_deref(),
        )
        .map(|_| ()),
        ProfileAction::SetPassword { email, password } => {
            set_password_impl(conn, &email, password)
        }
        ProfileAction::Rm {
            search_term,
            fixed_string,
            yes,
        } => remove_profiles_impl(conn, &search_term, fixed_string, yes).map(|_| ()),
    }
}

pub fn list_profiles_impl(
    conn: &mut SqliteConnection,
    search_term: Option<&str>,
    fixed_string: bool,
) -> CliResult {
    let filter = TermFilter::new(search_term, fixed_string)?;
    let profiles: Vec<_> = list_profiles(conn)?
        .into_iter()
        .filter(|p| filter.matches(&p.email))
        .collect();

    if profiles.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    println!("Profiles:");
    for profile in profiles {
        println!(
            "  ID: {}, Email: {}, Role: {}, Régie: {}, Entreprise: {}, Created: {}",
            profile.id,
            profile.email,
            profile.role,
            profile.regie_id.map_or("-".to_string(), |id| id.to_string()),
            profile.entreprise_id.map_or("-".to_string(), |id| id.to_string()),
            profile.created_at
        );
    }
    Ok(())
}

/// Creates a profile and returns its id. Régie accounts need a régie and
/// entreprise accounts an entreprise; locataires may have a régie.
pub fn add_profile_impl(
    conn: &mut SqliteConnection,
    email: &str,
    role: &str,
    password: Option<String>,
    regie: Option<&str>,
    entreprise: Option<&str>,
) -> CliResult<i32> {
    let role: Role = role.parse()?;
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(format!("Invalid email address '{}'", email).into());
    }
    if get_profile_by_email(conn, &email)?.is_some() {
        return Err(format!("A profile with email '{}' already exists", email).into());
    }

    let regie_id = regie.map(|r| resolve_regie_id(conn, r)).transpose()?;
    let entreprise_id = entreprise.map(|e| resolve_entreprise_id(conn, e)).transpose()?;
    match role {
        Role::Regie if regie_id.is_none() => {
            return Err("A régie profile needs --regie".into());
        }
        Role::Entreprise if entreprise_id.is_none() => {
            return Err("An entreprise profile needs --entreprise".into());
        }
        Role::Technicien => {
            return Err("Use `technicien add` to create technicien profiles".into());
        }
        _ => {}
    }
    if regie_id.is_some() && !matches!(role, Role::Regie | Role::Locataire) {
        return Err(format!("Role {} cannot belong to a régie", role).into());
    }
    if entreprise_id.is_some() && role != Role::Entreprise {
        return Err(format!("Role {} cannot belong to an entreprise", role).into());
    }

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };
    let password_hash =
        hash_password(&password).map_err(|e| format!("Failed to hash password: {}", e))?;

    let profile = insert_profile(
        conn,
        NewProfile {
            email,
            password_hash,
            role: role.as_str().to_string(),
            regie_id,
            entreprise_id,
        },
    )?;

    println!("Profile created successfully!");
    println!("ID: {}", profile.id);
    println!("Email: {}", profile.email);
    println!("Role: {}", profile.role);
    Ok(profile.id)
}

pub fn set_password_impl(
    conn: &mut SqliteConnection,
    email: &str,
    password: Option<String>,
) -> CliResult {
    let profile = get_profile_by_email(conn, &email.trim().to_lowercase())?
        .ok_or_else(|| format!("Profile with email '{}' not found", email))?;

    let password = match password {
        Some(p) => p,
        None => prompt_for_password()?,
    };
    let password_hash =
        hash_password(&password).map_err(|e| format!("Failed to hash password: {}", e))?;

    update_password_hash(conn, profile.id, &password_hash)?;
    let revoked = revoke_profile_sessions(conn, profile.id)?;
    println!(
        "Password changed successfully for {} ({} session(s) revoked)",
        profile.email, revoked
    );
    Ok(())
}

/// Deletes matching profiles and returns how many went. Profiles still
/// referenced by tickets or messages cannot be deleted and are reported.
pub fn remove_profiles_impl(
    conn: &mut SqliteConnection,
    search_term: &str,
    fixed_string: bool,
    yes: bool,
) -> CliResult<usize> {
    let filter = TermFilter::new(Some(search_term), fixed_string)?;
    let matching: Vec<_> = list_profiles(conn)?
        .into_iter()
        .filter(|p| filter.matches(&p.email))
        .collect();

    if matching.is_empty() {
        println!("No profiles found matching the search term.");
        return Ok(0);
    }

    println!("Found {} profile(s) matching the search term:", matching.len());
    for profile in &matching {
        println!("  ID: {}, Email: {}, Role: {}", profile.id, profile.email, profile.role);
    }

    if !yes
        && !confirm(&format!(
            "Are you sure you want to delete these {} profile(s)?",
            matching.len()
        ))?
    {
        println!("Operation cancelled.");
        return Ok(0);
    }

    let mut deleted_count = 0;
    let mut errors = Vec::new();
    for profile in matching {
        match delete_profile(conn, profile.id) {
            Ok(rows) if rows > 0 => {
                deleted_count += 1;
                println!("Deleted profile: {} (ID: {})", profile.email, profile.id);
            }
            Ok(_) => {}
            Err(e) => errors.push(format!(
                "Failed to delete profile {} (ID: {}): {}",
                profile.email, profile.id, e
            )),
        }
    }

    println!("Successfully deleted {} profile(s).", deleted_count);
    if !errors.is_empty() {
        eprintln!("Errors encountered:");
        for error in errors {
            eprintln!("  {}", error);
        }
        return Err("Some deletions failed".into());
    }
    Ok(deleted_count)
}
