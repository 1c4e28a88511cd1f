use diesel::prelude::*;
use dotenvy::dotenv;
use rocket::Rocket;
use rocket::fairing::AdHoc;

use crate::error::AppError;
use crate::models::{NewProfile, Role};
use crate::orm::DbConn;
use crate::orm::login::hash_password;
use crate::orm::profile::{get_profile_by_email, insert_profile};

/// Creates the platform administrator on first ignition.
///
/// The account comes from `REGIE_DEFAULT_EMAIL` and `REGIE_DEFAULT_PASSWORD`
/// (defaults `admin@regie.local` / `admin`) and gets the `admin_jtec` role.
pub fn admin_init_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Admin User Initialization", |rocket| async {
        dotenv().ok();

        let conn = match get_db_connection(&rocket).await {
            Some(conn) => conn,
            None => return Err(rocket),
        };

        let admin_email = get_admin_email();
        let admin_password = get_admin_password();
        match conn
            .run(move |c| create_admin_if_needed(c, &admin_email, &admin_password))
            .await
        {
            Ok(()) => Ok(rocket),
            Err(e) => {
                error!("[admin-init] FATAL: Admin profile creation failed: {}", e);
                Err(rocket)
            }
        }
    })
}

async fn get_db_connection(rocket: &Rocket<rocket::Build>) -> Option<DbConn> {
    match DbConn::get_one(rocket).await {
        Some(conn) => Some(conn),
        None => {
            error!("[admin-init] ERROR: Could not get DB connection.");
            None
        }
    }
}

fn get_admin_email() -> String {
    std::env::var("REGIE_DEFAULT_EMAIL")
        .map(|e| e.trim().to_lowercase())
        .unwrap_or_else(|_| "admin@regie.local".to_string())
}

fn get_admin_password() -> String {
    std::env::var("REGIE_DEFAULT_PASSWORD").unwrap_or_else(|_| "admin".to_string())
}

fn create_admin_if_needed(
    c: &mut SqliteConnection,
    admin_email: &str,
    admin_password: &str,
) -> Result<(), AppError> {
    if let Some(existing) = get_profile_by_email(c, admin_email)? {
        if existing.role != Role::AdminJtec.as_str() {
            warn!(
                "[admin-init] Profile '{}' exists with role '{}', not admin_jtec",
                admin_email, existing.role
            );
        } else {
            info!("[admin-init] Admin profile '{}' already exists", admin_email);
        }
        return Ok(());
    }

    let password_hash = hash_password(admin_password)
        .map_err(|e| AppError::Internal(format!("hashing admin password: {}", e)))?;
    let profile = insert_profile(
        c,
        NewProfile {
            email: admin_email.to_string(),
            password_hash,
            role: Role::AdminJtec.as_str().to_string(),
            regie_id: None,
            entreprise_id: None,
        },
    )?;
    info!("[admin-init] Created admin profile '{}' (id {})", admin_email, profile.id);
    Ok(())
}
