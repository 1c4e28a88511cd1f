use std::io::{self, Write};

use diesel::{prelude::*, sqlite::SqliteConnection};
use dotenvy::dotenv;
use regex::Regex;
use regie_api::orm::entreprise::{get_entreprise, list_entreprises};
use regie_api::orm::regie::{get_regie, list_regies};
use regie_api::orm::set_foreign_keys;
use rpassword::read_password;

pub type CliResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

pub fn establish_connection() -> CliResult<SqliteConnection> {
    dotenv().ok();
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let mut conn = SqliteConnection::establish(&database_url)?;
    set_foreign_keys(&mut conn)?;
    Ok(conn)
}

/// Matches a search term against a field, as a regex unless `fixed_string`.
pub struct TermFilter {
    fixed: Option<String>,
    regex: Option<Regex>,
}

impl TermFilter {
    pub fn new(term: Option<&str>, fixed_string: bool) -> CliResult<Self> {
        Ok(match term {
            None => Self { fixed: None, regex: None },
            Some(term) if fixed_string => Self {
                fixed: Some(term.to_string()),
                regex: None,
            },
            Some(term) => Self {
                fixed: None,
                regex: Some(
                    Regex::new(term)
                        .map_err(|e| format!("Invalid regex pattern '{}': {}", term, e))?,
                ),
            },
        })
    }

    pub fn matches(&self, value: &str) -> bool {
        match (&self.fixed, &self.regex) {
            (Some(term), _) => value.contains(term.as_str()),
            (_, Some(regex)) => regex.is_match(value),
            (None, None) => true,
        }
    }
}

/// Asks a yes/no question on stdin. Anything but `y`/`yes` is a no.
pub fn confirm(question: &str) -> CliResult<bool> {
    print!("{} [y/N]: ", question);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    let input = input.trim().to_lowercase();
    Ok(input == "y" || input == "yes")
}

pub fn prompt_for_password() -> CliResult<String> {
    print!("Enter new password: ");
    io::stdout().flush()?;
    let password = read_password()?;

    if password.is_empty() {
        return Err("Password cannot be empty".into());
    }

    print!("Confirm new password: ");
    io::stdout().flush()?;
    let confirm_password = read_password()?;

    if password != confirm_password {
        return Err("Passwords do not match".into());
    }

    Ok(password)
}

/// Resolves a régie given by id or by name (case-insensitive).
pub fn resolve_regie_id(conn: &mut SqliteConnection, identifier: &str) -> CliResult<i32> {
    if let Ok(id) = identifier.parse::<i32>() {
        return match get_regie(conn, id)? {
            Some(regie) => Ok(regie.id),
            None => Err(format!("Régie with ID {} does not exist", id).into()),
        };
    }
    list_regies(conn)?
        .into_iter()
        .find(|r| r.nom.to_lowercase() == identifier.to_lowercase())
        .map(|r| r.id)
        .ok_or_else(|| format!("Régie with name '{}' does not exist", identifier).into())
}

/// Resolves an entreprise given by id or by name (case-insensitive).
pub fn resolve_entreprise_id(conn: &mut SqliteConnection, identifier: &str) -> CliResult<i32> {
    if let Ok(id) = identifier.parse::<i32>() {
        return match get_entreprise(conn, id)? {
            Some(entreprise) => Ok(entreprise.id),
            None => Err(format!("Entreprise with ID {} does not exist", id).into()),
        };
    }
    list_entreprises(conn)?
        .into_iter()
        .find(|e| e.nom.to_lowercase() == identifier.to_lowercase())
        .map(|e| e.id)
        .ok_or_else(|| format!("Entreprise with name '{}' does not exist", identifier).into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_filter() {
        let all = TermFilter::new(None, false).unwrap();
        assert!(all.matches("anything"));

        let regex = TermFilter::new(Some("^regie@.*\\.ch$"), false).unwrap();
        assert!(regex.matches("regie@lac.ch"));
        assert!(!regex.matches("locataire@lac.ch"));

        // Regex metacharacters are literal with -F
        let fixed = TermFilter::new(Some("lac.ch"), true).unwrap();
        assert!(fixed.matches("regie@lac.ch"));
        assert!(!fixed.matches("regie@lacXch"));

        assert!(TermFilter::new(Some("("), false).is_err());
    }

    #[test]
    fn test_resolve_organisations() {
        let mut conn = regie_api::orm::testing::setup_seeded_test_db();

        let lac = resolve_regie_id(&mut conn, "régie du lac").unwrap();
        assert_eq!(resolve_regie_id(&mut conn, &lac.to_string()).unwrap(), lac);
        assert!(resolve_regie_id(&mut conn, "Régie Fantôme").is_err());
        assert!(resolve_regie_id(&mut conn, "9999").is_err());

        let plomberie = resolve_entreprise_id(&mut conn, "PLOMBERIE RAPIDE").unwrap();
        assert_eq!(
            resolve_entreprise_id(&mut conn, &plomberie.to_string()).unwrap(),
            plomberie
        );
        assert!(resolve_entreprise_id(&mut conn, "Nobody SA").is_err());
    }
}
