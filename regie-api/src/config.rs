//! Application settings read from the Rocket figment.
//!
//! Settings live under the `app` key, so they can be set in `Rocket.toml`
//! (`[default.app]`) or through the environment (`ROCKET_APP={tva_rate_bp=810}`).
//! Every field has a default, so a missing `app` table is not an error.

use rocket::fairing::AdHoc;
use rocket::figment::Figment;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

// Upper bounds accepted by `AppConfig::validate`, ten years each.
pub const MAX_SESSION_TTL_HOURS: i64 = 24 * 365 * 10;
pub const MAX_PAYMENT_TERMS_DAYS: i64 = 365 * 10;

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub name: String,
    pub environment: String,
    pub public_url: Option<String>,
    pub support_email: Option<String>,
    /// VAT applied to new invoices, in basis points.
    pub tva_rate_bp: i32,
    /// Bearer session lifetime. Zero disables expiry.
    pub session_ttl_hours: i64,
    pub payment_terms_days: i64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: "Régie".to_string(),
            environment: "development".to_string(),
            public_url: None,
            support_email: None,
            tva_rate_bp: 2000,
            session_ttl_hours: 24,
            payment_terms_days: 30,
        }
    }
}

/// Subset of the settings that front ends may read without authenticating.
#[derive(Debug, Serialize, TS)]
#[ts(export)]
pub struct PublicConfig {
    pub name: String,
    pub environment: String,
    pub public_url: Option<String>,
    pub support_email: Option<String>,
    pub tva_rate_bp: i32,
    pub api_version: &'static str,
}

impl AppConfig {
    pub fn from_figment(figment: &Figment) -> Result<Self, rocket::figment::Error> {
        if figment.contains("app") {
            figment.extract_inner("app")
        } else {
            Ok(Self::default())
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if !(0..=10_000).contains(&self.tva_rate_bp) {
            return Err(format!(
                "app.tva_rate_bp must be between 0 and 10000, got {}",
                self.tva_rate_bp
            ));
        }
        if !(0..=MAX_SESSION_TTL_HOURS).contains(&self.session_ttl_hours) {
            return Err(format!(
                "app.session_ttl_hours must be between 0 and {}, got {}",
                MAX_SESSION_TTL_HOURS, self.session_ttl_hours
            ));
        }
        if !(0..=MAX_PAYMENT_TERMS_DAYS).contains(&self.payment_terms_days) {
            return Err(format!(
                "app.payment_terms_days must be between 0 and {}, got {}",
                MAX_PAYMENT_TERMS_DAYS, self.payment_terms_days
            ));
        }
        Ok(())
    }

    pub fn public(&self) -> PublicConfig {
        PublicConfig {
            name: self.name.clone(),
            environment: self.environment.clone(),
            public_url: self.public_url.clone(),
            support_email: self.support_email.clone(),
            tva_rate_bp: self.tva_rate_bp,
            api_version: "1",
        }
    }
}

/// Extracts `AppConfig` from the figment and places it in managed state.
pub fn app_config_fairing() -> AdHoc {
    AdHoc::try_on_ignite("Application Config", |rocket| async {
        let config = match AppConfig::from_figment(rocket.figment()) {
            Ok(config) => config,
            Err(e) => {
                error!("[config] invalid `app` configuration: {}", e);
                return Err(rocket);
            }
        };
        if let Err(e) = config.validate() {
            error!("[config] {}", e);
            return Err(rocket);
        }
        info!(
            "[config] {} ({}) tva={}bp session_ttl={}h",
            config.name, config.environment, config.tva_rate_bp, config.session_ttl_hours
        );
        Ok(rocket.manage(config))
    })
}
