#[macro_use]
extern crate rocket;

use std::path::Path;

use rocket::figment::value::Map;
use rocket::figment::{
    Figment,
    providers::{Env, Format, Toml},
};
use rocket::fs::FileServer;
use rocket::request::Request;
use rocket::serde::json::{Json, Value, json};
use rocket::{Build, Rocket};

pub mod access;
pub mod admin_init_fairing;
pub mod api;
pub mod billing;
pub mod config;
pub mod envelope;
pub mod error;
pub mod logged_json;
pub mod models;
pub mod orm;
pub use orm::DbConn;
pub mod pagination;
pub mod schema;
pub mod session_guards;
pub mod workflow;

#[cfg(test)]
pub mod generate_types;

pub use orm::MIGRATIONS;

fn error_body(reason: &str, req: &Request, status: u16) -> Json<Value> {
    Json(json!({
        "success": false,
        "error": reason,
        "path": req.uri().path().to_string(),
        "status": status
    }))
}

#[catch(400)]
fn bad_request(req: &Request) -> Json<Value> {
    error_body("Bad Request", req, 400)
}

#[catch(401)]
fn unauthorized(req: &Request) -> Json<Value> {
    error_body("Unauthorized", req, 401)
}

#[catch(403)]
fn forbidden(req: &Request) -> Json<Value> {
    error_body("Forbidden", req, 403)
}

#[catch(404)]
fn not_found(req: &Request) -> Json<Value> {
    error_body("Not Found", req, 404)
}

#[catch(405)]
fn method_not_allowed(req: &Request) -> Json<Value> {
    error_body("Method Not Allowed", req, 405)
}

#[catch(422)]
fn unprocessable_entity(req: &Request) -> Json<Value> {
    error_body("Unprocessable Entity", req, 422)
}

#[catch(500)]
fn internal_server_error(req: &Request) -> Json<Value> {
    error_body("Internal Server Error", req, 500)
}

#[catch(default)]
fn default_catcher(status: rocket::http::Status, req: &Request) -> Json<Value> {
    error_body(status.reason().unwrap_or("Unknown Error"), req, status.code)
}

/// Registers the JSON error catchers shared by production and test builds.
pub fn register_catchers(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.register(
        "/",
        catchers![
            bad_request,
            unauthorized,
            forbidden,
            not_found,
            method_not_allowed,
            unprocessable_entity,
            internal_server_error,
            default_catcher
        ],
    )
}

pub fn mount_api_routes(rocket: Rocket<Build>) -> Rocket<Build> {
    rocket.mount("/api", api::routes())
}

fn log_rocket_info(rocket: &Rocket<Build>) {
    let figment = rocket.figment();

    if let Ok(address) = figment.extract_inner::<String>("address") {
        info!("Rocket is running at: {}", address);
    }

    if let Ok(port) = figment.extract_inner::<u16>("port") {
        info!("Rocket is listening on port: {}", port);
    }

    match figment.extract_inner::<Map<String, Value>>("databases.regie_db") {
        Ok(db_config) => {
            if let Some(Value::String(url)) = db_config.get("url") {
                info!("Database URL: {}", url);
            } else {
                warn!("Database URL not found in configuration");
            }
        }
        Err(e) => {
            warn!("Failed to extract database configuration: {}", e);
        }
    }
}

/// Builds the production Rocket instance.
///
/// Configuration is layered: Rocket defaults, then `Rocket.toml`, then
/// `ROCKET_*` environment variables, then the database URL passed in by
/// the caller. Tests build their own instance in `orm::testing`.
pub fn rocket(database_url: String) -> Rocket<Build> {
    let figment = Figment::from(rocket::Config::default())
        .merge(Toml::file("Rocket.toml").nested())
        .merge(Env::prefixed("ROCKET_").global())
        .merge(("databases.regie_db.url", database_url));

    let rocket = rocket::custom(figment)
        .attach(DbConn::fairing())
        .attach(orm::set_foreign_keys_fairing())
        .attach(orm::run_migrations_fairing())
        .attach(config::app_config_fairing())
        .attach(admin_init_fairing::admin_init_fairing());
    let rocket = register_catchers(rocket);

    log_rocket_info(&rocket);

    let rocket = mount_api_routes(rocket);
    let static_dir = std::env::var("REGIE_STATIC_DIR").unwrap_or_else(|_| "static".to_string());
    if Path::new(&static_dir).is_dir() {
        rocket.mount("/", FileServer::from(static_dir).rank(10))
    } else {
        info!("Static directory '{}' not found, serving API only", static_dir);
        rocket
    }
}
