pub mod abonnement;
mod db;
pub mod entreprise;
pub mod facture;
pub mod health;
pub mod login;
pub mod message;
pub mod mission;
pub mod notification;
pub mod profile;
pub mod regie;
pub mod stats;
pub mod technicien;
#[cfg(any(test, feature = "test-staging"))]
pub mod testing;
pub mod ticket;

pub use db::*;
