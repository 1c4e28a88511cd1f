pub mod abonnement;
pub mod entreprise;
pub mod facture;
pub mod message;
pub mod mission;
pub mod notification;
pub mod profile;
pub mod regie;
pub mod role;
pub mod session;
pub mod stats;
pub mod technicien;
pub mod ticket;

// Re-export models for easier access
pub use abonnement::*;
pub use entreprise::*;
pub use facture::*;
pub use message::*;
pub use mission::*;
pub use notification::*;
pub use profile::*;
pub use regie::*;
pub use role::*;
pub use session::*;
pub use stats::*;
pub use technicien::*;
pub use ticket::*;
