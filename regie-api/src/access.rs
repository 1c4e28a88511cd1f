//! Row-level visibility rules.
//!
//! Every ORM procedure receives the calling [`Actor`] and uses the predicates
//! here to decide whether a row exists for that caller. Rows outside an
//! actor's visibility are reported as not found rather than forbidden, so
//! ids belonging to other organisations do not leak.

use crate::error::AppError;
use crate::models::{Facture, Mission, Role, Ticket};

/// The caller of a procedure, resolved from the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub profile_id: i32,
    pub role: Role,
    pub regie_id: Option<i32>,
    pub entreprise_id: Option<i32>,
    /// Set when the profile has a `techniciens` row.
    pub technicien_id: Option<i32>,
}

impl Actor {
    pub fn is_admin(&self) -> bool {
        self.role == Role::AdminJtec
    }

    /// Régie id of a régie account.
    pub fn regie(&self) -> Result<i32, AppError> {
        match (self.role, self.regie_id) {
            (Role::Regie, Some(id)) => Ok(id),
            (Role::Regie, None) => Err(AppError::forbidden("Profile is not attached to a régie")),
            _ => Err(AppError::forbidden("Only a régie may do this")),
        }
    }

    /// Entreprise id of an entreprise account.
    pub fn entreprise(&self) -> Result<i32, AppError> {
        match (self.role, self.entreprise_id) {
            (Role::Entreprise, Some(id)) => Ok(id),
            (Role::Entreprise, None) => {
                Err(AppError::forbidden("Profile is not attached to an entreprise"))
            }
            _ => Err(AppError::forbidden("Only an entreprise may do this")),
        }
    }

    /// `mission_entreprise` is the entreprise of the ticket's mission, if any.
    pub fn can_see_ticket(&self, ticket: &Ticket, mission_entreprise: Option<i32>) -> bool {
        match self.role {
            Role::AdminJtec => true,
            Role::Locataire => ticket.locataire_id == self.profile_id,
            Role::Regie => self.regie_id == Some(ticket.regie_id),
            Role::Entreprise => {
                self.entreprise_id.is_some() && mission_entreprise == self.entreprise_id
            }
            Role::Technicien => false,
        }
    }

    pub fn can_see_mission(&self, mission: &Mission, ticket: &Ticket) -> bool {
        match self.role {
            Role::AdminJtec => true,
            Role::Regie => self.regie_id == Some(ticket.regie_id),
            Role::Entreprise => self.entreprise_id == Some(mission.entreprise_id),
            Role::Technicien => {
                self.technicien_id.is_some() && mission.technicien_id == self.technicien_id
            }
            Role::Locataire => false,
        }
    }

    /// Who may read and post messages on a mission. Wider than
    /// [`Actor::can_see_mission`]: the ticket's locataire takes part too.
    pub fn is_mission_participant(&self, mission: &Mission, ticket: &Ticket) -> bool {
        match self.role {
            Role::Locataire => ticket.locataire_id == self.profile_id,
            _ => self.can_see_mission(mission, ticket),
        }
    }

    pub fn can_see_facture(&self, facture: &Facture) -> bool {
        match self.role {
            Role::AdminJtec => true,
            Role::Regie => self.regie_id == Some(facture.regie_id),
            Role::Entreprise => self.entreprise_id == Some(facture.entreprise_id),
            Role::Locataire | Role::Technicien => false,
        }
    }

    /// Régie or entreprise owning an abonnement, or admin.
    pub fn owns_subscription(&self, regie_id: Option<i32>, entreprise_id: Option<i32>) -> bool {
        match self.role {
            Role::AdminJtec => true,
            Role::Regie => regie_id.is_some() && regie_id == self.regie_id,
            Role::Entreprise => entreprise_id.is_some() && entreprise_id == self.entreprise_id,
            _ => false,
        }
    }
}
