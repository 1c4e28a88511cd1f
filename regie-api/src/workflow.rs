//! Status enums and transition tables for tickets, missions, factures and
//! abonnements.
//!
//! Statuses are stored as lowercase text in the database. The tables below
//! are the only place allowed transitions are defined; the ORM procedures
//! call [`ensure_transition`] before writing a new status.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::AppError;

/// A status column with a fixed transition table.
pub trait Lifecycle: Copy + PartialEq + FromStr + fmt::Display {
    const ENTITY: &'static str;

    fn as_str(&self) -> &'static str;

    fn can_transition(self, to: Self) -> bool;

    /// Parses a value read back from the database. CHECK constraints make a
    /// failure here an internal error rather than bad input.
    fn from_stored(value: &str) -> Result<Self, AppError> {
        value.parse().map_err(|_| {
            AppError::Internal(format!("unknown {} status '{}' in database", Self::ENTITY, value))
        })
    }
}

pub fn ensure_transition<S: Lifecycle>(from: S, to: S) -> Result<(), AppError> {
    if from.can_transition(to) {
        Ok(())
    } else {
        Err(AppError::InvalidTransition {
            entity: S::ENTITY,
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
        })
    }
}

macro_rules! status_enum {
    ($name:ident, $entity:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
        #[serde(rename_all = "snake_case")]
        #[ts(export)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn all() -> &'static [Self] {
                &[$(Self::$variant),+]
            }

            fn text(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = AppError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(AppError::bad_request(format!(
                        "Unknown {} status '{}'",
                        $entity, other
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.text())
            }
        }
    };
}

status_enum!(TicketStatus, "ticket", {
    Nouveau => "nouveau",
    EnCours => "en_cours",
    Termine => "termine",
    Clos => "clos",
    Annule => "annule",
});

status_enum!(MissionStatus, "mission", {
    EnAttente => "en_attente",
    Planifiee => "planifiee",
    EnCours => "en_cours",
    Terminee => "terminee",
    Validee => "validee",
    Annulee => "annulee",
});

status_enum!(FactureStatus, "facture", {
    Brouillon => "brouillon",
    Envoyee => "envoyee",
    Payee => "payee",
    Annulee => "annulee",
});

status_enum!(AbonnementStatus, "abonnement", {
    Actif => "actif",
    Suspendu => "suspendu",
    Resilie => "resilie",
});

impl Lifecycle for TicketStatus {
    const ENTITY: &'static str = "ticket";

    fn as_str(&self) -> &'static str {
        self.text()
    }

    fn can_transition(self, to: Self) -> bool {
        use TicketStatus::*;
        matches!(
            (self, to),
            (Nouveau, EnCours) | (Nouveau, Annule) | (EnCours, Termine) | (EnCours, Annule) | (Termine, Clos)
        )
    }
}

impl Lifecycle for MissionStatus {
    const ENTITY: &'static str = "mission";

    fn as_str(&self) -> &'static str {
        self.text()
    }

    fn can_transition(self, to: Self) -> bool {
        use MissionStatus::*;
        matches!(
            (self, to),
            (EnAttente, Planifiee)
                | (Planifiee, Planifiee) // re-plan with another technicien or date
                | (Planifiee, EnCours)
                | (EnCours, Terminee)
                | (Terminee, Validee)
                | (EnAttente, Annulee)
                | (Planifiee, Annulee)
                | (EnCours, Annulee)
        )
    }
}

impl MissionStatus {
    /// A facture may only be raised once the work is done.
    pub fn is_billable(self) -> bool {
        matches!(self, Self::Terminee | Self::Validee)
    }
}

impl Lifecycle for FactureStatus {
    const ENTITY: &'static str = "facture";

    fn as_str(&self) -> &'static str {
        self.text()
    }

    fn can_transition(self, to: Self) -> bool {
        use FactureStatus::*;
        matches!(
            (self, to),
            (Brouillon, Envoyee) | (Envoyee, Payee) | (Brouillon, Annulee) | (Envoyee, Annulee)
        )
    }
}

impl Lifecycle for AbonnementStatus {
    const ENTITY: &'static str = "abonnement";

    fn as_str(&self) -> &'static str {
        self.text()
    }

    fn can_transition(self, to: Self) -> bool {
        use AbonnementStatus::*;
        matches!(
            (self, to),
            (Actif, Suspendu) | (Suspendu, Actif) | (Actif, Resilie) | (Suspendu, Resilie)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Priorite {
    Basse,
    Normale,
    Haute,
    Urgente,
}

impl Priorite {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Basse => "basse",
            Self::Normale => "normale",
            Self::Haute => "haute",
            Self::Urgente => "urgente",
        }
    }
}

impl FromStr for Priorite {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "basse" => Ok(Self::Basse),
            "normale" => Ok(Self::Normale),
            "haute" => Ok(Self::Haute),
            "urgente" => Ok(Self::Urgente),
            other => Err(AppError::bad_request(format!("Unknown priorite '{}'", other))),
        }
    }
}
