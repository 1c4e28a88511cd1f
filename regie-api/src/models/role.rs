use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// The single role carried by a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum Role {
    Locataire,
    Regie,
    Entreprise,
    Technicien,
    AdminJtec,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Locataire => "locataire",
            Self::Regie => "regie",
            Self::Entreprise => "entreprise",
            Self::Technicien => "technicien",
            Self::AdminJtec => "admin_jtec",
        }
    }

    pub fn all() -> &'static [Self] {
        &[
            Self::Locataire,
            Self::Regie,
            Self::Entreprise,
            Self::Technicien,
            Self::AdminJtec,
        ]
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| format!("unknown role '{}'", s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
