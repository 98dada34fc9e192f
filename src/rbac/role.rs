use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The closed role set of the LCA backend. Adding a role is a code change,
/// not a data migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Engineer,
    Metallurgist,
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Engineer, Role::Metallurgist, Role::Admin];

    /// Position in the role hierarchy. The hierarchy is a total order:
    /// engineer=1, metallurgist=2, admin=3.
    pub fn level(self) -> u8 {
        match self {
            Role::Engineer => 1,
            Role::Metallurgist => 2,
            Role::Admin => 3,
        }
    }

    /// Minimum-role check: `level(self) >= level(minimum)`.
    pub fn at_least(self, minimum: Role) -> bool {
        self.level() >= minimum.level()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Engineer => "engineer",
            Role::Metallurgist => "metallurgist",
            Role::Admin => "admin",
        }
    }
}

/// A role string outside the closed set. This is a configuration defect and
/// surfaces at startup validation, never as a per-request decision.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role '{0}' (expected one of: engineer, metallurgist, admin)")]
pub struct UnknownRoleError(pub String);

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "engineer" => Ok(Role::Engineer),
            "metallurgist" => Ok(Role::Metallurgist),
            "admin" => Ok(Role::Admin),
            other => Err(UnknownRoleError(other.to_string())),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
