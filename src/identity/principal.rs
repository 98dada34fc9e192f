use serde::{Deserialize, Serialize};

use crate::rbac::Role;

/// The authenticated actor the RBAC core evaluates. Produced by the identity
/// subsystem (session validation or login); the evaluator trusts it as given
/// and performs no credential verification of its own. A principal carries
/// exactly one role.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: String,
    pub role: Role,
    pub is_authenticated: bool,
}

impl Principal {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self { id: id.into(), role, is_authenticated: true }
    }

    /// Placeholder for requests without a valid session. Carries the lowest
    /// role, but `is_authenticated == false` denies before any role check.
    pub fn anonymous() -> Self {
        Self { id: String::new(), role: Role::Engineer, is_authenticated: false }
    }
}
