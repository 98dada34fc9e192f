//! Pure permission evaluator: decides Allow/Deny for one (principal, action,
//! target) triple against an injected, immutable `AccessConfig`. A Deny is a
//! normal return value, never a fault; the caller translates it to a
//! transport response and handles auditing.

use serde::{Deserialize, Serialize};

use crate::identity::Principal;

use super::role::Role;
use super::rules::{AccessConfig, RoleRequirement};

/// Classified denial. Serialized form carries the machine-readable snake_case
/// reason code plus required-vs-actual details where roles are involved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum DenyReason {
    AuthenticationRequired,
    InsufficientRole { required: Vec<Role>, actual: Role },
    InsufficientRoleLevel { minimum: Role, actual: Role },
    NotOwner,
    SelfDeletionForbidden,
}

impl DenyReason {
    pub fn code(&self) -> &'static str {
        match self {
            DenyReason::AuthenticationRequired => "authentication_required",
            DenyReason::InsufficientRole { .. } => "insufficient_role",
            DenyReason::InsufficientRoleLevel { .. } => "insufficient_role_level",
            DenyReason::NotOwner => "not_owner",
            DenyReason::SelfDeletionForbidden => "self_deletion_forbidden",
        }
    }

    /// 401 for unauthenticated (uniform, no hint of required roles), 403 for
    /// every authenticated-but-unauthorized reason.
    pub fn http_status(&self) -> u16 {
        match self {
            DenyReason::AuthenticationRequired => 401,
            _ => 403,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    pub fn deny_reason(&self) -> Option<&DenyReason> {
        match self {
            Decision::Allow => None,
            Decision::Deny(reason) => Some(reason),
        }
    }
}

/// Whether the operation mutates. Maps from HTTP safe methods at the guard
/// layer; the evaluator itself stays transport-neutral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    Read,
    Write,
}

/// Borrowed view of the resource an object-level check runs against.
#[derive(Debug, Clone, Copy)]
pub struct TargetRef<'a> {
    /// Identity of the target itself (user id for delete_user, resource id
    /// otherwise).
    pub id: &'a str,
    /// Owner of the target, where the resource class carries one.
    pub created_by: Option<&'a str>,
}

impl<'a> TargetRef<'a> {
    pub fn user(id: &'a str) -> Self {
        Self { id, created_by: None }
    }

    pub fn owned(id: &'a str, created_by: &'a str) -> Self {
        Self { id, created_by: Some(created_by) }
    }
}

/// Stateless decision engine over an immutable rule table.
#[derive(Debug, Clone)]
pub struct Evaluator {
    config: AccessConfig,
}

impl Evaluator {
    pub fn new(config: AccessConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &AccessConfig {
        &self.config
    }

    /// Decide authorization for a single action.
    ///
    /// Order: authentication, rule lookup (unregistered actions deny —
    /// fail-closed), safe-read downgrade, role requirement, self-target
    /// guard, ownership. The ownership check composes with the role check;
    /// both must pass.
    pub fn evaluate(
        &self,
        principal: &Principal,
        action: &str,
        mode: AccessMode,
        target: Option<TargetRef<'_>>,
    ) -> Decision {
        if !principal.is_authenticated {
            return Decision::Deny(DenyReason::AuthenticationRequired);
        }

        let Some(rule) = self.config.rule(action) else {
            // Unregistered actions deny; openness must be declared in the
            // rule table, never inherited.
            return Decision::Deny(DenyReason::InsufficientRole {
                required: Vec::new(),
                actual: principal.role,
            });
        };

        // Safe methods on read-open actions need authentication only.
        let skip_role_check = rule.read_open && mode == AccessMode::Read;
        if !skip_role_check {
            match &rule.requirement {
                RoleRequirement::Authenticated => {}
                RoleRequirement::AnyRole { roles } => {
                    if !roles.contains(&principal.role) {
                        return Decision::Deny(DenyReason::InsufficientRole {
                            required: roles.clone(),
                            actual: principal.role,
                        });
                    }
                }
                RoleRequirement::MinimumRole { minimum } => {
                    if !principal.role.at_least(*minimum) {
                        return Decision::Deny(DenyReason::InsufficientRoleLevel {
                            minimum: *minimum,
                            actual: principal.role,
                        });
                    }
                }
            }
        }

        if let Some(target) = target {
            // Lockout guard applies even to admins that passed the role gate.
            if rule.deny_self_target && target.id == principal.id {
                return Decision::Deny(DenyReason::SelfDeletionForbidden);
            }
            if rule.ownership_required {
                let owned_by_caller = target.created_by == Some(principal.id.as_str());
                if principal.role != Role::Admin && !owned_by_caller {
                    return Decision::Deny(DenyReason::NotOwner);
                }
            }
        }

        Decision::Allow
    }
}
