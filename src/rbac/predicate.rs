//! Composable permission predicates. Each check is a standalone tagged value
//! rather than a class in a hierarchy; composition happens through explicit
//! `AnyOf`/`AllOf`/`Not` combinators that short-circuit and return `Deny` as
//! a value, never an error.

use crate::identity::Principal;

use super::evaluator::{Decision, DenyReason, TargetRef};
use super::role::Role;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// Any authenticated principal.
    Authenticated,
    /// Role is a member of the allow-list.
    HasAnyRole(Vec<Role>),
    /// Role level meets the threshold.
    MinimumRole(Role),
    /// Target is owned by the caller, or the caller is admin.
    Owner,
    /// Logical OR; allows on the first passing branch, otherwise returns the
    /// last branch's denial. Empty `AnyOf` denies.
    AnyOf(Vec<Predicate>),
    /// Logical AND; denies on the first failing branch. Empty `AllOf` allows.
    AllOf(Vec<Predicate>),
    /// Inversion. An inner Allow denies with a generic role denial (the
    /// specific inner reason no longer applies once inverted).
    Not(Box<Predicate>),
}

impl Predicate {
    pub fn any_of(preds: impl Into<Vec<Predicate>>) -> Self {
        Predicate::AnyOf(preds.into())
    }

    pub fn all_of(preds: impl Into<Vec<Predicate>>) -> Self {
        Predicate::AllOf(preds.into())
    }

    pub fn check(&self, principal: &Principal, target: Option<TargetRef<'_>>) -> Decision {
        match self {
            Predicate::Authenticated => {
                if principal.is_authenticated {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::AuthenticationRequired)
                }
            }
            Predicate::HasAnyRole(roles) => {
                if !principal.is_authenticated {
                    return Decision::Deny(DenyReason::AuthenticationRequired);
                }
                if roles.contains(&principal.role) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::InsufficientRole {
                        required: roles.clone(),
                        actual: principal.role,
                    })
                }
            }
            Predicate::MinimumRole(minimum) => {
                if !principal.is_authenticated {
                    return Decision::Deny(DenyReason::AuthenticationRequired);
                }
                if principal.role.at_least(*minimum) {
                    Decision::Allow
                } else {
                    Decision::Deny(DenyReason::InsufficientRoleLevel {
                        minimum: *minimum,
                        actual: principal.role,
                    })
                }
            }
            Predicate::Owner => {
                if !principal.is_authenticated {
                    return Decision::Deny(DenyReason::AuthenticationRequired);
                }
                if principal.role == Role::Admin {
                    return Decision::Allow;
                }
                match target {
                    Some(t) if t.created_by == Some(principal.id.as_str()) => Decision::Allow,
                    _ => Decision::Deny(DenyReason::NotOwner),
                }
            }
            Predicate::AnyOf(preds) => {
                let mut last_deny = Decision::Deny(DenyReason::AuthenticationRequired);
                for p in preds {
                    match p.check(principal, target) {
                        Decision::Allow => return Decision::Allow,
                        deny => last_deny = deny,
                    }
                }
                last_deny
            }
            Predicate::AllOf(preds) => {
                for p in preds {
                    let d = p.check(principal, target);
                    if !d.is_allow() {
                        return d;
                    }
                }
                Decision::Allow
            }
            Predicate::Not(inner) => match inner.check(principal, target) {
                Decision::Allow => Decision::Deny(DenyReason::InsufficientRole {
                    required: Vec::new(),
                    actual: principal.role,
                }),
                Decision::Deny(_) => Decision::Allow,
            },
        }
    }
}
