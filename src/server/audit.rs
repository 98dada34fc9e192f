//! Audit hook: append-only record of every guard decision via `tracing`.
//! Recording is fire-and-forget; nothing here can change an Allow/Deny
//! outcome, and a subscriber that drops the event is silently tolerated.

use crate::identity::Principal;
use crate::rbac::Decision;

/// Identity fields for an audit line. Unauthenticated callers are recorded
/// as "anonymous" with no role attributed.
pub fn actor(principal: &Principal) -> (&str, &'static str) {
    if principal.is_authenticated {
        (principal.id.as_str(), principal.role.as_str())
    } else {
        ("anonymous", "-")
    }
}

/// Record one access decision. Denies log at WARN for monitoring; allows at
/// INFO. The subscriber supplies the timestamp.
pub fn record(principal: &Principal, action: &str, path: &str, decision: &Decision) {
    let (user, role) = actor(principal);
    match decision {
        Decision::Allow => {
            tracing::info!(target: "audit", user, role, action, path, outcome = "allow", "permission check");
        }
        Decision::Deny(reason) => {
            tracing::warn!(
                target: "audit",
                user,
                role,
                action,
                path,
                outcome = "deny",
                reason = reason.code(),
                "permission denied"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rbac::Role;

    #[test]
    fn anonymous_callers_are_not_attributed_a_role() {
        let principal = Principal::anonymous();
        let (user, role) = actor(&principal);
        assert_eq!(user, "anonymous");
        assert_eq!(role, "-");
    }

    #[test]
    fn authenticated_callers_log_their_identity() {
        let principal = Principal::new("met", Role::Metallurgist);
        let (user, role) = actor(&principal);
        assert_eq!(user, "met");
        assert_eq!(role, "metallurgist");
    }
}
