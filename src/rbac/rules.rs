//! Static permission rules: action name -> role requirement plus flags.
//! Rules are built once at startup, validated, and injected into the
//! evaluator as an immutable `AccessConfig`.

use std::collections::HashMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::role::{Role, UnknownRoleError};

/// The role portion of a rule: explicit allow-list, minimum level, or
/// "any authenticated principal" (openness must be declared, never inherited).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RoleRequirement {
    Authenticated,
    AnyRole { roles: Vec<Role> },
    MinimumRole { minimum: Role },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRule {
    pub requirement: RoleRequirement,
    /// Object-level check: owner or admin, composed with the role check.
    #[serde(default)]
    pub ownership_required: bool,
    /// Safe (read) methods only need authentication even when the write
    /// requirement is stricter.
    #[serde(default)]
    pub read_open: bool,
    /// Deny when the target is the caller's own identity (lockout guard).
    #[serde(default)]
    pub deny_self_target: bool,
}

impl ActionRule {
    pub fn authenticated() -> Self {
        Self {
            requirement: RoleRequirement::Authenticated,
            ownership_required: false,
            read_open: false,
            deny_self_target: false,
        }
    }

    pub fn any_of(roles: &[Role]) -> Self {
        Self {
            requirement: RoleRequirement::AnyRole { roles: roles.to_vec() },
            ownership_required: false,
            read_open: false,
            deny_self_target: false,
        }
    }

    pub fn min_role(minimum: Role) -> Self {
        Self {
            requirement: RoleRequirement::MinimumRole { minimum },
            ownership_required: false,
            read_open: false,
            deny_self_target: false,
        }
    }

    pub fn with_ownership(mut self) -> Self {
        self.ownership_required = true;
        self
    }

    pub fn with_read_open(mut self) -> Self {
        self.read_open = true;
        self
    }

    pub fn with_deny_self_target(mut self) -> Self {
        self.deny_self_target = true;
        self
    }
}

/// Raw rule as it appears in a JSON rules document: role names are strings so
/// that a typo fails with `UnknownRoleError` at startup instead of a serde
/// message buried in a request path.
#[derive(Debug, Clone, Deserialize)]
struct RawRule {
    #[serde(default)]
    roles: Option<Vec<String>>,
    #[serde(default)]
    minimum_role: Option<String>,
    #[serde(default)]
    ownership_required: bool,
    #[serde(default)]
    read_open: bool,
    #[serde(default)]
    deny_self_target: bool,
}

/// Immutable action -> rule table. Constructed at startup and handed to the
/// evaluator; never mutated at runtime.
#[derive(Debug, Clone, Default)]
pub struct AccessConfig {
    rules: HashMap<String, ActionRule>,
}

impl AccessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rule(mut self, action: &str, rule: ActionRule) -> Self {
        self.rules.insert(action.to_string(), rule);
        self
    }

    pub fn rule(&self, action: &str) -> Option<&ActionRule> {
        self.rules.get(action)
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.rules.keys().map(|k| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Parse a JSON rules document of the form
    /// `{"action": {"roles": ["admin"], "ownership_required": false, ...}}`.
    /// A rule may carry `roles` or `minimum_role`; neither means
    /// authenticated-only. Unknown role names abort startup.
    pub fn from_json(text: &str) -> anyhow::Result<Self> {
        let raw: HashMap<String, RawRule> = serde_json::from_str(text)?;
        let mut cfg = AccessConfig::new();
        for (action, r) in raw {
            let requirement = match (&r.roles, &r.minimum_role) {
                (Some(_), Some(_)) => {
                    anyhow::bail!("action '{}' declares both roles and minimum_role", action)
                }
                (Some(names), None) => {
                    let mut roles = Vec::with_capacity(names.len());
                    for name in names {
                        roles.push(Role::from_str(name).map_err(|e: UnknownRoleError| {
                            anyhow::anyhow!("action '{}': {}", action, e)
                        })?);
                    }
                    RoleRequirement::AnyRole { roles }
                }
                (None, Some(name)) => {
                    let minimum = Role::from_str(name).map_err(|e: UnknownRoleError| {
                        anyhow::anyhow!("action '{}': {}", action, e)
                    })?;
                    RoleRequirement::MinimumRole { minimum }
                }
                (None, None) => RoleRequirement::Authenticated,
            };
            cfg.rules.insert(
                action,
                ActionRule {
                    requirement,
                    ownership_required: r.ownership_required,
                    read_open: r.read_open,
                    deny_self_target: r.deny_self_target,
                },
            );
        }
        Ok(cfg)
    }

    /// The LCA backend's action table: user management is admin-only with
    /// read access for any authenticated user, dataset/AI-model management is
    /// metallurgist-and-up with open reads, reports are ownership-scoped.
    pub fn lca_defaults() -> Self {
        use Role::*;
        AccessConfig::new()
            .with_rule("register_user", ActionRule::any_of(&[Admin]))
            .with_rule("list_users", ActionRule::authenticated())
            .with_rule("manage_users", ActionRule::any_of(&[Admin]).with_read_open())
            .with_rule(
                "delete_user",
                ActionRule::any_of(&[Admin]).with_deny_self_target(),
            )
            .with_rule(
                "upload_dataset",
                ActionRule::any_of(&[Metallurgist, Admin]).with_read_open(),
            )
            .with_rule("view_datasets", ActionRule::authenticated())
            .with_rule("run_lca", ActionRule::any_of(&[Engineer, Metallurgist, Admin]))
            .with_rule(
                "manage_ai_models",
                ActionRule::any_of(&[Metallurgist, Admin]).with_read_open(),
            )
            .with_rule("view_ai_models", ActionRule::authenticated())
            .with_rule("create_report", ActionRule::authenticated())
            .with_rule("view_reports", ActionRule::authenticated().with_ownership())
            .with_rule("delete_report", ActionRule::authenticated().with_ownership())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_json_rejects_unknown_role() {
        let err = AccessConfig::from_json(r#"{"delete_user": {"roles": ["superuser"]}}"#)
            .expect_err("unknown role must fail at parse time");
        assert!(err.to_string().contains("unknown role 'superuser'"));
    }

    #[test]
    fn from_json_rejects_conflicting_requirements() {
        let err = AccessConfig::from_json(
            r#"{"x": {"roles": ["admin"], "minimum_role": "engineer"}}"#,
        )
        .expect_err("roles and minimum_role are mutually exclusive");
        assert!(err.to_string().contains("both roles and minimum_role"));
    }

    #[test]
    fn from_json_parses_flags() {
        let cfg = AccessConfig::from_json(
            r#"{"upload_dataset": {"roles": ["metallurgist", "admin"], "read_open": true}}"#,
        )
        .unwrap();
        let rule = cfg.rule("upload_dataset").unwrap();
        assert!(rule.read_open);
        assert_eq!(
            rule.requirement,
            RoleRequirement::AnyRole { roles: vec![Role::Metallurgist, Role::Admin] }
        );
    }

    #[test]
    fn defaults_cover_the_lca_action_table() {
        let cfg = AccessConfig::lca_defaults();
        for action in [
            "register_user",
            "delete_user",
            "upload_dataset",
            "run_lca",
            "manage_ai_models",
            "view_reports",
        ] {
            assert!(cfg.rule(action).is_some(), "missing rule for {}", action);
        }
        assert!(cfg.rule("view_reports").unwrap().ownership_required);
        assert!(cfg.rule("delete_user").unwrap().deny_self_target);
    }
}
