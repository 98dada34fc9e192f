//! Route guard: a single composable gate attached per route, parameterized by
//! a declarative `Requirement`. On Deny it short-circuits before the handler
//! with a structured JSON rejection; on Allow the request passes through
//! unchanged. Behavior is identical for every handler shape axum accepts.

use axum::extract::{Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::identity::Principal;
use crate::rbac::{AccessMode, Decision, DenyReason, Evaluator, Predicate, Role};

use super::{audit, AppState};

/// Declarative gate configuration: a registered action name, a role
/// allow-list, a minimum role, or an arbitrary composite predicate.
#[derive(Debug, Clone)]
pub enum Requirement {
    Action(&'static str),
    Roles(Vec<Role>),
    Minimum(Role),
    Custom(&'static str, Predicate),
}

impl Requirement {
    /// Name used for audit lines.
    pub fn label(&self) -> &'static str {
        match self {
            Requirement::Action(name) => name,
            Requirement::Roles(_) => "role_gate",
            Requirement::Minimum(_) => "minimum_role_gate",
            Requirement::Custom(name, _) => name,
        }
    }

    pub fn check(&self, evaluator: &Evaluator, principal: &Principal, mode: AccessMode) -> Decision {
        match self {
            Requirement::Action(name) => evaluator.evaluate(principal, name, mode, None),
            Requirement::Roles(roles) => {
                Predicate::HasAnyRole(roles.clone()).check(principal, None)
            }
            Requirement::Minimum(minimum) => {
                Predicate::MinimumRole(*minimum).check(principal, None)
            }
            Requirement::Custom(_, pred) => pred.check(principal, None),
        }
    }
}

/// Middleware state: the app state plus the requirement this gate enforces.
#[derive(Clone)]
pub struct GuardContext {
    pub state: AppState,
    pub requirement: Requirement,
}

/// Safe methods map to read mode (the CanUploadDatasets pattern: reads on a
/// read-open action only need authentication).
pub fn access_mode(method: &Method) -> AccessMode {
    if method.is_safe() { AccessMode::Read } else { AccessMode::Write }
}

/// The gate itself. Attach with
/// `route_layer(middleware::from_fn_with_state(ctx, require))`.
pub async fn require(State(ctx): State<GuardContext>, req: Request, next: Next) -> Response {
    let principal = ctx.state.principal_for(req.headers());
    let mode = access_mode(req.method());
    let decision = ctx.requirement.check(&ctx.state.evaluator, &principal, mode);
    audit::record(&principal, ctx.requirement.label(), req.uri().path(), &decision);
    match decision {
        Decision::Allow => next.run(req).await,
        Decision::Deny(reason) => reject(&reason),
    }
}

/// Structured rejection. Field names follow the API the original frontend
/// consumed: `required_roles` / `user_role` for role denials, `minimum_role`
/// for threshold denials. Unauthenticated callers get a uniform body with no
/// role details.
pub fn reject(reason: &DenyReason) -> Response {
    let status = StatusCode::from_u16(reason.http_status()).unwrap_or(StatusCode::FORBIDDEN);
    let body = match reason {
        DenyReason::AuthenticationRequired => json!({
            "error": "Authentication required",
            "reason": reason.code(),
        }),
        DenyReason::InsufficientRole { required, actual } => json!({
            "error": "Insufficient permissions",
            "reason": reason.code(),
            "required_roles": required,
            "user_role": actual,
        }),
        DenyReason::InsufficientRoleLevel { minimum, actual } => json!({
            "error": "Insufficient role level",
            "reason": reason.code(),
            "minimum_role": minimum,
            "user_role": actual,
        }),
        DenyReason::NotOwner => json!({
            "error": "You do not own this resource",
            "reason": reason.code(),
        }),
        DenyReason::SelfDeletionForbidden => json!({
            "error": "Cannot delete your own account",
            "reason": reason.code(),
        }),
    };
    (status, Json(body)).into_response()
}
