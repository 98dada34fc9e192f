//! Role-based access control core: the closed role model, static permission
//! rules, the pure evaluator, composable predicates and ownership scoping.
//! Keep the public surface thin and split implementation across sub-modules.

mod evaluator;
mod ownership;
mod predicate;
mod role;
mod rules;

pub use evaluator::{AccessMode, Decision, DenyReason, Evaluator, TargetRef};
pub use ownership::{filter_visible, stamp_owner, Owned};
pub use predicate::Predicate;
pub use role::{Role, UnknownRoleError};
pub use rules::{AccessConfig, ActionRule, RoleRequirement};
