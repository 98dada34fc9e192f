//! Ownership scoping: visibility filtering and owner stamping over any
//! resource class that carries a `created_by` reference.

use crate::identity::Principal;

use super::role::Role;

/// Resource classes with a single-owner relation.
pub trait Owned {
    fn owner_id(&self) -> &str;
    fn set_owner(&mut self, owner: &str);
}

/// Scope a collection to what the principal may see: everything for admin,
/// only the caller's own resources otherwise, nothing for unauthenticated
/// callers. Idempotent, and safe to compose with further filtering or
/// pagination since it only ever removes items.
pub fn filter_visible<T: Owned>(items: Vec<T>, principal: &Principal) -> Vec<T> {
    if !principal.is_authenticated {
        return Vec::new();
    }
    if principal.role == Role::Admin {
        return items;
    }
    items
        .into_iter()
        .filter(|item| item.owner_id() == principal.id)
        .collect()
}

/// Set `created_by` to the caller unconditionally. Client-supplied owner
/// values are overwritten, never trusted.
pub fn stamp_owner<T: Owned>(resource: &mut T, principal: &Principal) {
    resource.set_owner(&principal.id);
}
