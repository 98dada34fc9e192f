//! Central identity and session management for the LCA backend.
//! Keep the public surface thin and split implementation across sub-modules.

mod principal;
mod provider;
mod session;
mod users;

pub use principal::Principal;
pub use provider::{AuthProvider, LocalAuthProvider, LoginRequest, LoginResponse};
pub use session::{Session, SessionManager, SessionToken};
pub use users::{hash_password, verify_password, UserRecord, UserStore};
