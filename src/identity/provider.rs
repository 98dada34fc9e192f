use std::sync::Arc;

use anyhow::{anyhow, Result};
// Keep provider request/response plain Rust structs to avoid serde requirements on Session
use crate::tprintln;

use super::principal::Principal;
use super::session::{Session, SessionManager};
use super::users::UserStore;

#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct LoginResponse {
    pub session: Session,
}

pub trait AuthProvider: Send + Sync {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse>;
}

/// Verifies credentials against the local user registry and issues a session
/// carrying the stored role.
pub struct LocalAuthProvider {
    pub users: Arc<UserStore>,
    pub sm: SessionManager,
}

impl LocalAuthProvider {
    pub fn new(users: Arc<UserStore>, sm: SessionManager) -> Self { Self { users, sm } }
}

impl AuthProvider for LocalAuthProvider {
    fn login(&self, req: &LoginRequest) -> Result<LoginResponse> {
        if !self.users.authenticate(&req.username, &req.password)? {
            return Err(anyhow!("invalid_credentials"));
        }
        // The registry is the single source of the role; no derivation step.
        let record = self.users.find(&req.username).ok_or_else(|| anyhow!("invalid_credentials"))?;
        let principal = Principal::new(record.username.clone(), record.role);
        let session = self.sm.issue(principal);
        tprintln!("auth.login user={} sid={}", req.username, session.session_id);
        Ok(LoginResponse { session })
    }
}
