//! In-process session registry: opaque bearer tokens mapped to principals,
//! with TTL expiry and explicit revocation (logout, account deletion).

use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

use base64::Engine;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::tprintln;

use super::principal::Principal;

pub type SessionToken = String;

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    pub expires_at: Instant,
}

// Token -> session, plus a per-user index so deleting an account can revoke
// every live session for it.
static SESSIONS: Lazy<RwLock<HashMap<String, Session>>> = Lazy::new(|| RwLock::new(HashMap::new()));
static USER_TOKENS: Lazy<RwLock<HashMap<String, HashSet<String>>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));
static REVOKED: Lazy<RwLock<HashSet<String>>> = Lazy::new(|| RwLock::new(HashSet::new()));

// 256-bit random token, base64url without padding
fn gen_id() -> String {
    let mut buf = [0u8; 32];
    let _ = getrandom::getrandom(&mut buf);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf)
}

#[derive(Debug, Clone)]
pub struct SessionManager {
    pub ttl: Duration,
}

impl Default for SessionManager {
    fn default() -> Self {
        Self { ttl: Duration::from_secs(60 * 60) }
    }
}

impl SessionManager {
    pub fn issue(&self, principal: Principal) -> Session {
        let now = Instant::now();
        let session = Session {
            session_id: gen_id(),
            token: gen_id(),
            principal,
            issued_at: now,
            expires_at: now + self.ttl,
        };
        SESSIONS.write().insert(session.token.clone(), session.clone());
        USER_TOKENS
            .write()
            .entry(session.principal.id.clone())
            .or_default()
            .insert(session.token.clone());
        tprintln!(
            "session.issue user={} sid={} ttl_secs={}",
            session.principal.id,
            session.session_id,
            self.ttl.as_secs()
        );
        session
    }

    /// Resolve a token to its principal. Expired tokens are dropped on
    /// lookup; revoked tokens never resolve again.
    pub fn validate(&self, token: &str) -> Option<Principal> {
        if REVOKED.read().contains(token) {
            return None;
        }
        let now = Instant::now();
        let expired = {
            let map = SESSIONS.read();
            match map.get(token) {
                Some(s) if s.expires_at > now => return Some(s.principal.clone()),
                Some(_) => true,
                None => false,
            }
        };
        if expired {
            SESSIONS.write().remove(token);
        }
        None
    }

    pub fn logout(&self, token: &str) -> bool {
        let Some(session) = SESSIONS.write().remove(token) else {
            return false;
        };
        if let Some(set) = USER_TOKENS.write().get_mut(&session.principal.id) {
            set.remove(token);
        }
        REVOKED.write().insert(token.to_string());
        true
    }

    /// Revoke every live session for a user, so stale cookies stop resolving
    /// after an admin deletes the account. Returns the number revoked.
    pub fn revoke_user(&self, user_id: &str) -> usize {
        let tokens = match USER_TOKENS.write().remove(user_id) {
            Some(t) => t,
            None => return 0,
        };
        let mut sessions = SESSIONS.write();
        let mut revoked = REVOKED.write();
        let mut count = 0usize;
        for token in tokens {
            if sessions.remove(&token).is_some() {
                count += 1;
            }
            revoked.insert(token);
        }
        tprintln!("session.revoke user={} count={}", user_id, count);
        count
    }
}
