//! Persistent user registry: usernames, Argon2 password hashes and the
//! single role each user holds. Backed by a JSON file under the data root
//! with an in-process cache; writes go through to disk.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use password_hash::{PasswordHash, SaltString};
use serde::{Deserialize, Serialize};

use crate::rbac::Role;

const USERS_FILE: &str = "users.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub fn hash_password(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;
    let argon2 = Argon2::default();
    let phc = argon2.hash_password(password.as_bytes(), &salt).map_err(|e| anyhow!(e.to_string()))?.to_string();
    Ok(phc)
}

pub fn verify_password(hash: &str, password: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        let argon2 = Argon2::default();
        argon2.verify_password(password.as_bytes(), &parsed).is_ok()
    } else { false }
}

pub struct UserStore {
    path: PathBuf,
    users: RwLock<Vec<UserRecord>>,
}

impl UserStore {
    /// Open (or initialize) the registry under `data_dir`.
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)?;
        let path = data_dir.join(USERS_FILE);
        let users = if path.exists() {
            let text = std::fs::read_to_string(&path)?;
            serde_json::from_str(&text)?
        } else {
            Vec::new()
        };
        Ok(Self { path, users: RwLock::new(users) })
    }

    /// Seed the default admin account on first start. No-op when any user
    /// already exists.
    pub fn ensure_default_admin(&self) -> Result<()> {
        if !self.users.read().is_empty() {
            return Ok(());
        }
        self.add_user("admin", "lcagate", Role::Admin)
    }

    /// Create or replace a user. Re-registering an existing username replaces
    /// the stored row, matching ALTER-through-ADD semantics.
    pub fn add_user(&self, username: &str, password: &str, role: Role) -> Result<()> {
        let hash = hash_password(password)?;
        let now = Utc::now();
        let mut users = self.users.write();
        users.retain(|u| u.username != username);
        users.push(UserRecord {
            username: username.to_string(),
            password_hash: hash,
            role,
            created_at: now,
            updated_at: now,
        });
        self.persist(&users)
    }

    /// Update password and/or role for an existing user.
    pub fn alter_user(&self, username: &str, new_password: Option<&str>, new_role: Option<Role>) -> Result<()> {
        let mut users = self.users.write();
        let Some(user) = users.iter_mut().find(|u| u.username == username) else {
            return Err(anyhow!("user not found"));
        };
        if let Some(pw) = new_password {
            user.password_hash = hash_password(pw)?;
        }
        if let Some(role) = new_role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        self.persist(&users)
    }

    /// Remove a user. Returns false when the username was absent. The
    /// self-deletion guard lives in the evaluator, not here.
    pub fn delete_user(&self, username: &str) -> Result<bool> {
        let mut users = self.users.write();
        let before = users.len();
        users.retain(|u| u.username != username);
        let removed = users.len() != before;
        if removed {
            self.persist(&users)?;
        }
        Ok(removed)
    }

    pub fn find(&self, username: &str) -> Option<UserRecord> {
        self.users.read().iter().find(|u| u.username == username).cloned()
    }

    pub fn list(&self) -> Vec<UserRecord> {
        self.users.read().clone()
    }

    /// Verify credentials against the stored Argon2 PHC string.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<bool> {
        let Some(user) = self.find(username) else { return Ok(false) };
        Ok(verify_password(&user.password_hash, password))
    }

    fn persist(&self, users: &[UserRecord]) -> Result<()> {
        let text = serde_json::to_string_pretty(users)?;
        std::fs::write(&self.path, text)?;
        Ok(())
    }
}
