//! Accounts and sessions: registration, password sign-in, and the
//! in-memory bearer-token store.

use std::collections::HashMap;
use std::sync::{LazyLock, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use base64::Engine;
use chrono::Utc;
use pbkdf2::pbkdf2_hmac;
use regex::Regex;
use rusqlite::Connection;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use uuid::Uuid;

use crate::db::{repository, DatabaseError};
use crate::models::{Role, User};

pub const MIN_PASSWORD_LEN: usize = 6;

const PBKDF2_ITERATIONS: u32 = if cfg!(test) { 1_000 } else { 600_000 };
const SALT_LENGTH: usize = 16;
const HASH_LENGTH: usize = 32;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Invalid email or password.")]
    InvalidCredential,

    #[error("An account with this email already exists.")]
    DuplicateAccount,

    #[error("Password must be at least 6 characters.")]
    WeakPassword,

    #[error("Please enter a valid email address.")]
    InvalidEmail,

    #[error("Please enter your name.")]
    MissingName,

    #[error("Session expired or invalid. Please sign in again.")]
    InvalidSession,

    #[error("This page is only available to {0} accounts.")]
    WrongRole(Role),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

// ═══════════════════════════════════════════════════════════
// Credentials
// ═══════════════════════════════════════════════════════════

/// Trimmed, lowercased, and shape-checked email.
pub fn normalize_email(raw: &str) -> Result<String, AuthError> {
    let email = raw.trim().to_lowercase();
    if EMAIL_PATTERN.is_match(&email) {
        Ok(email)
    } else {
        Err(AuthError::InvalidEmail)
    }
}

fn derive_hash(password: &str, salt: &[u8]) -> [u8; HASH_LENGTH] {
    let mut out = [0u8; HASH_LENGTH];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), salt, PBKDF2_ITERATIONS, &mut out);
    out
}

/// Hash a password with a fresh random salt. Returns (hash, salt), both base64.
pub fn hash_password(password: &str) -> (String, String) {
    let salt: [u8; SALT_LENGTH] = rand::random();
    let hash = derive_hash(password, &salt);
    let b64 = base64::engine::general_purpose::STANDARD;
    (b64.encode(hash), b64.encode(salt))
}

pub fn verify_password(password: &str, hash_b64: &str, salt_b64: &str) -> bool {
    let b64 = base64::engine::general_purpose::STANDARD;
    let (Ok(expected), Ok(salt)) = (b64.decode(hash_b64), b64.decode(salt_b64)) else {
        return false;
    };
    let actual = derive_hash(password, &salt);
    actual.as_slice().ct_eq(expected.as_slice()).into()
}

/// Create an account.
pub fn register(
    conn: &Connection,
    name: &str,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, AuthError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    let email = normalize_email(email)?;
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    if repository::email_exists(conn, &email)? {
        return Err(AuthError::DuplicateAccount);
    }

    let user = User {
        id: Uuid::new_v4(),
        name: name.to_string(),
        email,
        role,
        created_at: Utc::now(),
    };
    let (hash, salt) = hash_password(password);
    match repository::insert_user(conn, &user, &hash, &salt) {
        Ok(()) => {}
        // lost a race with a concurrent registration
        Err(e) if e.is_constraint_violation() => return Err(AuthError::DuplicateAccount),
        Err(e) => return Err(e.into()),
    }

    tracing::info!(user_id = %user.id, role = user.role.as_str(), "Account registered");
    Ok(user)
}

/// Check an email/password pair. Unknown email and wrong password are
/// indistinguishable to the caller.
pub fn authenticate(conn: &Connection, email: &str, password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email).map_err(|_| AuthError::InvalidCredential)?;
    let Some(cred) = repository::get_credential_by_email(conn, &email)? else {
        return Err(AuthError::InvalidCredential);
    };
    if !verify_password(password, &cred.password_hash, &cred.password_salt) {
        tracing::debug!(user_id = %cred.user.id, "Password mismatch");
        return Err(AuthError::InvalidCredential);
    }
    Ok(cred.user)
}

/// Fail unless the user holds `role`.
pub fn require_role(user: &User, role: Role) -> Result<(), AuthError> {
    if user.role == role {
        Ok(())
    } else {
        Err(AuthError::WrongRole(role))
    }
}

// ═══════════════════════════════════════════════════════════
// Session tokens
// ═══════════════════════════════════════════════════════════

/// Hash a bearer token string using SHA-256.
pub fn hash_token(token: &str) -> [u8; 32] {
    use sha2::Digest;
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Generate a random bearer token (URL-safe base64, 32 bytes of entropy).
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::random();
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

struct SessionEntry {
    user: User,
    expires_at: Instant,
}

/// Signed-in sessions keyed by token hash. Raw tokens are never stored.
pub struct SessionStore {
    sessions: Mutex<HashMap<[u8; 32], SessionEntry>>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Start a session for `user`; returns the bearer token.
    pub fn issue(&self, user: User) -> String {
        let token = generate_token();
        let mut sessions = self.lock();
        let now = Instant::now();
        sessions.retain(|_, s| s.expires_at > now);
        sessions.insert(
            hash_token(&token),
            SessionEntry {
                user,
                expires_at: now + self.ttl,
            },
        );
        token
    }

    /// The session's user, if the token is known and not expired.
    pub fn current(&self, token: &str) -> Result<User, AuthError> {
        let key = hash_token(token);
        let mut sessions = self.lock();
        let expired = match sessions.get(&key) {
            Some(entry) if entry.expires_at > Instant::now() => return Ok(entry.user.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            sessions.remove(&key);
        }
        Err(AuthError::InvalidSession)
    }

    /// End a session. Unknown tokens are ignored.
    pub fn revoke(&self, token: &str) -> bool {
        self.lock().remove(&hash_token(token)).is_some()
    }

    pub fn active_count(&self) -> usize {
        let now = Instant::now();
        self.lock().values().filter(|e| e.expires_at > now).count()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<[u8; 32], SessionEntry>> {
        // entries are inserted whole, so a poisoned map is still consistent
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
