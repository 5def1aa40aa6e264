//! Per-instance server identity.
//!
//! # Responsibilities
//! - Generate the instance secret at startup (never persisted, never logged)
//! - Derive the randomized session-cookie name from the secret
//!
//! # Design Decisions
//! - The secret seeds every derived token (session ids, CSRF, ETags), so a
//!   client can never correlate values across server instances
//! - The cookie name is unpredictable per process so a fixed name cannot be
//!   used to fingerprint the application

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::security::websafe_b64;

/// Length of the randomized session-cookie name.
const COOKIE_NAME_LEN: usize = 8;

/// The per-instance secret and the values derived from it at startup.
///
/// Fixed for the lifetime of the process. Construction cannot fail; the
/// cookie-name derivation retries until it produces a full-length name.
pub struct ServerIdentity {
    secret: String,
    cookie_name: String,
}

impl ServerIdentity {
    /// Generate a fresh identity from process-, time- and random inputs.
    pub fn generate() -> Self {
        let mut seed = [0u8; 32];
        OsRng.fill_bytes(&mut seed);
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);

        let mut hasher = Sha512::new();
        hasher.update(std::process::id().to_le_bytes());
        hasher.update(now.to_le_bytes());
        hasher.update(seed);
        let secret = websafe_b64(&hasher.finalize());

        let mut cookie_name = String::new();
        while cookie_name.len() < COOKIE_NAME_LEN {
            let salt = rand::random::<u64>();
            let mut hasher = Sha512::new();
            hasher.update(secret.as_bytes());
            hasher.update(salt.to_le_bytes());
            cookie_name = websafe_b64(&hasher.finalize())
                .chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(COOKIE_NAME_LEN)
                .collect::<String>()
                .to_lowercase();
        }

        Self {
            secret,
            cookie_name,
        }
    }

    /// The instance secret. Must never appear in logs or responses.
    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// The randomized session-cookie name for this instance.
    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }
}

impl fmt::Debug for ServerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // The secret stays out of Debug output.
        f.debug_struct("ServerIdentity").finish_non_exhaustive()
    }
}
