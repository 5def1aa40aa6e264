//! Session identity and the per-request session object.
//!
//! # Data Flow
//! ```text
//! Request cookies
//!     → resolve_or_mint (existing id, or a fresh unguessable one)
//!     → registry (uniqueness only; no session content is stored)
//!     → Session (ephemeral, owned by the handling worker, discarded
//!       after the response)
//! ```
//!
//! # Design Decisions
//! - Two layers, never conflated: a durable id → () registry that only
//!   guards uniqueness, and a fully ephemeral Session value per request
//! - HTTP is treated as stateless; nothing survives a request except the
//!   identifier itself
//! - Ids are unauthenticated (they name a browser session, not a user)
//!   but unguessable (secret + randomness)

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::http::HeaderMap;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use sha2::{Digest, Sha256};

use crate::config::ServerConfig;
use crate::security::{websafe_b64, ServerIdentity};

/// Ephemeral per-request session.
///
/// Owned exclusively by the request that created it and dropped once the
/// response is written. Holds the template variables computed for this
/// request (csrf token, host, session id, message count, ...).
pub struct Session {
    pub id: String,
    pub config: Arc<ServerConfig>,
    pub vars: HashMap<&'static str, String>,
}

/// Resolves and mints session identifiers.
pub struct SessionManager {
    identity: Arc<ServerIdentity>,
    registry: DashMap<String, ()>,
}

impl SessionManager {
    pub fn new(identity: Arc<ServerIdentity>) -> Self {
        Self {
            identity,
            registry: DashMap::new(),
        }
    }

    /// Read the session id from the Cookie header by this instance's
    /// randomized cookie name, or mint a new one.
    pub fn resolve_or_mint(&self, cookie_header: Option<&str>, headers: &HeaderMap) -> String {
        if let Some(value) = cookie_header
            .and_then(|header| cookie_value(header, self.identity.cookie_name()))
            .filter(|value| well_formed_id(value))
        {
            return value.to_string();
        }
        self.mint_session_id(headers)
    }

    /// Mint a fresh identifier, retrying until it is absent from the
    /// registry, then record it.
    pub fn mint_session_id(&self, headers: &HeaderMap) -> String {
        loop {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);

            let mut hasher = Sha256::new();
            hasher.update(self.identity.secret().as_bytes());
            for (name, value) in headers.iter() {
                hasher.update(name.as_str().as_bytes());
                hasher.update(value.as_bytes());
            }
            hasher.update(rand::random::<u64>().to_le_bytes());
            hasher.update(now.to_le_bytes());
            let id = websafe_b64(&hasher.finalize());

            // entry() makes the membership check and the insert atomic.
            match self.registry.entry(id.clone()) {
                Entry::Vacant(slot) => {
                    slot.insert(());
                    return id;
                }
                Entry::Occupied(_) => continue,
            }
        }
    }

    /// Construct a fresh per-request session bound to shared configuration.
    pub fn new_session(&self, config: Arc<ServerConfig>, id: String) -> Session {
        Session {
            id,
            config,
            vars: HashMap::new(),
        }
    }

    /// Number of identifiers minted so far.
    pub fn known_sessions(&self) -> usize {
        self.registry.len()
    }
}

/// Pull a single cookie value out of a Cookie header.
fn cookie_value<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| value)
}

/// Ids we mint are web-safe base64; anything else in the cookie is treated
/// as absent and replaced.
fn well_formed_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
}
