//! ETag and cache-lifetime negotiation for dynamic responses.
//!
//! # Design Decisions
//! - The fingerprint mixes in the instance secret, so clients cannot
//!   correlate ETags across independent server instances
//! - Cache headers are only emitted when every command contributed a
//!   fragment; a partial set must never produce a falsely-conditional
//!   response
//! - The 304 short-circuit happens before command execution and is
//!   side-effect free

use md5::{Digest, Md5};

use crate::routing::command::Command;
use crate::security::ServerIdentity;

/// Cache lifetime when no command states one.
pub const DEFAULT_MAX_AGE: u64 = 10;

/// Aggregate cache contribution of one request's command list.
#[derive(Debug, Clone)]
pub struct CacheDescriptor {
    /// Minimum max-age across commands.
    pub max_age: u64,
    /// Ordered fingerprint fragments, as contributed.
    pub fragments: Vec<String>,
    complete: bool,
}

impl CacheDescriptor {
    /// Gather max-age and fingerprint contributions from every command.
    pub fn collect(commands: &[Box<dyn Command>]) -> Self {
        let mut fragments = Vec::new();
        let mut max_ages = Vec::with_capacity(commands.len());
        let mut contributed = 0usize;
        for command in commands {
            max_ages.push(command.max_age());
            let data = command.etag_data();
            if !data.is_empty() {
                contributed += 1;
            }
            fragments.extend(data);
        }
        Self {
            max_age: max_ages.iter().copied().min().unwrap_or(DEFAULT_MAX_AGE),
            complete: contributed == commands.len(),
            fragments,
        }
    }

    /// Whether every command contributed at least one fragment.
    pub fn is_complete(&self) -> bool {
        self.complete
    }
}

/// Content fingerprint: md5-hex of the secret joined with the fragments.
pub fn content_etag(identity: &ServerIdentity, fragments: &[String]) -> String {
    let mut hasher = Md5::new();
    hasher.update(identity.secret().as_bytes());
    hasher.update(b"-");
    hasher.update(fragments.join("-").as_bytes());
    hex::encode(hasher.finalize())
}

/// What the dispatcher should do with a request's cache state.
#[derive(Debug)]
pub enum CacheDecision {
    /// The conditional header matched: answer 304, run nothing.
    NotModified,
    /// Serve normally with these headers.
    Fresh {
        etag: Option<String>,
        cache_control: String,
    },
}

/// Evaluate a request's conditional header against the command list.
pub fn evaluate(
    identity: &ServerIdentity,
    descriptor: &CacheDescriptor,
    if_none_match: Option<&str>,
) -> CacheDecision {
    let etag = descriptor
        .is_complete()
        .then(|| content_etag(identity, &descriptor.fragments));

    if let (Some(etag), Some(conditional)) = (&etag, if_none_match) {
        if conditional == etag {
            return CacheDecision::NotModified;
        }
    }

    CacheDecision::Fresh {
        etag,
        cache_control: format!("must-revalidate, max-age={}", descriptor.max_age),
    }
}
