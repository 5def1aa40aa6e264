//! Anti-forgery token issuance.
//!
//! Tokens are bound to the instance secret and to a one-minute time window,
//! so they expire quickly while tolerating clock granularity. Verification
//! belongs to the routing/command layer, which recomputes and compares.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use sha2::{Digest, Sha256};

use crate::security::{websafe_b64, ServerIdentity};

/// Issues time-windowed anti-forgery tokens derived from the server secret.
#[derive(Clone)]
pub struct CsrfTokenizer {
    identity: Arc<ServerIdentity>,
}

impl CsrfTokenizer {
    pub fn new(identity: Arc<ServerIdentity>) -> Self {
        Self { identity }
    }

    /// Generate a token for the current minute window.
    pub fn generate(&self) -> String {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        self.generate_at(now)
    }

    /// Generate a token for the minute window containing `epoch_secs`.
    ///
    /// Wire format: `<hex-epoch-minutes>-<websafe-hash>`.
    pub fn generate_at(&self, epoch_secs: u64) -> String {
        let window = format!("{:x}", epoch_secs / 60);
        let mut hasher = Sha256::new();
        hasher.update(self.identity.secret().as_bytes());
        hasher.update(b"-");
        hasher.update(window.as_bytes());
        format!("{}-{}", window, websafe_b64(&hasher.finalize()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer() -> CsrfTokenizer {
        CsrfTokenizer::new(Arc::new(ServerIdentity::generate()))
    }

    #[test]
    fn stable_within_a_minute_window() {
        let csrf = tokenizer();
        assert_eq!(csrf.generate_at(600), csrf.generate_at(659));
        assert_ne!(csrf.generate_at(600), csrf.generate_at(660));
    }

    #[test]
    fn wire_format() {
        let csrf = tokenizer();
        let token = csrf.generate_at(7200);
        let (window, hash) = token.split_once('-').expect("two parts");
        assert_eq!(u64::from_str_radix(window, 16).unwrap(), 7200 / 60);
        assert!(!hash.is_empty());
        assert!(!hash.contains('='));
    }

    #[test]
    fn bound_to_the_instance_secret() {
        let a = tokenizer();
        let b = tokenizer();
        assert_ne!(a.generate_at(600), b.generate_at(600));
    }
}
