//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Server construction:
//!     identity.rs (secret + randomized cookie name, fixed for the process)
//!
//! Per request:
//!     csrf.rs (time-windowed token derived from the secret)
//! ```
//!
//! # Design Decisions
//! - Every derived value (cookie name, session id, CSRF token, ETag) mixes
//!   in the secret so nothing is correlatable across instances
//! - Web-safe base64 everywhere a token can end up in a URL or header

pub mod csrf;
pub mod identity;

pub use csrf::CsrfTokenizer;
pub use identity::ServerIdentity;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;

/// URL- and header-safe base64 without padding.
pub(crate) fn websafe_b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}
