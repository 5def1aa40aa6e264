//! Request-handling core of a local, single-instance web server.
//!
//! Built to sit inside a desktop application: it accepts HTTP connections,
//! establishes per-visitor session identity via a randomly-named cookie,
//! throttles concurrent work, negotiates cache validity, issues
//! anti-forgery tokens and serves theme assets safely. The command map and
//! the template engine are collaborators supplied by the embedding
//! application (see [`routing::CommandRouter`] and
//! [`http::response::Renderer`]).
//!
//! ```text
//! connection accepted
//!     → dispatcher (http/server.rs)
//!     → gate.enter()                         net/gate.rs
//!     → session resolved, csrf issued        session/, security/
//!     → static path? → assets.rs and done
//!     → router.map() → commands              routing/
//!     → cache negotiation (maybe 304)        http/cache.rs
//!     → commands run → renderer → response   http/response.rs
//!     → gate released
//! ```

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod net;
pub mod observability;
pub mod routing;
pub mod security;
pub mod session;

pub use config::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
