//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, admission, per-request dispatch)
//!     → request.rs (context extraction, body parsing, request IDs)
//!     → assets.rs (static short-circuit)  |  routing collaborator
//!     → cache.rs (ETag negotiation, 304 short-circuit)
//!     → response.rs (headers, cookies, error forms)
//!     → Send to client
//! ```

pub mod assets;
pub mod cache;
pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, RequestContext, X_REQUEST_ID};
pub use server::HttpServer;
