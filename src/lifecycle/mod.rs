//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Generate identity → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop accepting → In-flight requests finish → Exit
//! ```
//!
//! # Design Decisions
//! - Shutdown is a broadcast signal plus a readable flag; the flag is what
//!   polling loops (quiesce wait) observe
//! - Workers are never cancelled mid-request; the accept loop stops first

pub mod shutdown;

pub use shutdown::Shutdown;
