//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → accept loop (axum::serve, graceful shutdown)
//!     → gate.rs (admission, in-flight accounting, quiesce)
//!     → Hand off to HTTP dispatcher
//! ```
//!
//! # Design Decisions
//! - Accept-time socket errors are swallowed by the serve loop, never fatal
//! - Each admitted request is tracked by an RAII guard for quiescing

pub mod gate;

pub use gate::ConcurrencyGate;
