//! Routing subsystem: the seams to the external command map.
//!
//! # Data Flow
//! ```text
//! RequestContext + Session
//!     → router.rs (CommandRouter: path → ordered command list)
//!     → command.rs (Command: run / max_age / etag_data / hanging flag)
//!     → Dispatcher executes and renders
//! ```

pub mod command;
pub mod router;

pub use command::{Command, CommandError, CommandOutcome, CommandResult};
pub use router::{CommandRouter, RouteError};
