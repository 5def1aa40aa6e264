//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → shared via Arc with every request's Session
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; the wider application owns the real
//!   configuration store, this is only the server-facing slice
//! - All fields have defaults so an empty file is a working config
//! - Debug mode lives here and is passed explicitly, never read from a
//!   process-wide global

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::load_config;
pub use schema::ServerConfig;
