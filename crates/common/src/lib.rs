//! Course Cupid Common Library
//!
//! Shared code for the Course Cupid chat service:
//! - SeaORM entities and the repository over the session/transcript tables
//! - Identifier classification (assistant session vs paper code)
//! - Access policy for session transcripts
//! - Error types and handling
//! - Configuration management
//! - Caller identity extraction
//! - Metrics registration

pub mod auth;
pub mod config;
pub mod db;
pub mod errors;
pub mod identifier;
pub mod metrics;
pub mod policy;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::Repository;
pub use errors::{AppError, Result};
pub use identifier::{classify, ChatIdentifier};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default chat completion model for the paper responder
pub const DEFAULT_RESPONDER_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
