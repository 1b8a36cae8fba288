//! Infrastructure - configuration and errors
//!
//! - `config` - Application configuration (TOML loading, env secrets, defaults)
//! - `error` - Error types for each stage of a run

pub mod config;
pub mod error;

// Re-export commonly used types
pub use config::Config;
pub use error::{ApiError, AuthenticationError, DeliveryError, FetchError, RenderError, ReportError};
