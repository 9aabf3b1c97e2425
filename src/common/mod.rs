//! Common utilities and types shared across minikv-admin

pub mod auth;
pub mod config;
pub mod error;
pub mod utils;

pub use auth::Credential;
pub use config::Config;
pub use error::{Error, Result};
pub use utils::parse_duration;
