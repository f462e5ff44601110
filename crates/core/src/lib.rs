//! Shared domain types, error taxonomy and configuration for the civic
//! administration platform.

pub mod config;
pub mod error;
pub mod tenancy;
pub mod types;

pub use config::{AccessRulesFile, AppConfig};
pub use error::{CoreError, CoreResult};
