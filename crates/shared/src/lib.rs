//! Shared types, errors, and configuration for MedalBank.
//!
//! This crate provides common types used across all other crates:
//! - Application-wide error types
//! - Configuration management
//! - Pagination types for list endpoints
//! - The placeholder token service used by the login flow

pub mod config;
pub mod error;
pub mod token;
pub mod types;

pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use token::{IssuedToken, OpaqueTokenService, TokenError, TokenService, VerifiedToken};
