//! Helios CDR Core Library
//!
//! This crate provides the foundational types, traits, and error handling
//! for the Helios CDR rating system. It includes:
//!
//! - Domain models (CallRecord, CallPattern, Quota, UserQuota)
//! - Repository traits for the persistence collaborators
//! - Unified error handling
//! - Application configuration

pub mod config;
pub mod error;
pub mod models;
pub mod traits;

pub use config::AppConfig;
pub use error::AppError;

/// Result type alias using AppError
pub type AppResult<T> = Result<T, AppError>;
