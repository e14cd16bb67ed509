//! # API Shared
//!
//! Shared utilities and definitions for the Clinica APIs.
//!
//! Contains:
//! - Wire types (`pb` module) used by the REST API and returned by `clinica-core` read models
//! - Shared services like `HealthService`
//! - API-key utilities used when resolving the acting staff member

pub mod auth;
pub mod health;
pub mod pb;

pub use health::HealthService;
pub use pb::*;
