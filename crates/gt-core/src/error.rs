//! # AppError
//!
//! Centralized error handling for the green-tips ecosystem.
//! Maps domain-specific failures to actionable error types.

use thiserror::Error;

/// The primary error type for all gt-core operations.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (e.g., Tip, City, User)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., empty title, unknown area id)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Latitude/longitude present but unparseable or out of range;
    /// ranking is never attempted for such a request
    #[error("invalid coordinate: {0}")]
    InvalidCoordinate(String),

    /// Missing or invalid credentials/token
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated, but not the owner of the resource being mutated
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Resource already exists (e.g., duplicate username)
    #[error("conflict: {0}")]
    Conflict(String),

    /// A collaborator (geo index, tip store) failed; the request cannot
    /// be partially served
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),

    /// Infrastructure failure
    #[error("internal service error: {0}")]
    Internal(String),
}

/// A specialized Result type for green-tips logic.
pub type Result<T> = std::result::Result<T, AppError>;
