//! Control-plane REST client for the reelpost API.
//!
//! Thin wrapper around the versioned JSON API: auth injection, query-string
//! building, rate-limit header accessors, and the signature endpoints that
//! feed the upload engine in `reelpost-upload`.

pub mod client;
pub mod config;
pub mod validation;

pub use client::{Client, RateLimit};
pub use config::Config;

/// Errors produced by the control-plane client.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The API returned a recognized non-success status.
    #[error("API returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The API returned a status outside the documented set.
    #[error("unknown response from API ({status}): {body}")]
    Unknown { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("upload error: {0}")]
    Upload(#[from] reelpost_upload::UploadError),
}
