//! Signed direct-to-storage upload engine.
//!
//! Transfers a local file to a remote object-storage endpoint using a
//! server-issued, time-limited upload authorization. Small files go up as a
//! single `multipart/form-data` POST; chunked signatures split the file into
//! ordered parts, each posted as its own request with the part index
//! appended to the object key.

pub mod plan;
pub mod progress;
pub mod signature;
pub mod uploader;
pub mod validation;

pub use plan::{UploadPlan, UploadUnit, plan};
pub use progress::{ProgressCallback, ProgressEvent, ProgressReporter};
pub use signature::UploadSignature;
pub use uploader::ChunkUploader;

/// Identity reported to the storage endpoint via `x-amz-meta-uploader`.
pub const UPLOADER: &str = "reelpost-rust-sdk";

/// SDK version reported alongside [`UPLOADER`].
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");

/// One mebibyte, the unit [`MULTIPART_MIN_SIZE`] is expressed in.
pub const ONE_MB: u64 = 1024 * 1024;

/// Files at or above this size get a multipart (chunked) signature.
pub const MULTIPART_MIN_SIZE: u64 = 5 * ONE_MB;

/// Errors produced by the upload engine.
#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    /// A local precondition failed before any network call was made.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The storage endpoint returned something other than `201 Created`.
    #[error("storage endpoint returned {status}: {body}")]
    Storage { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
