//! Error types for imgdiff.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that stop a comparison before an outcome can be decided.
#[derive(Error, Debug)]
pub enum Error {
    /// An input image could not be opened or decoded.
    #[error("{}: {}", .path.display(), .source)]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The diff image could not be encoded or written.
    #[error("{}: {}", .path.display(), .source)]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Result type alias for imgdiff operations.
pub type Result<T> = std::result::Result<T, Error>;
