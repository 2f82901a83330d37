//! Raw memory image files.
//!
//! An image is a headerless byte stream holding the initial memory contents
//! from offset 0. Fitting it to memory capacity is the memory's concern;
//! this module only moves bytes between disk and RAM.

use std::path::Path;
use thiserror::Error;

/// Load an image file from disk.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, ImageError> {
    let path = path.as_ref();
    std::fs::read(path).map_err(|e| ImageError::ReadError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Save an image file to disk.
pub fn save_image<P: AsRef<Path>>(path: P, image: &[u8]) -> Result<(), ImageError> {
    let path = path.as_ref();
    std::fs::write(path, image).map_err(|e| ImageError::WriteError {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Errors that can occur during image file operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    #[error("could not read {path}: {message}")]
    ReadError { path: String, message: String },

    #[error("could not write {path}: {message}")]
    WriteError { path: String, message: String },
}
