//! nidata file copying
//!
//! This crate is the file-copy collaborator used when depositing pipeline results into a
//! structured output tree.
//!
//! ## Copy Semantics
//!
//! - Every copied file is hashed with SHA-256
//! - A destination file whose content hash already matches the source is left untouched
//! - A destination file with different content is overwritten
//! - Directory copies never merge into an existing destination directory
//! - All destinations must lie inside the root the service was created for
//!
//! ## Example Usage
//!
//! ```no_run
//! use nidata_files::CopyService;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let service = CopyService::new(Path::new("derivatives/s01"))?;
//! let copied = service.copy_file(Path::new("work/brain.nii"), Path::new("derivatives/s01/anat"))?;
//! println!("{} -> {}", copied.hash, copied.destination.display());
//! # Ok(())
//! # }
//! ```

mod files;

pub use files::{sha256_file, CopiedFile, CopyOutcome, CopyService};
pub use nidata_types::Sha256Hash;

/// Errors that can occur during copy operations
#[derive(Debug, thiserror::Error)]
pub enum FilesError {
    /// Root directory does not exist or is not a directory
    #[error("Invalid root directory: {0}")]
    InvalidRootDirectory(String),

    /// Path validation failed (outside the root, or no usable file name)
    #[error("Invalid path: {0}")]
    InvalidPath(String),

    /// Directory copy target already exists
    #[error("Destination already exists: {0}")]
    DestinationExists(String),

    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
