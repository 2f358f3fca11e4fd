//! Hashed copy service implementation
//!
//! This module provides [`CopyService`], which copies files and directory trees into a
//! destination root while recording a SHA-256 digest for every file it touches.
//!
//! # Destination Layout
//!
//! ```text
//! <root>/                      # validated at construction
//! └── <target_dir>/            # any directory inside the root
//!     ├── <file name>          # copy_file
//!     └── <source dir name>/   # copy_tree, recursive
//! ```
//!
//! # Overwrite Rules
//!
//! - Identical content (same SHA-256) at the destination is reported as
//!   [`CopyOutcome::Unchanged`] and not rewritten
//! - Different content is overwritten and reported as [`CopyOutcome::Copied`]
//! - `copy_tree` refuses to merge into an existing directory
//!
//! # Implementation Notes
//!
//! - The service holds only the canonical root path
//! - Target directories are canonicalised before use, so `..` and symlinks cannot escape the root
//! - Files are read fully into memory for hashing and media type detection

use crate::FilesError;
use chrono::{DateTime, Utc};
use nidata_types::{NonEmptyText, Sha256Hash};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};

/// Whether a copy wrote new bytes to the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CopyOutcome {
    /// Destination was created or overwritten
    Copied,
    /// Destination already held identical content
    Unchanged,
}

/// Record of a single copied file
///
/// Serialises to JSON/YAML so deposit reports can be written next to the copied data.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
pub struct CopiedFile {
    /// Hashing algorithm used (always "sha256")
    pub hash_algorithm: NonEmptyText,

    /// Hexadecimal digest of the file content
    pub hash: Sha256Hash,

    /// Path the bytes were read from
    pub source: PathBuf,

    /// Path the bytes were written to
    pub destination: PathBuf,

    /// Size of the file in bytes
    pub size_bytes: u64,

    /// Detected media type (MIME type), if available
    ///
    /// Best-effort detection from magic bytes. NIfTI and MGZ volumes usually report
    /// `None` or `application/gzip`.
    pub media_type: Option<NonEmptyText>,

    /// Original filename from the source path
    pub original_filename: NonEmptyText,

    /// UTC timestamp of the copy
    pub copied_at: DateTime<Utc>,

    /// Whether bytes were written
    pub outcome: CopyOutcome,
}

/// Service for copying files into a destination root
///
/// # Design
///
/// - Root-scoped: each instance is bound to one destination root
/// - Content-aware: files are hashed and identical destinations are skipped
/// - Bounded: target directories outside the root are rejected
#[derive(Debug)]
pub struct CopyService {
    /// Canonical destination root
    root_directory: PathBuf,
}

impl CopyService {
    /// Creates a new `CopyService` for a destination root
    ///
    /// # Arguments
    ///
    /// * `root_directory` - Existing directory that all copies must land in
    ///
    /// # Errors
    ///
    /// Returns `FilesError::InvalidRootDirectory` if:
    /// - The root directory does not exist or is not a directory
    /// - Path canonicalisation fails
    pub fn new(root_directory: &Path) -> Result<Self, FilesError> {
        if !root_directory.exists() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Directory does not exist: {}",
                root_directory.display()
            )));
        }

        if !root_directory.is_dir() {
            return Err(FilesError::InvalidRootDirectory(format!(
                "Path is not a directory: {}",
                root_directory.display()
            )));
        }

        let root_directory = root_directory.canonicalize().map_err(|e| {
            FilesError::InvalidRootDirectory(format!(
                "Cannot canonicalize path {}: {}",
                root_directory.display(),
                e
            ))
        })?;

        Ok(Self { root_directory })
    }

    /// Returns the canonical destination root
    #[must_use]
    pub fn root_directory(&self) -> &Path {
        &self.root_directory
    }

    /// Copies one file into `target_dir`, keeping its file name
    ///
    /// # Arguments
    ///
    /// * `source_path` - Regular file to copy
    /// * `target_dir` - Existing directory inside the root
    ///
    /// # Returns
    ///
    /// `CopiedFile` describing the copy. `outcome` is `Unchanged` when the destination
    /// already held identical bytes.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `target_dir` is outside the root or cannot be canonicalised
    /// - The source has no usable file name
    /// - The source cannot be read or the destination cannot be written (I/O)
    pub fn copy_file(&self, source_path: &Path, target_dir: &Path) -> Result<CopiedFile, FilesError> {
        let target_dir = self.ensure_within_root(target_dir)?;
        self.copy_file_unchecked(source_path, &target_dir)
    }

    /// Recursively copies `source_dir` to `target_dir/<source_dir name>`
    ///
    /// # Returns
    ///
    /// One `CopiedFile` per regular file found under `source_dir`, in traversal order.
    ///
    /// # Errors
    ///
    /// Returns `FilesError` if:
    /// - `target_dir` is outside the root
    /// - `source_dir` has no final path segment
    /// - The destination directory already exists (`DestinationExists`)
    /// - Any directory creation or file copy fails (I/O)
    pub fn copy_tree(
        &self,
        source_dir: &Path,
        target_dir: &Path,
    ) -> Result<Vec<CopiedFile>, FilesError> {
        let target_dir = self.ensure_within_root(target_dir)?;

        let dir_name = source_dir.file_name().ok_or_else(|| {
            FilesError::InvalidPath(format!(
                "Source directory has no final segment: {}",
                source_dir.display()
            ))
        })?;

        let destination = target_dir.join(dir_name);
        if destination.exists() {
            return Err(FilesError::DestinationExists(
                destination.display().to_string(),
            ));
        }

        let mut copied = Vec::new();
        self.copy_tree_into(source_dir, &destination, &mut copied)?;
        Ok(copied)
    }

    fn copy_tree_into(
        &self,
        src: &Path,
        dst: &Path,
        copied: &mut Vec<CopiedFile>,
    ) -> Result<(), FilesError> {
        fs::create_dir_all(dst).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!("Failed to create directory {}: {}", dst.display(), e),
            ))
        })?;

        let mut entries = fs::read_dir(src)?
            .map(|entry| entry.and_then(|e| Ok((e.path(), e.file_type()?))))
            .collect::<Result<Vec<_>, _>>()?;
        entries.sort_by(|a, b| a.0.cmp(&b.0));

        // Symlinked directories are not followed; symlinked files are copied by content.
        for (path, ty) in entries {
            if ty.is_dir() {
                let name = path.file_name().ok_or_else(|| {
                    FilesError::InvalidPath(format!("Unnamed directory entry: {}", path.display()))
                })?;
                self.copy_tree_into(&path, &dst.join(name), copied)?;
            } else if ty.is_file() || (ty.is_symlink() && path.is_file()) {
                copied.push(self.copy_file_unchecked(&path, dst)?);
            } else {
                tracing::debug!("not copying {}", path.display());
            }
        }

        Ok(())
    }

    fn copy_file_unchecked(
        &self,
        source_path: &Path,
        target_dir: &Path,
    ) -> Result<CopiedFile, FilesError> {
        let file_name = source_path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NonEmptyText::new(n).ok())
            .ok_or_else(|| {
                FilesError::InvalidPath(format!(
                    "Source has no usable file name: {}",
                    source_path.display()
                ))
            })?;

        let buffer = fs::read(source_path).map_err(|e| {
            FilesError::Io(std::io::Error::new(
                e.kind(),
                format!(
                    "Failed to read source file {}: {}",
                    source_path.display(),
                    e
                ),
            ))
        })?;

        let hash = digest(&buffer);
        let destination = target_dir.join(file_name.as_str());

        let unchanged = destination.is_file() && sha256_file(&destination)? == hash;
        let outcome = if unchanged {
            tracing::debug!("unchanged {}", destination.display());
            CopyOutcome::Unchanged
        } else {
            fs::write(&destination, &buffer).map_err(|e| {
                FilesError::Io(std::io::Error::new(
                    e.kind(),
                    format!("Failed to write file to {}: {}", destination.display(), e),
                ))
            })?;
            tracing::debug!("copied {} -> {}", source_path.display(), destination.display());
            CopyOutcome::Copied
        };

        let media_type = infer::get(&buffer).and_then(|kind| NonEmptyText::new(kind.mime_type()).ok());

        Ok(CopiedFile {
            hash_algorithm: NonEmptyText::new("sha256")
                .map_err(|_| FilesError::InvalidPath("empty hash algorithm".into()))?,
            hash,
            source: source_path.to_path_buf(),
            destination,
            size_bytes: buffer.len() as u64,
            media_type,
            original_filename: file_name,
            copied_at: Utc::now(),
            outcome,
        })
    }

    /// Canonicalises `dir` and checks it lies inside the root.
    fn ensure_within_root(&self, dir: &Path) -> Result<PathBuf, FilesError> {
        let canonical = dir.canonicalize().map_err(|e| {
            FilesError::InvalidPath(format!("Cannot canonicalize path {}: {}", dir.display(), e))
        })?;

        if !canonical.starts_with(&self.root_directory) {
            return Err(FilesError::InvalidPath(format!(
                "{} is outside destination root {}",
                canonical.display(),
                self.root_directory.display()
            )));
        }

        Ok(canonical)
    }
}

/// Computes the SHA-256 digest of a file on disk
///
/// # Errors
///
/// Returns `FilesError::Io` if the file cannot be read.
pub fn sha256_file(path: &Path) -> Result<Sha256Hash, FilesError> {
    let buffer = fs::read(path).map_err(|e| {
        FilesError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read file {}: {}", path.display(), e),
        ))
    })?;
    Ok(digest(&buffer))
}

fn digest(buffer: &[u8]) -> Sha256Hash {
    let mut hasher = Sha256::new();
    hasher.update(buffer);
    let hash_array: [u8; 32] = hasher.finalize().into();
    Sha256Hash::from_bytes(&hash_array)
}
