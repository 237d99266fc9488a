//! Description of one upload.

use std::path::{Path, PathBuf};

/// One file to transfer, plus the repository coordinates involved.
///
/// `target` names the version being created; `reference` names the stored
/// version whose signature the diff runs against (typically the previous
/// version of the same artifact).
#[derive(Clone, Debug)]
pub struct UploadRequest {
    file: PathBuf,
    target: String,
    reference: String,
}

impl UploadRequest {
    /// Describes an upload of `file` creating `target`, diffed against
    /// `reference`.
    pub fn new(
        file: impl Into<PathBuf>,
        target: impl Into<String>,
        reference: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            target: target.into(),
            reference: reference.into(),
        }
    }

    /// Local path of the file to upload.
    #[must_use]
    pub fn file(&self) -> &Path {
        &self.file
    }

    /// Coordinate of the version being created.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Coordinate of the stored version to diff against.
    #[must_use]
    pub fn reference(&self) -> &str {
        &self.reference
    }
}
