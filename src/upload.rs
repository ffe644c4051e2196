//! Transient storage for uploaded files.
//!
//! Each upload is written under a fresh UUID so concurrent requests carrying the same client file
//! name never collide. The [`TransientUpload`] guard removes the file when it is dropped, which
//! covers every exit path of a request handler exactly once.

use crate::document::DocumentFormat;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// A file written to the upload directory for the lifetime of one request.
#[derive(Debug)]
pub struct TransientUpload {
    path: PathBuf,
    original_name: String,
    format: DocumentFormat,
}

impl TransientUpload {
    /// Persist `bytes` under a request-unique name inside `dir`, creating the directory if needed.
    pub async fn persist(dir: &Path, original_name: &str, bytes: &[u8]) -> io::Result<Self> {
        tokio::fs::create_dir_all(dir).await?;

        let format = DocumentFormat::from_file_name(original_name);
        let file_name = match format.extension() {
            Some(extension) => format!("{}.{extension}", Uuid::new_v4()),
            None => Uuid::new_v4().to_string(),
        };
        let path = dir.join(file_name);

        // Construct the guard before writing so a failed write still cleans up.
        let upload = Self {
            path,
            original_name: original_name.to_string(),
            format,
        };
        tokio::fs::write(&upload.path, bytes).await?;
        tracing::debug!(
            path = %upload.path.display(),
            original_name,
            bytes = bytes.len(),
            "Stored transient upload"
        );
        Ok(upload)
    }

    /// Location of the transient file on disk.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name supplied by the client.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Format declared by the client file name.
    pub fn format(&self) -> DocumentFormat {
        self.format
    }
}

impl Drop for TransientUpload {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed transient upload"),
            Err(error) if error.kind() == io::ErrorKind::NotFound => {}
            Err(error) => tracing::warn!(
                path = %self.path.display(),
                error = %error,
                "Failed to remove transient upload"
            ),
        }
    }
}
