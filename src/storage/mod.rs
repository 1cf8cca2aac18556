//! Filesystem-backed blob store for uploaded document files.
//!
//! Files land in a flat upload directory under a collision-resistant name,
//! `<nanosecond-timestamp>_<original-basename>`. Randomized names stand in
//! for locking: concurrent uploads never contend on a filename.

use std::io;
use std::path::{Path, PathBuf};

use chrono::Utc;
use tokio::fs::File;

#[derive(Clone, Debug)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// Open a fresh blob for writing and return its recorded path together
    /// with the file handle, so callers can stream uploads chunk by chunk
    /// instead of buffering them. The upload directory is created on demand.
    pub async fn create(&self, original_name: &str) -> io::Result<(String, File)> {
        tokio::fs::create_dir_all(&self.root).await?;

        let filename = Self::generate_name(original_name);
        let full_path = self.root.join(filename);
        let file = File::create(&full_path).await?;

        Ok((full_path.to_string_lossy().into_owned(), file))
    }

    /// Remove a stored blob. Callers treat failures as best-effort cleanup.
    pub async fn remove(&self, path: &str) -> io::Result<()> {
        tokio::fs::remove_file(path).await
    }

    fn generate_name(original_name: &str) -> String {
        let stamp = Utc::now().timestamp_nanos_opt().unwrap_or_default();
        format!("{}_{}", stamp, base_name(original_name))
    }
}

/// Strip any client-supplied directory components, keeping only the base
/// file name. Prevents traversal out of the upload directory.
pub fn base_name(name: &str) -> &str {
    Path::new(name)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload")
}
