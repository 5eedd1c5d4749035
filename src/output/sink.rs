//! Persists fetched resources into the mirror tree

use crate::output::stats::MirrorStats;
use crate::MirrorError;
use std::path::Path;
use std::sync::Arc;

/// Writes resource bytes to disk, creating parent directories first
///
/// Writes overwrite whatever is already at the path and are not atomic. Running
/// the same mirror twice therefore converges on the same tree.
#[derive(Debug, Clone)]
pub struct ResponseSink {
    stats: Arc<MirrorStats>,
}

impl ResponseSink {
    /// Creates a sink reporting into the given counters
    pub fn new(stats: Arc<MirrorStats>) -> Self {
        Self { stats }
    }

    /// Persists `bytes` at `path`
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The file was written
    /// * `Err(MirrorError::Io)` - Directory creation or the write failed; the
    ///   failure is counted and left to the caller to log
    pub async fn persist(&self, path: &Path, bytes: &[u8]) -> Result<(), MirrorError> {
        match write_file(path, bytes).await {
            Ok(()) => {
                self.stats.record_files_written(1);
                tracing::debug!("Saved {} ({} bytes)", path.display(), bytes.len());
                Ok(())
            }
            Err(source) => {
                self.stats.record_write_errors(1);
                Err(MirrorError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        }
    }
}

async fn write_file(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, bytes).await
}
