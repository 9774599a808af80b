use kanban_core::{KanbanError, KanbanResult};
use std::io::{ErrorKind, Write};
use std::path::Path;
use tokio::fs;

/// Write-to-temp-then-rename file writes, so a reader never observes a
/// half-written document.
pub struct AtomicWriter;

impl AtomicWriter {
    /// Replace `path` with `data`. Creates missing parent directories.
    pub async fn write_atomic(path: &Path, data: &[u8]) -> KanbanResult<()> {
        // Temp file must share the target's filesystem for rename to be atomic
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => Path::new(".").to_path_buf(),
        };
        fs::create_dir_all(&parent).await?;

        let target = path.to_path_buf();
        let bytes = data.to_vec();
        tokio::task::spawn_blocking(move || -> KanbanResult<()> {
            let mut temp = tempfile::NamedTempFile::new_in(&parent)?;
            temp.write_all(&bytes)?;
            temp.as_file().sync_all()?;
            temp.persist(&target).map_err(|e| KanbanError::Io(e.error))?;
            Ok(())
        })
        .await
        .map_err(|e| KanbanError::Internal(format!("atomic write task failed: {}", e)))??;

        tracing::debug!("Atomically wrote {} bytes to {}", data.len(), path.display());
        Ok(())
    }

    /// Read a whole file, `None` when it does not exist yet.
    pub async fn read_optional(path: &Path) -> KanbanResult<Option<Vec<u8>>> {
        match fs::read(path).await {
            Ok(data) => {
                tracing::debug!("Read {} bytes from {}", data.len(), path.display());
                Ok(Some(data))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
