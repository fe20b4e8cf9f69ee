//! Persistence for the last announced video id.

use std::path::PathBuf;

use serenity::async_trait;

use crate::common::error::StateError;

/// Get/set storage for the last-seen video id.
#[async_trait]
pub trait LastSeenStore: Send + Sync {
    async fn load(&self) -> Result<Option<String>, StateError>;

    async fn save(&self, video_id: &str) -> Result<(), StateError>;
}

/// Stores the id as the whole content of a text file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, source: std::io::Error) -> StateError {
        StateError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[async_trait]
impl LastSeenStore for FileStore {
    async fn load(&self) -> Result<Option<String>, StateError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => {
                let id = content.trim();
                Ok((!id.is_empty()).then(|| id.to_string()))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    async fn save(&self, video_id: &str) -> Result<(), StateError> {
        // Write beside the target, then rename over it
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, video_id)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_empty_state() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::new(dir.path().join("last_video_id.txt"));
        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("last_video_id.txt");
        let store = FileStore::new(&path);

        store.save("abc123").await.unwrap();
        store.save("def456").await.unwrap();

        assert_eq!(store.load().await.unwrap().as_deref(), Some("def456"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "def456");
        assert!(!dir.path().join("last_video_id.txt.tmp").exists());
    }

    #[tokio::test]
    async fn test_whitespace_is_trimmed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("state");
        std::fs::write(&path, "  xyz\n").unwrap();

        let store = FileStore::new(&path);
        assert_eq!(store.load().await.unwrap().as_deref(), Some("xyz"));
    }

    #[tokio::test]
    async fn test_unwritable_location_errors() {
        let store = FileStore::new("/nonexistent/dir/state");
        let result = store.save("abc").await;
        assert!(matches!(result, Err(StateError::Io { .. })));
    }
}
