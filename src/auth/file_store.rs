use crate::error::{
    BouncerResult, ReadSessionFileSnafu, RemoveSessionFileSnafu, SessionJsonSnafu,
    WriteSessionFileSnafu,
};
use async_trait::async_trait;
use snafu::ResultExt;
use std::{collections::BTreeMap, fmt::Debug, io::ErrorKind, path::PathBuf};
use tokio::sync::Mutex;

/// Raw key/value entries, stored the way a browser keeps `localStorage`: every value is a string.
pub type StoredEntries = BTreeMap<String, String>;

/// Durable home of the persisted session. Entries are always written and cleared together.
#[async_trait]
pub trait SessionStorage: Debug + Send + Sync {
    /// `Ok(None)` when nothing has been persisted yet.
    async fn load(&self) -> BouncerResult<Option<StoredEntries>>;
    async fn save(&self, entries: &StoredEntries) -> BouncerResult<()>;
    async fn clear(&self) -> BouncerResult<()>;
}

/// Keeps the entries as one JSON object in a file, replaced atomically on every save.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub const fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl SessionStorage for FileSessionStore {
    async fn load(&self) -> BouncerResult<Option<StoredEntries>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(source).context(ReadSessionFileSnafu {
                    path: self.path.clone(),
                });
            }
        };

        serde_json::from_slice(&bytes)
            .context(SessionJsonSnafu)
            .map(Some)
    }

    async fn save(&self, entries: &StoredEntries) -> BouncerResult<()> {
        let serialised = serde_json::to_vec_pretty(entries).context(SessionJsonSnafu)?;
        let temp_path = self.temp_path();

        tokio::fs::write(&temp_path, serialised)
            .await
            .context(WriteSessionFileSnafu {
                path: temp_path.clone(),
            })?;
        tokio::fs::rename(&temp_path, &self.path)
            .await
            .context(WriteSessionFileSnafu {
                path: self.path.clone(),
            })?;

        Ok(())
    }

    async fn clear(&self) -> BouncerResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(source).context(RemoveSessionFileSnafu {
                path: self.path.clone(),
            }),
        }
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    entries: Mutex<Option<StoredEntries>>,
}

impl MemorySessionStore {
    #[cfg(test)]
    pub fn with_entries(entries: StoredEntries) -> Self {
        Self {
            entries: Mutex::new(Some(entries)),
        }
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStore {
    async fn load(&self) -> BouncerResult<Option<StoredEntries>> {
        Ok(self.entries.lock().await.clone())
    }

    async fn save(&self, entries: &StoredEntries) -> BouncerResult<()> {
        *self.entries.lock().await = Some(entries.clone());
        Ok(())
    }

    async fn clear(&self) -> BouncerResult<()> {
        *self.entries.lock().await = None;
        Ok(())
    }
}
