use std::{
    collections::HashMap,
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use tokio::{fs, sync::Mutex};
use tracing::debug;

use super::SettingsStore;
use crate::error::StorageError;

/// Settings persisted as one JSON object on disk.
#[derive(Debug)]
pub struct FileSettingsStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileSettingsStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        match fs::read(&self.path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(HashMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(HashMap::new()),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl SettingsStore for FileSettingsStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StorageError> {
        let mut all = self.read_all().await?;
        Ok(keys
            .iter()
            .filter_map(|key| all.remove(*key).map(|v| ((*key).to_string(), v)))
            .collect())
    }

    async fn set(&self, values: HashMap<String, String>) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;
        let mut all = self.read_all().await?;
        all.extend(values);

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(&all)?).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!("Settings written to {}", self.path.display());
        Ok(())
    }
}
