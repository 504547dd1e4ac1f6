use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::SettingsStore;
use crate::error::StorageError;

#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemorySettingsStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }
}

#[async_trait]
impl SettingsStore for MemorySettingsStore {
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StorageError> {
        let values = self.values.read().await;
        Ok(keys
            .iter()
            .filter_map(|key| values.get(*key).map(|v| ((*key).to_string(), v.clone())))
            .collect())
    }

    async fn set(&self, values: HashMap<String, String>) -> Result<(), StorageError> {
        self.values.write().await.extend(values);
        Ok(())
    }
}
