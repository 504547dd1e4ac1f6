mod file;
mod memory;

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageError;

pub use self::{file::FileSettingsStore, memory::MemorySettingsStore};

pub const API_KEY: &str = "apiKey";
pub const API_HOST: &str = "apiHost";
pub const MODEL_NAME: &str = "modelName";
pub const PROMPT_TEMPLATE: &str = "promptTemplate";

pub const SETTING_KEYS: [&str; 4] = [API_KEY, API_HOST, MODEL_NAME, PROMPT_TEMPLATE];

/// Literal marker in the prompt template that receives the page text.
pub const CONTENT_PLACEHOLDER: &str = "{{content}}";

pub const DEFAULT_API_HOST: &str = "https://api.openai.com";
pub const DEFAULT_MODEL_NAME: &str = "gpt-3.5-turbo";
pub const DEFAULT_PROMPT_TEMPLATE: &str = "请用中文总结以下网页内容：\n\n{{content}}";

/// Durable key-value store holding the four settings. Implementations do no
/// validation of their own.
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// Returns the stored values for `keys`; missing keys are simply absent.
    async fn get(&self, keys: &[&str]) -> Result<HashMap<String, String>, StorageError>;

    /// Writes every entry of `values`, leaving other keys untouched.
    async fn set(&self, values: HashMap<String, String>) -> Result<(), StorageError>;
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub api_key: String,
    pub api_host: String,
    pub model_name: String,
    pub prompt_template: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsProblem {
    MissingApiKey,
    MissingApiHost,
    MissingModelName,
    MissingPromptTemplate,
    MissingPlaceholder,
}

impl std::fmt::Display for SettingsProblem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::MissingApiKey => "请填写 API 密钥",
            Self::MissingApiHost => "请填写 API 地址",
            Self::MissingModelName => "请填写模型名称",
            Self::MissingPromptTemplate => "请填写提示词模板",
            Self::MissingPlaceholder => "提示词模板必须包含 {{content}} 占位符",
        };
        f.write_str(text)
    }
}

impl Settings {
    /// # Errors
    ///
    /// Propagates the store's failure unchanged.
    pub async fn load(store: &dyn SettingsStore) -> Result<Self, StorageError> {
        let mut values = store.get(&SETTING_KEYS).await?;
        let mut take = |key: &str| values.remove(key).unwrap_or_default();
        Ok(Self {
            api_key: take(API_KEY),
            api_host: take(API_HOST),
            model_name: take(MODEL_NAME),
            prompt_template: take(PROMPT_TEMPLATE),
        })
    }

    /// # Errors
    ///
    /// Propagates the store's failure unchanged.
    pub async fn save(&self, store: &dyn SettingsStore) -> Result<(), StorageError> {
        store.set(self.to_map()).await
    }

    /// Keeps the stored API key when the submitted one is blank, so forms
    /// never need to echo the secret back.
    ///
    /// # Errors
    ///
    /// Propagates the store's failure unchanged.
    pub async fn or_stored_key(mut self, store: &dyn SettingsStore) -> Result<Self, StorageError> {
        if !self.api_key.trim().is_empty() {
            return Ok(self);
        }
        if let Some(key) = store.get(&[API_KEY]).await?.remove(API_KEY) {
            self.api_key = key;
        }
        Ok(self)
    }

    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        HashMap::from([
            (API_KEY.to_string(), self.api_key.clone()),
            (API_HOST.to_string(), self.api_host.clone()),
            (MODEL_NAME.to_string(), self.model_name.clone()),
            (PROMPT_TEMPLATE.to_string(), self.prompt_template.clone()),
        ])
    }

    /// True when none of the four fields is blank.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        [
            &self.api_key,
            &self.api_host,
            &self.model_name,
            &self.prompt_template,
        ]
        .iter()
        .all(|value| !value.trim().is_empty())
    }

    /// Checks the rules the settings form enforces before saving.
    ///
    /// # Errors
    ///
    /// Returns the first problem found, in form field order.
    pub fn validate(&self) -> Result<(), SettingsProblem> {
        if self.api_key.trim().is_empty() {
            return Err(SettingsProblem::MissingApiKey);
        }
        if self.api_host.trim().is_empty() {
            return Err(SettingsProblem::MissingApiHost);
        }
        if self.model_name.trim().is_empty() {
            return Err(SettingsProblem::MissingModelName);
        }
        if self.prompt_template.trim().is_empty() {
            return Err(SettingsProblem::MissingPromptTemplate);
        }
        if !self.prompt_template.contains(CONTENT_PLACEHOLDER) {
            return Err(SettingsProblem::MissingPlaceholder);
        }
        Ok(())
    }

    /// Substitutes every placeholder occurrence with `content`. Plain
    /// substring replacement over the template only, so `content` is never
    /// rescanned.
    #[must_use]
    pub fn render_prompt(&self, content: &str) -> String {
        self.prompt_template.replace(CONTENT_PLACEHOLDER, content)
    }

    /// Empty fields replaced by the values an empty form starts with. The API
    /// key has no default.
    #[must_use]
    pub fn with_form_defaults(mut self) -> Self {
        if self.api_host.is_empty() {
            self.api_host = DEFAULT_API_HOST.to_string();
        }
        if self.model_name.is_empty() {
            self.model_name = DEFAULT_MODEL_NAME.to_string();
        }
        if self.prompt_template.is_empty() {
            self.prompt_template = DEFAULT_PROMPT_TEMPLATE.to_string();
        }
        self
    }
}
