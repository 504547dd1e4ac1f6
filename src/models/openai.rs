use serde::{Deserialize, Serialize, de::Deserializer};

// workaround for api providers which return null for these fields
fn deserialize_null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    T: Default + Deserialize<'de>,
    D: Deserializer<'de>,
{
    let opt = Option::deserialize(deserializer)?;
    Ok(opt.unwrap_or_default())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIMessage {
    pub role: String,
    pub content: String,
}

impl OpenAIMessage {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OpenAIRequest {
    pub model: String,
    pub messages: Vec<OpenAIMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenAIResponse {
    #[serde(default, deserialize_with = "deserialize_null_as_default")]
    pub choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenAIChoice {
    #[serde(default)]
    pub message: Option<OpenAIResponseMessage>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct OpenAIResponseMessage {
    #[serde(default)]
    pub content: Option<String>,
}

impl OpenAIResponse {
    /// Text of the first completion, if the provider returned any.
    #[must_use]
    pub fn first_content(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|choice| choice.message.as_ref())
            .and_then(|message| message.content.as_deref())
            .filter(|content| !content.trim().is_empty())
    }
}

/// Error envelope shapes seen from OpenAI-compatible providers.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpenAIErrorBody {
    Nested { error: OpenAIErrorDetail },
    Flat { message: String },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OpenAIErrorDetail {
    Object { message: String },
    Text(String),
}

impl OpenAIErrorBody {
    #[must_use]
    pub fn into_message(self) -> String {
        match self {
            Self::Nested {
                error: OpenAIErrorDetail::Object { message } | OpenAIErrorDetail::Text(message),
            }
            | Self::Flat { message } => message,
        }
    }
}
