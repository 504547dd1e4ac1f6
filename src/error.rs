use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// Every way a single summarization can fail. The `Display` text is what the
/// user sees in the result area.
#[derive(Error, Debug)]
pub enum SummaryError {
    #[error("无法在此页面上使用：请打开一个普通网页后重试")]
    RestrictedPage,
    #[error("该页面已有正在进行的总结请求，请稍候")]
    RequestInProgress,
    #[error("获取页面内容超时，请刷新页面后重试")]
    ExtractionTimeout,
    #[error("获取页面内容失败：{0}")]
    ExtractionFailed(String),
    #[error("页面没有可总结的文本内容")]
    EmptyContent,
    #[error("请先在设置页面填写 API 密钥、API 地址、模型名称和提示词模板")]
    SettingsMissing,
    #[error("API 请求超时，请稍后重试")]
    ApiTimeout,
    #[error("API 请求失败 ({status})：{detail}")]
    Api { status: u16, detail: String },
    #[error("API 返回格式错误：未找到总结内容")]
    ApiResponseFormat,
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("未知错误：{0}")]
    Unknown(String),
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("设置读写失败：{0}")]
    Io(#[from] std::io::Error),
    #[error("设置数据已损坏：{0}")]
    Format(#[from] serde_json::Error),
}

/// Errors surfaced by the HTTP layer itself.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    NotFound(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Internal Server Error: {0}")]
    InternalServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_type) = match &self {
            AppError::BadRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request_error"),
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found_error"),
            AppError::Storage(err) => {
                error!("Storage Error: {err}");
                (StatusCode::INTERNAL_SERVER_ERROR, "storage_error")
            }
            AppError::InternalServerError(message) => {
                error!("Internal Server Error: {message}");
                (StatusCode::INTERNAL_SERVER_ERROR, "api_error")
            }
        };

        let body = Json(json!({
            "type": "error",
            "error": {
                "type": error_type,
                "message": self.to_string()
            }
        }));

        (status, body).into_response()
    }
}
