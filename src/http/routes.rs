use axum::{
    Json as JsonExtractor,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    models::{Envelope, Message},
    settings::Settings,
    tabs::{Tab, TabHost, TabId},
    utils::mask_secret,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReplyRouting {
    tab_id: Option<TabId>,
    request_id: Option<Uuid>,
}

/// Single entry point for the extension message protocol.
///
/// # Errors
///
/// [`AppError::BadRequest`] for unknown messages, a `GET_PAGE_CONTENT` without
/// routing fields, or a `SUMMARY_RESULT` sent by a client.
pub async fn handle_message(
    State(state): State<AppState>,
    JsonExtractor(payload): JsonExtractor<Value>,
) -> Result<Response, AppError> {
    let routing: ReplyRouting = serde_json::from_value(payload.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid routing fields: {e}")))?;
    let message: Message = serde_json::from_value(payload)
        .map_err(|e| AppError::BadRequest(format!("Unknown message: {e}")))?;

    match message {
        Message::SummarizeContent => {
            info!("Received SUMMARIZE_CONTENT");
            let reply = state
                .orchestrator
                .handle_message(Message::SummarizeContent)
                .await
                .ok_or_else(|| {
                    AppError::InternalServerError("Summarize produced no result".to_string())
                })?;
            Ok(Json(reply).into_response())
        }
        Message::GetPageContent(_) => {
            let (Some(tab_id), Some(request_id)) = (routing.tab_id, routing.request_id) else {
                return Err(AppError::BadRequest(
                    "GET_PAGE_CONTENT requires tabId and requestId".to_string(),
                ));
            };
            let envelope = Envelope::seal(tab_id, request_id, &message)
                .map_err(|e| AppError::InternalServerError(e.to_string()))?;
            debug!("Forwarding external extraction reply for {tab_id}");
            state
                .orchestrator
                .outbox()
                .send(envelope)
                .await
                .map_err(|_| AppError::InternalServerError("Reply channel closed".to_string()))?;
            Ok((StatusCode::ACCEPTED, Json(json!({ "accepted": true }))).into_response())
        }
        Message::SummaryResult(_) => Err(AppError::BadRequest(
            "SUMMARY_RESULT is only sent by the server".to_string(),
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct OpenTabRequest {
    pub url: String,
    #[serde(default)]
    pub html: Option<String>,
}

/// # Errors
///
/// [`AppError::BadRequest`] when the URL is blank.
pub async fn open_tab(
    State(state): State<AppState>,
    JsonExtractor(request): JsonExtractor<OpenTabRequest>,
) -> Result<Json<Tab>, AppError> {
    if request.url.trim().is_empty() {
        return Err(AppError::BadRequest("url must not be empty".to_string()));
    }
    Ok(Json(state.tabs.open(request.url.trim(), request.html)))
}

/// # Errors
///
/// [`AppError::NotFound`] when no tab is active.
pub async fn active_tab(State(state): State<AppState>) -> Result<Json<Tab>, AppError> {
    state
        .tabs
        .active_tab()
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No active tab".to_string()))
}

/// # Errors
///
/// [`AppError::NotFound`] for an unknown tab id.
pub async fn activate_tab(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<Json<Tab>, AppError> {
    state
        .tabs
        .activate(TabId(id))
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No tab with id {id}")))
}

/// # Errors
///
/// [`AppError::NotFound`] for an unknown tab id.
pub async fn close_tab(
    State(state): State<AppState>,
    Path(id): Path<u32>,
) -> Result<StatusCode, AppError> {
    if state.tabs.close(TabId(id)) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("No tab with id {id}")))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsView {
    pub api_key: String,
    pub api_host: String,
    pub model_name: String,
    pub prompt_template: String,
}

impl From<Settings> for SettingsView {
    fn from(settings: Settings) -> Self {
        Self {
            api_key: mask_secret(&settings.api_key),
            api_host: settings.api_host,
            model_name: settings.model_name,
            prompt_template: settings.prompt_template,
        }
    }
}

/// # Errors
///
/// [`AppError::Storage`] when the store cannot be read.
pub async fn get_settings(State(state): State<AppState>) -> Result<Json<SettingsView>, AppError> {
    let settings = Settings::load(state.settings.as_ref()).await?;
    Ok(Json(settings.into()))
}

/// A blank `apiKey` keeps the stored key.
///
/// # Errors
///
/// [`AppError::BadRequest`] for settings the options form would refuse, or
/// [`AppError::Storage`] when the store fails.
pub async fn put_settings(
    State(state): State<AppState>,
    JsonExtractor(submitted): JsonExtractor<Settings>,
) -> Result<Json<SettingsView>, AppError> {
    let settings = submitted.or_stored_key(state.settings.as_ref()).await?;
    settings
        .validate()
        .map_err(|problem| AppError::BadRequest(problem.to_string()))?;
    settings.save(state.settings.as_ref()).await?;
    info!("Settings updated through the API");
    Ok(Json(settings.into()))
}
