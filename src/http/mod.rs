mod pages;
mod routes;

use axum::{
    Router,
    routing::{delete, get, post},
};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::state::AppState;

pub use self::{
    pages::{options_page, popup_page, save_options, summarize_page},
    routes::{
        activate_tab, active_tab, close_tab, get_settings, handle_message, open_tab, put_settings,
    },
};

/// Only the message endpoint answers cross-origin callers. Pages and the
/// settings API stay same-origin.
#[must_use]
pub fn router(state: AppState) -> Router {
    let messages = Router::new()
        .route("/api/messages", post(handle_message))
        .layer(CorsLayer::permissive());

    Router::new()
        .route("/", get(popup_page))
        .route("/summarize", post(summarize_page))
        .route("/options", get(options_page).post(save_options))
        .route("/api/tabs", post(open_tab))
        .route("/api/tabs/active", get(active_tab))
        .route("/api/tabs/{id}", delete(close_tab))
        .route("/api/tabs/{id}/activate", post(activate_tab))
        .route("/api/settings", get(get_settings).put(put_settings))
        .merge(messages)
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}
