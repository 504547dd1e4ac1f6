use std::sync::Arc;

use axum::{Router, body::Body};
use http::{Request, StatusCode, header};
use http_body_util::BodyExt;
use reqwest::Client;
use serde_json::{Value, json};
use tab_summarizer::{
    AppState,
    extractor::NO_DOCUMENT,
    http::router,
    llm::LlmClient,
    orchestrator::Orchestrator,
    settings::{MemorySettingsStore, Settings},
    tabs::{BrowserTabs, MAX_DOCUMENT_BYTES},
};
use tower::ServiceExt;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{method, path},
};

use crate::helpers::{completion, settings_for, store_with};

struct TestApp {
    router: Router,
    store: Arc<MemorySettingsStore>,
}

fn test_app(settings: &Settings) -> TestApp {
    let store = store_with(settings);
    let http = Client::new();
    let tabs = Arc::new(BrowserTabs::new(http.clone(), std::time::Duration::from_secs(5)));
    let llm = Arc::new(LlmClient::new(http, store.clone()));
    let orchestrator = Orchestrator::start(tabs.clone(), llm);
    let router = router(AppState {
        orchestrator,
        settings: store.clone(),
        tabs,
    });
    TestApp { router, store }
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

fn json_request(method: &str, uri: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request")
}

fn form_request(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .expect("request")
}

#[tokio::test]
async fn test_popup_page_renders_trigger() {
    let app = test_app(&Settings::default());
    let request = Request::get("/").body(Body::empty()).expect("request");

    let (status, body) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("action=\"/summarize\""));
    assert!(body.contains("id=\"result\""));
}

#[tokio::test]
async fn test_summarize_message_round_trip() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("**Done**")))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&settings_for(&server.uri()));

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/tabs",
            &json!({ "url": "https://example.com", "html": "<p>Hello world</p>" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app.router,
        json_request("POST", "/api/messages", &json!({ "type": "SUMMARIZE_CONTENT" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let reply: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(
        reply,
        json!({ "type": "SUMMARY_RESULT", "success": true, "summary": "**Done**" })
    );
}

#[tokio::test]
async fn test_summarize_page_renders_sanitized_markdown() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion(
            "## Key points\n\n- **fast**\n\n<script>alert(1)</script>",
        )))
        .mount(&server)
        .await;
    let app = test_app(&settings_for(&server.uri()));
    send(
        &app.router,
        json_request(
            "POST",
            "/api/tabs",
            &json!({ "url": "https://example.com", "html": "<p>text</p>" }),
        ),
    )
    .await;

    let (status, body) = send(&app.router, form_request("/summarize", "")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<h2>Key points</h2>"));
    assert!(body.contains("<strong>fast</strong>"));
    assert!(!body.contains("<script>alert(1)</script>"));
}

#[tokio::test]
async fn test_restricted_tab_yields_error_result() {
    let app = test_app(&settings_for("http://127.0.0.1:9"));
    send(
        &app.router,
        json_request("POST", "/api/tabs", &json!({ "url": "chrome://settings" })),
    )
    .await;

    let (_, body) = send(
        &app.router,
        json_request("POST", "/api/messages", &json!({ "type": "SUMMARIZE_CONTENT" })),
    )
    .await;
    let reply: Value = serde_json::from_str(&body).expect("json");

    assert_eq!(reply["type"], "SUMMARY_RESULT");
    assert_eq!(reply["success"], false);
    assert!(reply.get("summary").is_none());
}

#[tokio::test]
async fn test_remote_tab_is_fetched_on_injection() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/article"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html; charset=utf-8")
                .set_body_string("<html><body><p>Fetched page</p></body></html>"),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("fetched ok")))
        .expect(1)
        .mount(&server)
        .await;
    let app = test_app(&settings_for(&server.uri()));
    send(
        &app.router,
        json_request(
            "POST",
            "/api/tabs",
            &json!({ "url": format!("{}/article", server.uri()) }),
        ),
    )
    .await;

    let (_, body) = send(
        &app.router,
        json_request("POST", "/api/messages", &json!({ "type": "SUMMARIZE_CONTENT" })),
    )
    .await;
    let reply: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(reply["summary"], "fetched ok");
}

#[tokio::test]
async fn test_protocol_misuse_is_rejected() {
    let app = test_app(&Settings::default());

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/messages",
            &json!({ "type": "GET_PAGE_CONTENT", "success": true, "content": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(
        &app.router,
        json_request(
            "POST",
            "/api/messages",
            &json!({ "type": "SUMMARY_RESULT", "success": true }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let error: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(error["type"], "error");
    assert_eq!(error["error"]["type"], "invalid_request_error");
}

#[tokio::test]
async fn test_external_reply_without_pending_request_is_accepted() {
    let app = test_app(&Settings::default());

    let (status, _) = send(
        &app.router,
        json_request(
            "POST",
            "/api/messages",
            &json!({
                "type": "GET_PAGE_CONTENT",
                "success": true,
                "content": "x",
                "tabId": 1,
                "requestId": "67e55044-10b1-426f-9247-bb680e5fe0c8"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_options_form_saves_valid_settings() {
    let app = test_app(&Settings::default());

    let (status, body) = send(
        &app.router,
        form_request(
            "/options",
            "apiKey=sk-abcdefgh1234&apiHost=https%3A%2F%2Fapi.openai.com\
             &modelName=gpt-3.5-turbo&promptTemplate=Summarize%3A+%7B%7Bcontent%7D%7D",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"status\""));

    let saved = Settings::load(app.store.as_ref()).await.expect("load");
    assert_eq!(saved.api_key, "sk-abcdefgh1234");
    assert_eq!(saved.prompt_template, "Summarize: {{content}}");

    let (_, body) = send(
        &app.router,
        Request::get("/api/settings").body(Body::empty()).expect("request"),
    )
    .await;
    let view: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(view["apiKey"], "****1234");
    assert_eq!(view["modelName"], "gpt-3.5-turbo");
}

#[tokio::test]
async fn test_options_form_rejects_template_without_placeholder() {
    let app = test_app(&Settings::default());

    let (status, body) = send(
        &app.router,
        form_request(
            "/options",
            "apiKey=k&apiHost=https%3A%2F%2Fh&modelName=m&promptTemplate=no+marker",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
    assert_eq!(
        Settings::load(app.store.as_ref()).await.expect("load"),
        Settings::default()
    );
}

#[tokio::test]
async fn test_options_page_prefills_defaults() {
    let app = test_app(&Settings::default());
    let (status, body) = send(
        &app.router,
        Request::get("/options").body(Body::empty()).expect("request"),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("name=\"promptTemplate\""));
    assert!(body.contains("gpt-3.5-turbo"));
}

#[tokio::test]
async fn test_put_settings_validates() {
    let app = test_app(&Settings::default());

    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/settings",
            &json!({ "apiKey": "k", "apiHost": "h", "modelName": "m", "promptTemplate": "x" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/settings",
            &json!({
                "apiKey": "k",
                "apiHost": "h",
                "modelName": "m",
                "promptTemplate": "x {{content}}"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_tab_lifecycle() {
    let app = test_app(&Settings::default());
    send(
        &app.router,
        json_request("POST", "/api/tabs", &json!({ "url": "https://a.example" })),
    )
    .await;
    send(
        &app.router,
        json_request("POST", "/api/tabs", &json!({ "url": "https://b.example" })),
    )
    .await;

    let (status, body) = send(
        &app.router,
        Request::post("/api/tabs/1/activate").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let tab: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(tab, json!({ "id": 1, "url": "https://a.example" }));

    let (status, _) = send(
        &app.router,
        Request::delete("/api/tabs/1").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(
        &app.router,
        Request::get("/api/tabs/active").body(Body::empty()).expect("request"),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

fn secret_settings() -> Settings {
    Settings {
        api_key: "sk-SECRET-123456789".to_string(),
        ..settings_for("https://api.openai.com")
    }
}

#[tokio::test]
async fn test_options_page_never_echoes_api_key() {
    let app = test_app(&secret_settings());
    let request = Request::get("/options")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );

    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body")
        .to_bytes();
    let body = String::from_utf8_lossy(&bytes);
    assert!(!body.contains("sk-SECRET-123456789"));
    assert!(body.contains("placeholder=\"****6789\""));
}

#[tokio::test]
async fn test_settings_api_is_same_origin_only() {
    let app = test_app(&secret_settings());
    let request = Request::get("/api/settings")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    assert!(
        response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none()
    );
}

#[tokio::test]
async fn test_message_endpoint_allows_cross_origin_callers() {
    let app = test_app(&secret_settings());
    let request = Request::post("/api/messages")
        .header(header::ORIGIN, "chrome-extension://abcdef")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(json!({ "type": "SUMMARIZE_CONTENT" }).to_string()))
        .expect("request");

    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router is infallible");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
        Some(&header::HeaderValue::from_static("*"))
    );
}

#[tokio::test]
async fn test_blank_api_key_keeps_the_stored_one() {
    let app = test_app(&secret_settings());

    let (status, body) = send(
        &app.router,
        form_request(
            "/options",
            "apiKey=&apiHost=https%3A%2F%2Fapi.openai.com\
             &modelName=gpt-4o-mini&promptTemplate=Summarize%3A+%7B%7Bcontent%7D%7D",
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"status\""));
    assert!(!body.contains("sk-SECRET-123456789"));

    let saved = Settings::load(app.store.as_ref()).await.expect("load");
    assert_eq!(saved.api_key, "sk-SECRET-123456789");
    assert_eq!(saved.model_name, "gpt-4o-mini");

    let (status, _) = send(
        &app.router,
        json_request(
            "PUT",
            "/api/settings",
            &json!({
                "apiKey": "",
                "apiHost": "https://api.openai.com",
                "modelName": "gpt-4o",
                "promptTemplate": "x {{content}}"
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let saved = Settings::load(app.store.as_ref()).await.expect("load");
    assert_eq!(saved.api_key, "sk-SECRET-123456789");
    assert_eq!(saved.model_name, "gpt-4o");
}

#[tokio::test]
async fn test_blank_api_key_without_stored_one_is_rejected() {
    let app = test_app(&Settings::default());

    let (status, body) = send(
        &app.router,
        form_request(
            "/options",
            "apiKey=+&apiHost=https%3A%2F%2Fh&modelName=m&promptTemplate=%7B%7Bcontent%7D%7D",
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("class=\"error\""));
    assert!(body.contains("name=\"apiKey\" autocomplete=\"off\" required"));
}

#[tokio::test]
async fn test_oversized_remote_page_fails_extraction() {
    let server = MockServer::start().await;
    let page = format!("<p>{}</p>", "a".repeat(MAX_DOCUMENT_BYTES));
    Mock::given(method("GET"))
        .and(path("/huge"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(page),
        )
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&server)
        .await;
    let app = test_app(&settings_for(&server.uri()));
    send(
        &app.router,
        json_request(
            "POST",
            "/api/tabs",
            &json!({ "url": format!("{}/huge", server.uri()) }),
        ),
    )
    .await;

    let (_, body) = send(
        &app.router,
        json_request("POST", "/api/messages", &json!({ "type": "SUMMARIZE_CONTENT" })),
    )
    .await;
    let reply: Value = serde_json::from_str(&body).expect("json");
    assert_eq!(reply["success"], false);
    assert!(
        reply["error"]
            .as_str()
            .is_some_and(|error| error.contains(NO_DOCUMENT))
    );
}
