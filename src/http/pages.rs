use axum::{
    Form,
    extract::State,
    response::Html,
};
use tracing::{info, warn};

use crate::{
    AppState,
    models::SummaryResult,
    render::{error_line, escape, markdown_to_safe_html},
    settings::Settings,
    utils::mask_secret,
};

const STYLE: &str = "body{font-family:system-ui,sans-serif;max-width:42rem;margin:2rem auto;padding:0 1rem}\
.error{color:#b00020}.status{color:#1b5e20}label{display:block;margin-top:1rem}\
input,textarea{width:100%;box-sizing:border-box}textarea{min-height:8rem}";

fn layout(title: &str, body: &str) -> Html<String> {
    Html(format!(
        "<!DOCTYPE html><html lang=\"zh-CN\"><head><meta charset=\"utf-8\">\
<title>{title}</title><style>{STYLE}</style></head><body>{body}</body></html>"
    ))
}

fn result_area(result: Option<&SummaryResult>) -> String {
    match result {
        None => "<div id=\"result\"></div>".to_string(),
        Some(SummaryResult {
            success: true,
            summary: Some(summary),
            ..
        }) => format!(
            "<div id=\"result\" class=\"summary\">{}</div>",
            markdown_to_safe_html(summary)
        ),
        Some(result) => format!(
            "<div id=\"result\"><p class=\"error\">{}</p></div>",
            error_line(result.error.as_deref().unwrap_or("未知错误"))
        ),
    }
}

fn render_popup(result: Option<&SummaryResult>) -> Html<String> {
    let body = format!(
        "<h1>网页总结</h1>\
<form method=\"post\" action=\"/summarize\"><button type=\"submit\">总结当前页面</button></form>\
<p><a href=\"/options\">设置</a></p>{}",
        result_area(result)
    );
    layout("网页总结", &body)
}

pub async fn popup_page() -> Html<String> {
    render_popup(None)
}

pub async fn summarize_page(State(state): State<AppState>) -> Html<String> {
    let result = state.orchestrator.summarize().await;
    render_popup(Some(&result))
}

/// The stored key is never sent back. A saved key only shows up masked in the
/// placeholder, and leaving the field blank keeps it.
fn key_field_attrs(api_key: &str) -> String {
    if api_key.trim().is_empty() {
        " required".to_string()
    } else {
        format!(" placeholder=\"{}\"", escape(&mask_secret(api_key)))
    }
}

fn render_options(settings: &Settings, status: Option<Result<&str, String>>) -> Html<String> {
    let status_line = match status {
        None => String::new(),
        Some(Ok(message)) => format!("<p class=\"status\">{}</p>", escape(message)),
        Some(Err(message)) => format!("<p class=\"error\">{}</p>", error_line(&message)),
    };
    let body = format!(
        "<h1>设置</h1>{status_line}<form method=\"post\" action=\"/options\">\
<label>API 密钥<input type=\"password\" name=\"apiKey\" autocomplete=\"off\"{api_key}></label>\
<label>API 地址<input type=\"url\" name=\"apiHost\" required value=\"{api_host}\"></label>\
<label>模型名称<input type=\"text\" name=\"modelName\" required value=\"{model_name}\"></label>\
<label>提示词模板（使用 {{{{content}}}} 表示网页内容）\
<textarea name=\"promptTemplate\" required>{prompt_template}</textarea></label>\
<button type=\"submit\">保存</button></form><p><a href=\"/\">返回</a></p>",
        api_key = key_field_attrs(&settings.api_key),
        api_host = escape(&settings.api_host),
        model_name = escape(&settings.model_name),
        prompt_template = escape(&settings.prompt_template),
    );
    layout("设置", &body)
}

pub async fn options_page(State(state): State<AppState>) -> Html<String> {
    match Settings::load(state.settings.as_ref()).await {
        Ok(settings) => render_options(&settings.with_form_defaults(), None),
        Err(e) => {
            warn!("Loading settings failed: {e}");
            render_options(
                &Settings::default().with_form_defaults(),
                Some(Err(format!("加载设置失败：{e}"))),
            )
        }
    }
}

pub async fn save_options(
    State(state): State<AppState>,
    Form(submitted): Form<Settings>,
) -> Html<String> {
    let settings = match submitted.clone().or_stored_key(state.settings.as_ref()).await {
        Ok(settings) => settings,
        Err(e) => {
            warn!("Loading the stored API key failed: {e}");
            return render_options(&submitted, Some(Err(format!("加载设置失败：{e}"))));
        }
    };
    if let Err(problem) = settings.validate() {
        return render_options(&settings, Some(Err(problem.to_string())));
    }
    match settings.save(state.settings.as_ref()).await {
        Ok(()) => {
            info!("Settings saved from the options form");
            render_options(&settings, Some(Ok("设置已保存")))
        }
        Err(e) => {
            warn!("Saving settings failed: {e}");
            render_options(&settings, Some(Err(format!("保存设置失败：{e}"))))
        }
    }
}
