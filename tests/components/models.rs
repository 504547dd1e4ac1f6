use insta::assert_snapshot;
use tab_summarizer::{
    models::{Envelope, ExtractionResult, Message, SummaryResult},
    tabs::{Tab, TabId},
};
use uuid::Uuid;

#[test]
fn test_message_wire_format() {
    assert_snapshot!(
        serde_json::to_string(&Message::SummarizeContent).unwrap_or_default(),
        @r#"{"type":"SUMMARIZE_CONTENT"}"#
    );
    assert_snapshot!(
        serde_json::to_string(&Message::GetPageContent(ExtractionResult::extracted("Hi")))
            .unwrap_or_default(),
        @r#"{"type":"GET_PAGE_CONTENT","success":true,"content":"Hi"}"#
    );
    assert_snapshot!(
        serde_json::to_string(&Message::SummaryResult(SummaryResult::failed("boom")))
            .unwrap_or_default(),
        @r#"{"type":"SUMMARY_RESULT","success":false,"error":"boom"}"#
    );
}

#[test]
fn test_message_parses_extension_payloads() {
    let parsed: Message = serde_json::from_str(
        r#"{"type":"SUMMARY_RESULT","success":true,"summary":"- point"}"#,
    )
    .expect("valid message");
    assert_eq!(parsed, Message::SummaryResult(SummaryResult::summarized("- point")));

    let failed: Message =
        serde_json::from_str(r#"{"type":"GET_PAGE_CONTENT","success":false,"error":"denied"}"#)
            .expect("valid message");
    assert_eq!(failed, Message::GetPageContent(ExtractionResult::failed("denied")));

    assert!(serde_json::from_str::<Message>(r#"{"type":"SOMETHING_ELSE"}"#).is_err());
}

#[test]
fn test_envelope_round_trips_body() {
    let request_id = Uuid::new_v4();
    let envelope = Envelope::seal(TabId(9), request_id, &Message::SummarizeContent)
        .expect("seal");

    let wire = serde_json::to_value(&envelope).expect("serialize");
    assert_eq!(wire["tabId"], 9);
    assert_eq!(wire["requestId"], request_id.to_string());
    assert_eq!(envelope.open().expect("open"), Message::SummarizeContent);
}

#[test]
fn test_restricted_urls() {
    let tab = |url: &str| Tab {
        id: TabId(1),
        url: url.to_string(),
    };
    assert!(tab("chrome://settings").is_restricted());
    assert!(tab("CHROME://newtab").is_restricted());
    assert!(tab("about:blank").is_restricted());
    assert!(tab("edge://flags").is_restricted());
    assert!(tab("chrome-extension://abc/options.html").is_restricted());
    assert!(!tab("https://chrome.google.com/webstore").is_restricted());
    assert!(!tab("http://localhost/about:me").is_restricted());
}
