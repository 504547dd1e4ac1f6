//! Page-side text extraction.
//!
//! This code runs on its own worker with nothing but the page's HTML and a
//! message sender. It parses markup without executing any of it and reports
//! a single [`ExtractionResult`] back as a serialized [`Message`].

use std::sync::LazyLock;

use ego_tree::{NodeId, iter::Edge};
use regex::Regex;
use scraper::{ElementRef, Html, Node};
use tokio::sync::mpsc;
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    lazy_regex,
    models::{Envelope, ExtractionResult, Message},
    tabs::TabId,
};

pub const NO_DOCUMENT: &str = "无法访问页面文档";

static TRAILING_SPACE: LazyLock<Regex> = lazy_regex!(r"(?m)[ \t]+$");
static BLANK_LINE_RUNS: LazyLock<Regex> = lazy_regex!(r"\n(?:[ \t]*\n){2,}");

const SKIPPED: &[&str] = &[
    "head", "script", "style", "noscript", "template", "svg", "canvas", "iframe", "object",
];

const PARAGRAPHS: &[&str] = &["p", "h1", "h2", "h3", "h4", "h5", "h6"];

const BLOCKS: &[&str] = &[
    "address",
    "article",
    "aside",
    "blockquote",
    "body",
    "caption",
    "dd",
    "details",
    "dialog",
    "div",
    "dl",
    "dt",
    "fieldset",
    "figcaption",
    "figure",
    "footer",
    "form",
    "header",
    "hgroup",
    "hr",
    "li",
    "main",
    "nav",
    "ol",
    "pre",
    "section",
    "summary",
    "table",
    "tbody",
    "tfoot",
    "thead",
    "tr",
    "ul",
];

const CELLS: &[&str] = &["td", "th"];

/// Extracts and normalizes the visible text of `document`, or reports why it
/// could not.
#[must_use]
pub fn extract(document: Option<&str>) -> ExtractionResult {
    match document {
        Some(html) => ExtractionResult::extracted(normalize_text(&visible_text(html))),
        None => ExtractionResult::failed(NO_DOCUMENT),
    }
}

/// Runs [`extract`] off the async workers and posts the outcome to `outbox`.
/// A panic during parsing is reported as a failed extraction.
pub async fn run_in_page(
    tab_id: TabId,
    request_id: Uuid,
    document: Option<String>,
    outbox: mpsc::Sender<Envelope>,
) {
    let result = tokio::task::spawn_blocking(move || extract(document.as_deref()))
        .await
        .unwrap_or_else(|e| {
            error!("Extractor crashed in {tab_id}: {e}");
            ExtractionResult::failed(NO_DOCUMENT)
        });

    let envelope = match Envelope::seal(tab_id, request_id, &Message::GetPageContent(result)) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!("Failed to serialize extraction result: {e}");
            return;
        }
    };
    if outbox.send(envelope).await.is_err() {
        debug!("Orchestrator went away before {tab_id} replied");
    }
}

/// Rendered text of an HTML document, roughly what a browser's `innerText`
/// on `<body>` gives.
#[must_use]
pub fn visible_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut writer = TextWriter::default();
    walk(document.root_element(), &mut writer);
    writer.out
}

/// Strips trailing spaces, collapses two or more consecutive blank lines
/// into one and trims the ends.
#[must_use]
pub fn normalize_text(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let stripped = TRAILING_SPACE.replace_all(&unified, "");
    BLANK_LINE_RUNS
        .replace_all(&stripped, "\n\n")
        .trim()
        .to_string()
}

fn walk(root: ElementRef<'_>, writer: &mut TextWriter) {
    // Iterative: nesting depth is bounded only by the document.
    let mut skipped: Option<NodeId> = None;
    let mut pre_depth = 0usize;

    for edge in root.traverse() {
        match edge {
            Edge::Open(node) => {
                if skipped.is_some() {
                    continue;
                }
                match node.value() {
                    Node::Text(text) if pre_depth > 0 => writer.push_raw(text),
                    Node::Text(text) => writer.push_text(text),
                    Node::Element(el) => {
                        let name = el.name();
                        if SKIPPED.contains(&name) || el.attr("hidden").is_some() {
                            skipped = Some(node.id());
                        } else if name == "br" {
                            writer.out.push('\n');
                        } else if PARAGRAPHS.contains(&name) {
                            writer.paragraph_break();
                        } else if BLOCKS.contains(&name) {
                            writer.line_break();
                        } else if CELLS.contains(&name) {
                            writer.cell_break();
                        }
                        if name == "pre" && skipped.is_none() {
                            pre_depth += 1;
                        }
                    }
                    _ => {}
                }
            }
            Edge::Close(node) => {
                if let Some(id) = skipped {
                    if id == node.id() {
                        skipped = None;
                    }
                    continue;
                }
                let Node::Element(el) = node.value() else {
                    continue;
                };
                let name = el.name();
                if name == "pre" {
                    pre_depth = pre_depth.saturating_sub(1);
                }
                if PARAGRAPHS.contains(&name) {
                    writer.paragraph_break();
                } else if BLOCKS.contains(&name) {
                    writer.line_break();
                }
            }
        }
    }
}

#[derive(Default)]
struct TextWriter {
    out: String,
}

impl TextWriter {
    fn at_line_start(&self) -> bool {
        self.out.is_empty() || self.out.ends_with('\n')
    }

    fn push_text(&mut self, text: &str) {
        let mut words = text.split_whitespace().peekable();
        if words.peek().is_none() {
            if !text.is_empty() && !self.at_line_start() && !self.out.ends_with([' ', '\t']) {
                self.out.push(' ');
            }
            return;
        }
        if text.starts_with(char::is_whitespace)
            && !self.at_line_start()
            && !self.out.ends_with([' ', '\t'])
        {
            self.out.push(' ');
        }
        let mut first = true;
        for word in words {
            if !first {
                self.out.push(' ');
            }
            self.out.push_str(word);
            first = false;
        }
        if text.ends_with(char::is_whitespace) {
            self.out.push(' ');
        }
    }

    fn push_raw(&mut self, text: &str) {
        self.out.push_str(text);
    }

    fn line_break(&mut self) {
        if !self.at_line_start() {
            self.out.push('\n');
        }
    }

    fn paragraph_break(&mut self) {
        self.line_break();
        if !self.out.is_empty() && !self.out.ends_with("\n\n") {
            self.out.push('\n');
        }
    }

    fn cell_break(&mut self) {
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        if !self.at_line_start() {
            self.out.push('\t');
        }
    }
}
