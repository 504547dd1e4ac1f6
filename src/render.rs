use pulldown_cmark::{Options, Parser, html};

/// Markdown to HTML that is safe to drop into the result area.
#[must_use]
pub fn markdown_to_safe_html(markdown: &str) -> String {
    let options = Options::ENABLE_TABLES | Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, Parser::new_ext(markdown, options));
    ammonia::clean(&rendered)
}

/// Escapes `text` for use in HTML text or attribute positions.
#[must_use]
pub fn escape(text: &str) -> String {
    ammonia::clean_text(text)
}

/// A failure message collapsed to a single escaped line.
#[must_use]
pub fn error_line(message: &str) -> String {
    escape(&message.split_whitespace().collect::<Vec<_>>().join(" "))
}
