#[macro_export]
macro_rules! lazy_regex {
    ($s:expr) => {
        std::sync::LazyLock::new(|| {
            regex::Regex::new($s).expect("Static regex pattern must be valid")
        })
    };
}

/// Cuts `input` down to at most `max_chars` characters, appending an ellipsis
/// when anything was dropped. Never splits a UTF-8 sequence.
#[must_use]
pub fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((byte_index, _)) => format!("{}...", &input[..byte_index]),
        None => input.to_string(),
    }
}

#[must_use]
pub fn mask_secret(secret: &str) -> String {
    let len = secret.chars().count();
    if len <= 8 {
        return "*".repeat(len);
    }
    let tail: String = secret.chars().skip(len - 4).collect();
    format!("****{tail}")
}
