use std::borrow::Cow;
use std::sync::LazyLock;

use regex::Regex;

static ANSI_ESCAPE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;?]*[A-Za-z]").expect("valid ANSI escape pattern"));

/// Remove terminal color codes from downloader output
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    ANSI_ESCAPE.replace_all(text, "")
}

/// Trim whitespace around a pasted url
pub fn normalize_url(url: &str) -> &str {
    url.trim()
}
