//! Content name generation
//!
//! Names are the URL segments of content items. When the user does not pick
//! one, a name is derived from the title and de-duplicated against the
//! existing keys of the target container.

use regex::Regex;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

/// Any character that is not a word character
static NON_WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\W").unwrap());

/// Single-character words at the start, middle or end of a hyphenated name
static SHORT_WORD_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\w-|-\w-|-\w$").unwrap());

static HYPHEN_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-{2,}").unwrap());

/// Turn a title into a URL-safe name
///
/// Accents are stripped, non-word runs become a single hyphen, one-letter
/// words are dropped and the result is lowercased.
///
/// # Examples
///
/// ```
/// use ptahcms_core::utils::normalize_name;
///
/// assert_eq!(normalize_name("Hello World"), "hello-world");
/// assert_eq!(normalize_name("  Café  Menu!! "), "cafe-menu");
/// ```
pub fn normalize_name(title: &str) -> String {
    let ascii_folded: String = title
        .trim()
        .nfkd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    let hyphenated = NON_WORD_RE.replace_all(&ascii_folded, "-");
    let without_short = SHORT_WORD_RE.replace_all(&hyphenated, "-");
    let collapsed = HYPHEN_RUN_RE.replace_all(&without_short, "-");

    collapsed.trim_matches('-').to_lowercase()
}

/// Pick the first free name for `title` inside a container
///
/// Tries `base`, `base-1`, `base-2`, ... (each followed by `suffix`) until the
/// candidate is not in `existing`.
///
/// # Examples
///
/// ```
/// use ptahcms_core::utils::choose_name;
///
/// let existing = vec!["test".to_string(), "test-1".to_string()];
/// assert_eq!(choose_name("Test", "", &existing), "test-2");
/// assert_eq!(choose_name("Test", ".html", &existing), "test.html");
/// ```
pub fn choose_name(title: &str, suffix: &str, existing: &[String]) -> String {
    let base = normalize_name(title);

    let mut candidate = format!("{base}{suffix}");
    let mut counter = 0;
    while existing.iter().any(|name| *name == candidate) {
        counter += 1;
        candidate = format!("{base}-{counter}{suffix}");
    }

    candidate
        .replace('/', "-")
        .trim_start_matches(|c: char| c == '+' || c == '@')
        .to_string()
}
