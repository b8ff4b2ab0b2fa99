use once_cell::sync::Lazy;
use regex::Regex;

static RE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
// Never matches once whitespace has been collapsed; kept so the rule order stays intact.
static RE_BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n+").unwrap());
static RE_CONTROL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\x00-\x08\x0b\x0c\x0e-\x1f\x7f-\x9f]").unwrap());
static RE_PAGE_NUM_LINE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\d+\s*\n").unwrap());
static RE_PAGE_OF: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[Pp]age\s*\d+\s*of\s*\d+\b").unwrap());
static RE_PAGE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[Pp]age\s*\d+\b").unwrap());

/// Clean extracted text.
///
/// Whitespace runs (newlines included) become a single space, control
/// characters and page-number artifacts are dropped, and the result is
/// trimmed. The pass is repeated until nothing changes so that
/// `clean_text(clean_text(x)) == clean_text(x)`.
pub fn clean_text(text: &str) -> String {
    let mut current = clean_pass(text);
    loop {
        let next = clean_pass(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn clean_pass(text: &str) -> String {
    let text = RE_WHITESPACE.replace_all(text, " ");
    let text = RE_BLANK_LINES.replace_all(&text, "\n\n");
    let text = RE_CONTROL.replace_all(&text, "");

    let text = RE_PAGE_NUM_LINE.replace_all(&text, "\n");
    let text = RE_PAGE_OF.replace_all(&text, "");
    let text = RE_PAGE.replace_all(&text, "");

    text.trim().to_string()
}
