//! Reply formatter: structured plain text to display markup.
//!
//! The responder returns plain text with light structure (section labels,
//! product names, bullet lists, `Key: value` lines). The formatter walks the
//! text line by line and emits headings, labelled paragraphs, lists, and
//! plain paragraphs. Lists cannot nest; a single cursor tracks whether a
//! `<ul>` is open. Every text fragment is entity-escaped before it is
//! wrapped, and the composed markup goes through the sanitizer as a second
//! layer.

use regex::Regex;

use crate::sanitize::sanitize_markup;

/// Section labels recognized as headings, lowercased, after stripping any
/// leading bullet and trailing colon.
const HEADING_LABELS: [&str; 15] = [
    "savings products",
    "loan products",
    "current products",
    "islamic products",
    "general products",
    "agent-banking products",
    "cards products",
    "loans products",
    "loans",
    "loan",
    "current",
    "savings",
    "benefits",
    "eligibility",
    "documents",
];

/// Product names open with this token (e.g. "MDB SALARY SAVER ACCOUNT").
const PRODUCT_HEADING_PREFIX: &str = "MDB";

/// Product-name headings are short; anything longer is prose.
const PRODUCT_HEADING_MAX_WORDS: usize = 6;

/// Escape the characters that would let reply text read as markup.
///
/// `&` first, so the entities introduced for `<` and `>` are not re-escaped.
pub fn escape_text(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Deterministic reply-text formatter. Holds its compiled patterns; one
/// instance can format any number of replies.
pub struct ReplyFormatter {
    /// `word(s):` at the start of a bullet line, marker already stripped.
    key_value: Regex,
    /// Uppercase letters, digits, and limited punctuation only.
    product_line: Regex,
}

impl Default for ReplyFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplyFormatter {
    pub fn new() -> Self {
        Self {
            key_value: Regex::new(r"^\w[\w ]*:").expect("key-value pattern is valid"),
            product_line: Regex::new(r"^[A-Z0-9 \-&()]+$").expect("product pattern is valid"),
        }
    }

    /// Format one reply into sanitized markup.
    ///
    /// Pure with respect to its input: the same text always yields
    /// byte-identical markup.
    pub fn format(&self, text: &str) -> String {
        let mut html = String::new();
        let mut in_list = false;

        for raw_line in text.trim().split('\n') {
            let line = raw_line.trim();
            if line.is_empty() {
                close_list(&mut html, &mut in_list);
                continue;
            }

            // Heading by label: lowercase, strip leading bullet/dash and
            // trailing colon, compare against the closed vocabulary.
            let cleaned = clean_heading_candidate(line);
            if HEADING_LABELS.contains(&cleaned.to_lowercase().as_str()) {
                close_list(&mut html, &mut in_list);
                html.push_str(&format!("<h3>{}</h3>", escape_text(&cleaned)));
                continue;
            }

            // Heading by pattern: short all-caps product name.
            if line.starts_with(PRODUCT_HEADING_PREFIX)
                && self.product_line.is_match(line)
                && line.split_whitespace().count() <= PRODUCT_HEADING_MAX_WORDS
            {
                close_list(&mut html, &mut in_list);
                html.push_str(&format!("<h3>{}</h3>", escape_text(line)));
                continue;
            }

            let is_bullet = line.starts_with('•') || line.starts_with("- ");
            if is_bullet {
                let stripped = strip_bullet_marker(line);
                if self.key_value.is_match(stripped) {
                    // Key-value bullets render as labelled paragraphs, never
                    // as list items.
                    close_list(&mut html, &mut in_list);
                    let (key, value) = stripped.split_once(':').expect("pattern requires a colon");
                    html.push_str(&format!(
                        "<p><b>{}:</b> {}</p>",
                        escape_text(key.trim()),
                        escape_text(value.trim())
                    ));
                } else {
                    if !in_list {
                        html.push_str("<ul>");
                        in_list = true;
                    }
                    html.push_str(&format!("<li>{}</li>", escape_text(stripped)));
                }
                continue;
            }

            close_list(&mut html, &mut in_list);
            html.push_str(&format!("<p>{}</p>", escape_text(line)));
        }

        close_list(&mut html, &mut in_list);

        sanitize_markup(&html)
    }
}

/// Convenience wrapper constructing a formatter per call.
pub fn render_reply(text: &str) -> String {
    ReplyFormatter::new().format(text)
}

fn close_list(html: &mut String, in_list: &mut bool) {
    if *in_list {
        html.push_str("</ul>");
        *in_list = false;
    }
}

/// Strip a leading bullet or dash and a trailing colon for heading matching
/// and heading display.
fn clean_heading_candidate(line: &str) -> String {
    line.trim_start_matches(['-', '•', ' '])
        .trim_end_matches([':', ' '])
        .to_string()
}

/// Strip leading `•`/`-` markers plus following whitespace.
fn strip_bullet_marker(line: &str) -> &str {
    line.trim_start_matches(['•', '-']).trim_start()
}

// =============================================================================
// Tests
// =============================================================================
