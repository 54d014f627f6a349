//! Allowlist sanitizer for composed reply markup.
//!
//! The formatter escapes every text fragment before wrapping it, so its own
//! output is already safe. This pass is the second layer: only the tags the
//! formatter itself produces survive, with attributes dropped, so nothing
//! upstream of the renderer can smuggle markup into the host page.

/// Tags the formatter emits. Everything else is stripped.
const ALLOWED_TAGS: [&str; 6] = ["h3", "p", "b", "ul", "li", "br"];

/// Tags whose body is dropped along with the tag itself.
const DROP_CONTENT_TAGS: [&str; 2] = ["script", "style"];

/// Reduce markup to the formatter's own tag set.
///
/// Allowed tags are re-emitted in canonical form (lowercase, no
/// attributes). Unknown tags are removed but their inner text is kept.
/// `<script>` and `<style>` lose their bodies entirely. A stray `<` that
/// never closes is escaped rather than trusted.
pub fn sanitize_markup(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut rest = html;

    while let Some(open) = rest.find('<') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find('>') else {
            // Unterminated tag: neutralize and stop scanning.
            out.push_str("&lt;");
            rest = after;
            continue;
        };

        let raw_tag = &after[..close];
        rest = &after[close + 1..];

        let closing = raw_tag.starts_with('/');
        let name = tag_name(raw_tag);

        if name.is_empty() {
            continue;
        }

        if DROP_CONTENT_TAGS.contains(&name.as_str()) {
            if !closing {
                rest = skip_past_closing_tag(rest, &name);
            }
            continue;
        }

        if ALLOWED_TAGS.contains(&name.as_str()) {
            if closing {
                out.push_str(&format!("</{}>", name));
            } else if name == "br" {
                out.push_str("<br/>");
            } else {
                out.push_str(&format!("<{}>", name));
            }
        }
        // Unknown tag: dropped, inner text continues to flow through.
    }

    out.push_str(rest);
    out
}

/// Extract the lowercase element name from raw tag content such as
/// `/p`, `p class="x"`, or `br/`.
fn tag_name(raw_tag: &str) -> String {
    raw_tag
        .trim_start_matches('/')
        .chars()
        .take_while(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase()
}

/// Advance past `</name ...>`, swallowing everything before it. If no
/// closing tag exists the remainder is dropped wholesale.
fn skip_past_closing_tag<'a>(rest: &'a str, name: &str) -> &'a str {
    let needle = format!("</{}", name);
    let lower = rest.to_ascii_lowercase();
    match lower.find(&needle) {
        Some(idx) => match rest[idx..].find('>') {
            Some(end) => &rest[idx + end + 1..],
            None => "",
        },
        None => "",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // ---- Allowed structure passes through ----

    #[test]
    fn test_formatter_tags_preserved() {
        let html = "<h3>SAVINGS</h3><p><b>Interest:</b> 5%</p><ul><li>a</li></ul>";
        assert_eq!(sanitize_markup(html), html);
    }

    #[test]
    fn test_br_normalized() {
        assert_eq!(sanitize_markup("a<br>b<br/>c"), "a<br/>b<br/>c");
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(sanitize_markup("no tags here"), "no tags here");
    }

    #[test]
    fn test_escaped_entities_untouched() {
        let html = "<p>&lt;script&gt;alert(1)&lt;/script&gt;</p>";
        assert_eq!(sanitize_markup(html), html);
    }

    // ---- Attributes are dropped ----

    #[test]
    fn test_event_handler_attribute_stripped() {
        let html = r#"<p onclick="steal()">hi</p>"#;
        assert_eq!(sanitize_markup(html), "<p>hi</p>");
    }

    #[test]
    fn test_allowed_tag_with_class_stripped_to_bare() {
        let html = r#"<ul class="menu"><li id="x">a</li></ul>"#;
        assert_eq!(sanitize_markup(html), "<ul><li>a</li></ul>");
    }

    // ---- Disallowed tags ----

    #[test]
    fn test_script_body_removed() {
        let html = "<p>before</p><script>alert('xss')</script><p>after</p>";
        assert_eq!(sanitize_markup(html), "<p>before</p><p>after</p>");
    }

    #[test]
    fn test_script_case_insensitive() {
        let html = "<SCRIPT>alert(1)</SCRIPT>ok";
        assert_eq!(sanitize_markup(html), "ok");
    }

    #[test]
    fn test_unterminated_script_drops_remainder() {
        let html = "<p>safe</p><script>evil()";
        assert_eq!(sanitize_markup(html), "<p>safe</p>");
    }

    #[test]
    fn test_style_body_removed() {
        let html = "<style>p { display: none }</style><p>text</p>";
        assert_eq!(sanitize_markup(html), "<p>text</p>");
    }

    #[test]
    fn test_unknown_tag_keeps_inner_text() {
        let html = "<div><em>emphasized</em> words</div>";
        assert_eq!(sanitize_markup(html), "emphasized words");
    }

    #[test]
    fn test_iframe_stripped() {
        let html = r#"<iframe src="https://evil.example"></iframe><p>ok</p>"#;
        assert_eq!(sanitize_markup(html), "<p>ok</p>");
    }

    #[test]
    fn test_img_with_onerror_stripped() {
        let html = r#"<img src=x onerror="alert(1)"><p>ok</p>"#;
        assert_eq!(sanitize_markup(html), "<p>ok</p>");
    }

    // ---- Malformed input ----

    #[test]
    fn test_stray_open_bracket_escaped() {
        assert_eq!(sanitize_markup("1 < 2"), "1 &lt; 2");
    }

    #[test]
    fn test_empty_tag_dropped() {
        assert_eq!(sanitize_markup("a<>b"), "ab");
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(sanitize_markup(""), "");
    }

    #[test]
    fn test_sanitize_is_deterministic() {
        let html = "<p onclick=x>hi</p><script>a</script><ul><li>z</li></ul>";
        assert_eq!(sanitize_markup(html), sanitize_markup(html));
    }
}
