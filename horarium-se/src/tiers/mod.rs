//! Tier strategies
//!
//! Three escalating extraction strategies, ordered by trust:
//! 1. `structured` - schema.org JSON-LD blocks or a JSON feed, no inference
//! 2. `heuristic` - layout-free text scanning for day/time patterns
//! 3. `freetext` - delegation to an opaque text-to-structured-data
//!    collaborator, least trusted, used as last resort
//!
//! Every strategy produces the same `TierOutcome` shape; the orchestrator
//! applies acceptance thresholds and escalation.

pub mod freetext;
pub mod heuristic;
pub mod structured;

/// Reduce an HTML document to plain text lines.
///
/// Script and style blocks are dropped, block-level closers become line
/// breaks, remaining tags are stripped, and common entities are decoded.
/// The heuristic tier scans these lines; the free-text tier ships them to
/// the collaborator.
pub fn html_to_text(html: &str) -> String {
    let without_scripts = drop_element_blocks(html, "script");
    let without_styles = drop_element_blocks(&without_scripts, "style");

    // Block-level closers and <br> become newlines so one schedule row
    // stays on one line
    let mut text = String::with_capacity(without_styles.len());
    let mut rest = without_styles.as_str();
    while let Some(start) = rest.find('<') {
        text.push_str(&rest[..start]);
        let Some(end_rel) = rest[start..].find('>') else {
            rest = "";
            break;
        };
        let tag = rest[start + 1..start + end_rel].to_ascii_lowercase();
        let tag_name = tag
            .trim_start_matches('/')
            .split([' ', '/', '\t', '\n'])
            .next()
            .unwrap_or("");
        if matches!(
            tag_name,
            "br" | "p" | "div" | "li" | "tr" | "td" | "table" | "ul" | "ol" | "h1" | "h2" | "h3"
                | "h4" | "h5" | "h6" | "section" | "article"
        ) {
            text.push('\n');
        } else {
            text.push(' ');
        }
        rest = &rest[start + end_rel + 1..];
    }
    text.push_str(rest);

    let decoded = decode_entities(&text);

    // Collapse intra-line whitespace, drop empty lines
    decoded
        .lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Remove `<name ...>...</name>` blocks, case-insensitive
fn drop_element_blocks(html: &str, name: &str) -> String {
    let lower = html.to_ascii_lowercase();
    let open = format!("<{}", name);
    let close = format!("</{}>", name);

    let mut out = String::with_capacity(html.len());
    let mut pos = 0;
    while let Some(start_rel) = lower[pos..].find(&open) {
        let start = pos + start_rel;
        out.push_str(&html[pos..start]);
        match lower[start..].find(&close) {
            Some(end_rel) => pos = start + end_rel + close.len(),
            None => {
                // Unclosed block swallows the rest of the document
                return out;
            }
        }
    }
    out.push_str(&html[pos..]);
    out
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_to_text_keeps_rows_on_one_line() {
        let html = "<table><tr><td>Sunday</td><td>10:00 am</td></tr>\
                    <tr><td>Monday</td><td>7:30 am</td></tr></table>";
        let text = html_to_text(html);
        let lines: Vec<&str> = text.lines().collect();
        assert!(lines.iter().any(|l| l.contains("Sunday") && l.contains("10:00 am")));
        assert!(lines.iter().any(|l| l.contains("Monday") && l.contains("7:30 am")));
    }

    #[test]
    fn test_html_to_text_drops_scripts_and_styles() {
        let html = "<style>.x{color:red}</style><p>Mass</p>\
                    <script>var t = '9:00';</script>";
        let text = html_to_text(html);
        assert_eq!(text, "Mass");
    }

    #[test]
    fn test_entities_decoded() {
        let html = "<p>Saturday&nbsp;5:00 pm &amp; Sunday 10:00 am</p>";
        let text = html_to_text(html);
        assert!(text.contains("Saturday 5:00 pm & Sunday 10:00 am"));
    }
}
