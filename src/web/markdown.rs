// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025 Jonathan D. A. Jewell <hyperpolymath>

//! Markdown answers to HTML for the result card

use pulldown_cmark::{html, Event, Options, Parser};

/// Render agent markdown as HTML; raw HTML in the source comes out as
/// escaped text.
pub fn to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let events = Parser::new_ext(markdown, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });

    let mut out = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut out, events);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_headings_and_lists() {
        let html = to_html("## Ingredients\n- **eggs**\n- flour\n");
        assert!(html.contains("<h2>Ingredients</h2>"));
        assert!(html.contains("<li><strong>eggs</strong></li>"));
        assert!(html.contains("<li>flour</li>"));
    }

    #[test]
    fn test_raw_html_is_escaped() {
        let html = to_html("<script>alert(1)</script>\n\nUse <b>two</b> eggs");
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<b>"));
    }

    #[test]
    fn test_tables() {
        let html = to_html("| Step | Time |\n|---|---|\n| Boil | 10m |\n");
        assert!(html.contains("<table>"));
        assert!(html.contains("<td>Boil</td>"));
    }
}
