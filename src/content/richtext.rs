//! Rich-text rendering
//!
//! HTML and plain text are both projected straight from the nodes. Plain
//! text is never recovered by stripping the HTML.

use crate::helpers::html_escape;
use crate::prismic::{NodeKind, RichTextNode, Span, SpanKind};

/// Render structured text to HTML
///
/// Consecutive list items are grouped into a single `<ul>`/`<ol>`.
pub fn as_html(nodes: &[RichTextNode]) -> String {
    let mut html = String::new();
    let mut open_list: Option<&'static str> = None;

    for node in nodes {
        let list_tag = match node.kind {
            NodeKind::ListItem => Some("ul"),
            NodeKind::OrderedListItem => Some("ol"),
            _ => None,
        };

        if open_list != list_tag {
            if let Some(tag) = open_list {
                html.push_str(&format!("</{}>", tag));
            }
            if let Some(tag) = list_tag {
                html.push_str(&format!("<{}>", tag));
            }
            open_list = list_tag;
        }

        html.push_str(&node_html(node));
    }

    if let Some(tag) = open_list {
        html.push_str(&format!("</{}>", tag));
    }

    html
}

/// Plain text of each node, one entry per node
pub fn as_text(nodes: &[RichTextNode]) -> Vec<String> {
    nodes
        .iter()
        .map(|node| match node.kind {
            NodeKind::Image | NodeKind::Embed => String::new(),
            _ => node.text.clone(),
        })
        .collect()
}

fn node_html(node: &RichTextNode) -> String {
    let inner = || render_spans(&node.text, &node.spans);
    match node.kind {
        NodeKind::Paragraph | NodeKind::Unknown => format!("<p>{}</p>", inner()),
        NodeKind::Heading1 => format!("<h1>{}</h1>", inner()),
        NodeKind::Heading2 => format!("<h2>{}</h2>", inner()),
        NodeKind::Heading3 => format!("<h3>{}</h3>", inner()),
        NodeKind::Heading4 => format!("<h4>{}</h4>", inner()),
        NodeKind::Heading5 => format!("<h5>{}</h5>", inner()),
        NodeKind::Heading6 => format!("<h6>{}</h6>", inner()),
        NodeKind::Preformatted => format!("<pre>{}</pre>", inner()),
        NodeKind::ListItem | NodeKind::OrderedListItem => format!("<li>{}</li>", inner()),
        NodeKind::Image => match node.url.as_deref() {
            Some(url) if !url.is_empty() => format!(
                r#"<p class="block-img"><img src="{}" alt="{}" /></p>"#,
                html_escape(url),
                html_escape(node.alt.as_deref().unwrap_or(""))
            ),
            _ => String::new(),
        },
        NodeKind::Embed => match &node.oembed {
            Some(embed) => format!(
                r#"<div data-oembed="{}" data-oembed-type="{}" data-oembed-provider="{}">{}</div>"#,
                html_escape(embed.embed_url.as_deref().unwrap_or("")),
                html_escape(embed.kind.as_deref().unwrap_or("")),
                html_escape(&embed.provider_name.as_deref().unwrap_or("").to_lowercase()),
                embed.html.as_deref().unwrap_or("")
            ),
            None => String::new(),
        },
    }
}

fn open_tag(span: &Span) -> String {
    match span.kind {
        SpanKind::Strong => "<strong>".to_string(),
        SpanKind::Em => "<em>".to_string(),
        SpanKind::Hyperlink => match span.href() {
            Some(href) => format!(
                r#"<a href="{}" target="_blank" rel="noopener">"#,
                html_escape(&href)
            ),
            None => "<a>".to_string(),
        },
        SpanKind::Label => format!(
            r#"<span class="{}">"#,
            html_escape(span.label().unwrap_or("label"))
        ),
        SpanKind::Unknown => "<span>".to_string(),
    }
}

fn close_tag(span: &Span) -> &'static str {
    match span.kind {
        SpanKind::Strong => "</strong>",
        SpanKind::Em => "</em>",
        SpanKind::Hyperlink => "</a>",
        SpanKind::Label | SpanKind::Unknown => "</span>",
    }
}

/// Apply spans to text, producing well-nested markup
///
/// Offsets are UTF-16 code units. When a span closes while spans opened
/// after it are still active, those are closed and reopened around the
/// boundary.
fn render_spans(text: &str, spans: &[Span]) -> String {
    let mut out = String::with_capacity(text.len());
    let mut open: Vec<&Span> = Vec::new();
    let mut pos = 0usize;

    for ch in text.chars() {
        boundary(&mut out, &mut open, spans, pos);
        match ch {
            '\n' => out.push_str("<br />"),
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
        pos += ch.len_utf16();
    }
    boundary(&mut out, &mut open, spans, pos);

    while let Some(span) = open.pop() {
        out.push_str(close_tag(span));
    }

    out
}

fn boundary<'a>(out: &mut String, open: &mut Vec<&'a Span>, spans: &'a [Span], pos: usize) {
    if let Some(idx) = open.iter().position(|s| s.end <= pos) {
        let closing: Vec<&Span> = open.drain(idx..).collect();
        for span in closing.iter().rev() {
            out.push_str(close_tag(span));
        }
        for span in closing.into_iter().filter(|s| s.end > pos) {
            out.push_str(&open_tag(span));
            open.push(span);
        }
    }

    let mut starting: Vec<&Span> = spans
        .iter()
        .filter(|s| s.start == pos && s.end > s.start)
        .collect();
    // Longest first so shorter spans nest inside
    starting.sort_by(|a, b| b.end.cmp(&a.end));
    for span in starting {
        out.push_str(&open_tag(span));
        open.push(span);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prismic::Embed;

    fn node_with_spans(text: &str, spans: Vec<Span>) -> RichTextNode {
        RichTextNode {
            spans,
            ..RichTextNode::paragraph(text)
        }
    }

    #[test]
    fn test_paragraph_and_escaping() {
        let html = as_html(&[RichTextNode::paragraph("a < b & \"c\"\nnext")]);
        assert_eq!(html, "<p>a &lt; b &amp; &quot;c&quot;<br />next</p>");
    }

    #[test]
    fn test_spans() {
        let node = node_with_spans(
            "Hello bold world",
            vec![
                Span::new(6, 10, SpanKind::Strong),
                Span::new(0, 16, SpanKind::Em),
            ],
        );
        assert_eq!(
            as_html(&[node]),
            "<p><em>Hello <strong>bold</strong> world</em></p>"
        );
    }

    #[test]
    fn test_overlapping_spans_stay_nested() {
        let node = node_with_spans(
            "abcdef",
            vec![Span::new(0, 4, SpanKind::Strong), Span::new(2, 6, SpanKind::Em)],
        );
        assert_eq!(
            as_html(&[node]),
            "<p><strong>ab<em>cd</em></strong><em>ef</em></p>"
        );
    }

    #[test]
    fn test_utf16_offsets() {
        // The emoji takes two UTF-16 code units
        let node = node_with_spans("😀 ação", vec![Span::new(3, 7, SpanKind::Strong)]);
        assert_eq!(as_html(&[node]), "<p>😀 <strong>ação</strong></p>");
    }

    #[test]
    fn test_hyperlink() {
        let mut link = Span::new(0, 4, SpanKind::Hyperlink);
        link.data = Some(serde_json::json!({ "url": "https://prismic.io" }));
        let node = node_with_spans("Docs here", vec![link]);
        assert_eq!(
            as_html(&[node]),
            r#"<p><a href="https://prismic.io" target="_blank" rel="noopener">Docs</a> here</p>"#
        );
    }

    #[test]
    fn test_list_grouping() {
        let nodes = vec![
            RichTextNode::new(NodeKind::ListItem, "one"),
            RichTextNode::new(NodeKind::ListItem, "two"),
            RichTextNode::new(NodeKind::OrderedListItem, "first"),
            RichTextNode::paragraph("after"),
        ];
        assert_eq!(
            as_html(&nodes),
            "<ul><li>one</li><li>two</li></ul><ol><li>first</li></ol><p>after</p>"
        );
    }

    #[test]
    fn test_image_and_embed() {
        let image = RichTextNode {
            url: Some("https://images.prismic.io/a.png".to_string()),
            alt: Some("A".to_string()),
            ..RichTextNode::new(NodeKind::Image, "")
        };
        let embed = RichTextNode {
            oembed: Some(Embed {
                html: Some("<iframe></iframe>".to_string()),
                embed_url: Some("https://youtu.be/x".to_string()),
                kind: Some("video".to_string()),
                provider_name: Some("YouTube".to_string()),
            }),
            ..RichTextNode::new(NodeKind::Embed, "")
        };
        let html = as_html(&[image, embed]);
        assert!(html.starts_with(
            r#"<p class="block-img"><img src="https://images.prismic.io/a.png" alt="A" /></p>"#
        ));
        assert!(html.contains(r#"data-oembed-provider="youtube"><iframe></iframe></div>"#));
    }

    #[test]
    fn test_as_text_is_independent_of_markup() {
        let nodes = vec![
            node_with_spans("bold<tag>", vec![Span::new(0, 4, SpanKind::Strong)]),
            RichTextNode::new(NodeKind::Image, "ignored"),
        ];
        assert_eq!(as_text(&nodes), vec!["bold<tag>".to_string(), String::new()]);
    }
}
