//! Content normalizer: raw document blocks to render-ready blocks

use serde::Serialize;
use std::collections::HashSet;

use super::richtext::{as_html, as_text};
use crate::prismic::ContentDocument;

/// A content block ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NormalizedBlock {
    pub heading: String,
    /// Anchor id derived from the heading
    pub anchor: String,
    pub body_html: String,
    pub body_plain_text: String,
}

/// Plain-text projection of a content block, used for word counting
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlainTextBlock {
    pub heading: String,
    /// One entry per rich-text node
    pub body: Vec<String>,
}

/// Both projections of a document's content
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NormalizedContent {
    pub display_blocks: Vec<NormalizedBlock>,
    pub plain_text_blocks: Vec<PlainTextBlock>,
}

/// Normalize the content blocks of a document
pub fn normalize(doc: &ContentDocument) -> NormalizedContent {
    let mut display_blocks = Vec::with_capacity(doc.data.content.len());
    let mut plain_text_blocks = Vec::with_capacity(doc.data.content.len());
    let mut anchors = HashSet::new();

    for (i, block) in doc.data.content.iter().enumerate() {
        let body = as_text(&block.body);

        display_blocks.push(NormalizedBlock {
            heading: block.heading.clone(),
            anchor: unique_anchor(anchor_for(&block.heading, i), &mut anchors),
            body_html: as_html(&block.body),
            body_plain_text: body.join("\n"),
        });

        plain_text_blocks.push(PlainTextBlock {
            heading: block.heading.clone(),
            body,
        });
    }

    NormalizedContent {
        display_blocks,
        plain_text_blocks,
    }
}

fn anchor_for(heading: &str, index: usize) -> String {
    let slug = slug::slugify(heading);
    if slug.is_empty() {
        format!("section-{}", index + 1)
    } else {
        slug
    }
}

/// Suffix repeated anchors with `-2`, `-3`, ...
fn unique_anchor(base: String, taken: &mut HashSet<String>) -> String {
    let mut anchor = base.clone();
    let mut n = 1;
    while !taken.insert(anchor.clone()) {
        n += 1;
        anchor = format!("{}-{}", base, n);
    }
    anchor
}
