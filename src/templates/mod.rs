//! Built-in site templates using the Tera template engine
//!
//! Templates and their static assets are embedded in the binary.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::content::NormalizedBlock;

/// Stylesheet written to `css/style.css` unless the site provides one
pub const STYLESHEET: &str = include_str!("site/assets/style.css");

/// Logo written to `images/logo.svg` unless the site provides one
pub const LOGO: &str = include_str!("site/assets/logo.svg");

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new() -> Result<Self> {
        let mut tera = Tera::default();

        // Templates escape text fields explicitly; rich-text HTML is emitted as-is
        tera.autoescape_on(vec![]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("404.html", include_str!("site/404.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
            (
                "partials/post_info.html",
                include_str!("site/partials/post_info.html"),
            ),
            ("partials/nav.html", include_str!("site/partials/nav.html")),
            (
                "partials/comments.html",
                include_str!("site/partials/comments.html"),
            ),
            (
                "partials/preview.html",
                include_str!("site/partials/preview.html"),
            ),
        ])?;

        tera.register_filter("escape_attr", escape_attr_filter);

        Ok(Self { tera })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }
}

/// Tera filter: escape a value for a quoted attribute, leaving `/` intact
fn escape_attr_filter(
    value: &tera::Value,
    _args: &HashMap<String, tera::Value>,
) -> tera::Result<tera::Value> {
    let s = tera::try_get_value!("escape_attr", "value", String, value);
    Ok(tera::Value::String(crate::helpers::html_escape(&s)))
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub language: String,
    pub root: String,
    pub url: String,
    /// Pre-rendered generator meta tag
    pub generator: String,
}

/// A post in the home listing, also the item type of listing chunks
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostCard {
    pub uid: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: String,
    /// Formatted publication date, empty when unpublished
    pub date: String,
    /// ISO 8601 publication date for `<time datetime>`
    pub datetime: String,
    pub url: String,
}

/// One page of the listing as served to the "load more" button
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListingChunk {
    pub results: Vec<PostCard>,
    pub next_page: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub uid: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub author: String,
    pub banner_url: Option<String>,
    pub date: String,
    pub datetime: String,
    /// "edited at" line, present only for republished posts
    pub edited: Option<String>,
    /// Reading time label, e.g. "4 min"
    pub reading_time: String,
    pub blocks: Vec<NormalizedBlock>,
    /// Absolute URL, used as the canonical link
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NavData {
    pub previous: Option<NavPost>,
    pub next: Option<NavPost>,
}

#[derive(Debug, Clone, Serialize)]
pub struct NavPost {
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CommentsData {
    pub script_src: String,
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PreviewData {
    pub exit_url: String,
}
