//! Generator module - renders pages with the built-in Tera templates
//!
//! Rendering is shared by the static build and the preview server; the
//! `write_*` methods put rendered pages under the public directory.

use anyhow::{Context as _, Result};
use chrono::{DateTime, Utc};
use std::fs;
use std::path::{Component, Path};

use tera::Context;
use walkdir::WalkDir;

use crate::content::{is_safe_uid, Post, PostSummary};
use crate::helpers::{date_xml, format_date, full_url_for, meta_generator, url_for};
use crate::i18n::I18n;
use crate::pagination::{NeighborLink, NeighborPair};
use crate::prismic::ContentDocument;
use crate::templates::{
    CommentsData, ListingChunk, NavData, NavPost, PostCard, PostPageData, PreviewData, SiteData,
    TemplateRenderer, LOGO, STYLESHEET,
};
use crate::Blog;

/// Directory of the listing chunks, relative to the public dir
pub const LISTING_DIR: &str = "posts";

/// Path of listing chunk `page` (1-based), relative to the site root
pub fn listing_chunk_path(page: usize) -> String {
    format!("{}/page-{}.json", LISTING_DIR, page)
}

/// Output file of a post page, relative to the public dir
pub fn post_output_path(uid: &str) -> String {
    format!("{}index.html", crate::content::post_path(uid))
}

/// Static site generator using Tera templates
pub struct Generator {
    blog: Blog,
    renderer: TemplateRenderer,
    i18n: I18n,
}

impl Generator {
    /// Create a new generator
    pub fn new(blog: &Blog) -> Result<Self> {
        Ok(Self {
            blog: blog.clone(),
            renderer: TemplateRenderer::new()?,
            i18n: blog.i18n(),
        })
    }

    fn site_data(&self) -> SiteData {
        let config = &self.blog.config;
        SiteData {
            title: config.title.clone(),
            description: config.description.clone(),
            language: config.language.clone(),
            root: url_for(config, ""),
            url: config.url.clone(),
            generator: meta_generator(),
        }
    }

    /// Create a base context with common variables
    fn create_base_context(&self, preview: bool) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site_data());
        context.insert("t", &self.i18n.get_all_translations());

        let preview = preview.then(|| PreviewData {
            exit_url: url_for(&self.blog.config, "api/exit-preview"),
        });
        context.insert("preview", &preview);
        context
    }

    /// Formatted and machine-readable forms of a date
    fn dates(&self, date: Option<DateTime<Utc>>, pattern: &str) -> (String, String) {
        let config = &self.blog.config;
        match date {
            Some(date) => (
                format_date(&date, pattern, &config.timezone, &config.language),
                date_xml(&date),
            ),
            None => (String::new(), String::new()),
        }
    }

    /// Listing card of a post
    pub fn card(&self, summary: &PostSummary) -> PostCard {
        let (date, datetime) = self.dates(
            summary.first_publication_date,
            &self.blog.config.date_format,
        );
        PostCard {
            uid: summary.uid.clone(),
            title: summary.title.clone(),
            subtitle: summary.subtitle.clone().filter(|s| !s.is_empty()),
            author: summary.author.clone(),
            date,
            datetime,
            url: url_for(&self.blog.config, &summary.path()),
        }
    }

    /// One listing page as served to the "load more" button
    pub fn listing_chunk(&self, summaries: &[PostSummary], next_page: Option<String>) -> ListingChunk {
        ListingChunk {
            results: summaries.iter().map(|s| self.card(s)).collect(),
            next_page,
        }
    }

    /// Render the home page
    pub fn render_index_html(
        &self,
        cards: &[PostCard],
        next_page: Option<&str>,
        preview: bool,
    ) -> Result<String> {
        let mut context = self.create_base_context(preview);
        context.insert("posts", cards);
        context.insert("next_page", &next_page);
        self.renderer.render("index.html", &context)
    }

    fn page_data(&self, post: &Post) -> PostPageData {
        let config = &self.blog.config;
        let (date, datetime) = self.dates(post.first_publication_date, &config.date_format);

        let edited = if post.was_edited() {
            let (edited_at, _) = self.dates(post.last_publication_date, &config.edited_format);
            Some(format!("{} {}", self.i18n.get("edited"), edited_at))
        } else {
            None
        };

        PostPageData {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            banner_url: post.banner_url.clone(),
            date,
            datetime,
            edited,
            reading_time: self.i18n.get_count("reading_time", post.reading_time),
            blocks: post.blocks.clone(),
            url: full_url_for(config, &post.path()),
        }
    }

    fn nav_post(&self, link: &Option<NeighborLink>) -> Option<NavPost> {
        link.as_ref().filter(|link| is_safe_uid(&link.uid)).map(|link| NavPost {
            title: link.title.clone(),
            url: url_for(&self.blog.config, &crate::content::post_path(&link.uid)),
        })
    }

    fn comments_data(&self) -> Option<CommentsData> {
        let comments = &self.blog.config.comments;
        comments.is_active().then(|| CommentsData {
            script_src: comments.script_src.clone(),
            repo: comments.repo.clone(),
            issue_term: comments.issue_term.clone(),
            label: comments.label.clone(),
            theme: comments.theme.clone(),
        })
    }

    /// Render a post page
    pub fn render_post_html(
        &self,
        doc: &ContentDocument,
        neighbors: &NeighborPair,
        preview: bool,
    ) -> Result<String> {
        let post = Post::from_document(doc);

        let mut context = self.create_base_context(preview);
        context.insert("post", &self.page_data(&post));
        context.insert(
            "nav",
            &NavData {
                previous: self.nav_post(&neighbors.previous),
                next: self.nav_post(&neighbors.next),
            },
        );
        context.insert("comments", &self.comments_data());
        self.renderer.render("post.html", &context)
    }

    /// Render the not-found page
    pub fn render_not_found_html(&self, preview: bool) -> Result<String> {
        let context = self.create_base_context(preview);
        self.renderer.render("404.html", &context)
    }

    fn write_public(&self, relative: &str, content: &str) -> Result<()> {
        let output_path = self.blog.public_dir.join(relative.trim_start_matches('/'));
        if let Some(parent) = output_path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create dir {:?}", parent))?;
        }
        fs::write(&output_path, content)
            .with_context(|| format!("Failed to write {:?}", output_path))?;
        tracing::debug!("Generated: {:?}", output_path);
        Ok(())
    }

    /// Write the home page and one JSON chunk per listing page
    pub fn write_listing(&self, pages: &[Vec<PostSummary>]) -> Result<()> {
        let config = &self.blog.config;
        let next_link = |page: usize| {
            (page < pages.len()).then(|| url_for(config, &listing_chunk_path(page + 1)))
        };

        for (i, summaries) in pages.iter().enumerate() {
            let page = i + 1;
            let chunk = self.listing_chunk(summaries, next_link(page));
            self.write_public(&listing_chunk_path(page), &serde_json::to_string(&chunk)?)?;

            if page == 1 {
                let html =
                    self.render_index_html(&chunk.results, chunk.next_page.as_deref(), false)?;
                self.write_public("index.html", &html)?;
            }
        }

        if pages.is_empty() {
            let html = self.render_index_html(&[], None, false)?;
            self.write_public("index.html", &html)?;
        }

        tracing::info!("Generated listing ({} pages)", pages.len().max(1));
        Ok(())
    }

    /// Write a post page, returning its path relative to the public dir
    pub fn write_post(&self, doc: &ContentDocument, neighbors: &NeighborPair) -> Result<String> {
        if !is_safe_uid(&doc.uid) {
            anyhow::bail!("Refusing to write post with uid {:?}", doc.uid);
        }
        let html = self.render_post_html(doc, neighbors, false)?;
        let relative = post_output_path(&doc.uid);
        self.write_public(&relative, &html)?;
        Ok(relative)
    }

    /// Whether a previously generated file is still on disk
    pub fn output_exists(&self, relative: &str) -> bool {
        self.blog.public_dir.join(relative).exists()
    }

    /// Delete a generated post page and its directory when left empty
    pub fn remove_output(&self, relative: &str) -> Result<()> {
        let inside = Path::new(relative)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if relative.is_empty() || !inside {
            anyhow::bail!("Refusing to delete {:?} outside the public dir", relative);
        }
        let path = self.blog.public_dir.join(relative);
        if path.exists() {
            fs::remove_file(&path)?;
            tracing::debug!("Deleted: {:?}", path);
        }
        if let Some(parent) = path.parent() {
            if parent != self.blog.public_dir && is_empty_dir(parent) {
                fs::remove_dir(parent)?;
            }
        }
        Ok(())
    }

    /// Write the not-found page
    pub fn write_not_found(&self) -> Result<()> {
        let html = self.render_not_found_html(false)?;
        self.write_public("404.html", &html)
    }

    /// Copy source assets (images, etc.) to public directory
    pub fn copy_source_assets(&self) -> Result<usize> {
        let source_dir = &self.blog.source_dir;
        if !source_dir.exists() {
            return Ok(0);
        }

        let mut copied = 0;
        for entry in WalkDir::new(source_dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if !path.is_file() {
                continue;
            }

            let relative = path.strip_prefix(source_dir)?;
            let dest = self.blog.public_dir.join(relative);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::copy(path, &dest)?;
            copied += 1;
        }

        Ok(copied)
    }

    /// Write the built-in stylesheet and logo unless the site ships its own
    pub fn write_builtin_assets(&self) -> Result<()> {
        for (relative, content) in [("css/style.css", STYLESHEET), ("images/logo.svg", LOGO)] {
            if !self.output_exists(relative) {
                self.write_public(relative, content)?;
            }
        }
        Ok(())
    }
}

fn is_empty_dir(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::prismic::document::parse_timestamp;
    use crate::prismic::{ContentBlock, RichTextNode};
    use tempfile::TempDir;

    fn blog(dir: &Path) -> Blog {
        let mut config = SiteConfig::default();
        config.timezone = "America/Sao_Paulo".to_string();
        config.comments.enable = true;
        config.comments.repo = "someone/comments".to_string();
        Blog::with_config(dir, config)
    }

    fn document(uid: &str) -> ContentDocument {
        let mut doc = ContentDocument::new(uid, uid, "posts");
        doc.first_publication_date = parse_timestamp("2021-03-25T19:25:28+0000");
        doc.last_publication_date = parse_timestamp("2021-03-26T18:49:00+0000");
        doc.data.title = "Como utilizar Hooks".to_string();
        doc.data.author = "Joseph Oliveira".to_string();
        doc.data.content = vec![ContentBlock {
            heading: "Proin et varius".to_string(),
            body: vec![RichTextNode::paragraph(&vec!["lorem"; 397].join(" "))],
        }];
        doc
    }

    #[test]
    fn test_card() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(dir.path())).unwrap();
        let card = generator.card(&PostSummary::from_document(&document("hooks")));
        assert_eq!(card.date, "25 mar 2021");
        assert_eq!(card.url, "/post/hooks/");
        assert_eq!(card.subtitle, None);
    }

    #[test]
    fn test_render_post_html() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(dir.path())).unwrap();
        let neighbors = NeighborPair {
            previous: Some(NeighborLink {
                title: "Older".to_string(),
                uid: "older".to_string(),
            }),
            next: None,
        };

        let html = generator
            .render_post_html(&document("hooks"), &neighbors, false)
            .unwrap();
        assert!(html.contains("Como utilizar Hooks | spacetraveling"));
        assert!(html.contains("2 min"));
        assert!(html.contains("* editado em 26 mar 2021, às 15:49"));
        assert!(html.contains(r#"href="/post/older/""#));
        assert!(html.contains(r#"<link rel="canonical" href="http://localhost:4000/post/hooks/">"#));
        assert!(html.contains("someone/comments"));
        assert!(!html.contains("exit-preview"));
    }

    #[test]
    fn test_write_listing() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(dir.path())).unwrap();
        let pages = vec![
            vec![PostSummary::from_document(&document("b"))],
            vec![PostSummary::from_document(&document("a"))],
        ];
        generator.write_listing(&pages).unwrap();

        let public = dir.path().join("public");
        let index = fs::read_to_string(public.join("index.html")).unwrap();
        assert!(index.contains(r#"data-next="/posts/page-2.json""#));

        let first: ListingChunk =
            serde_json::from_str(&fs::read_to_string(public.join("posts/page-1.json")).unwrap())
                .unwrap();
        assert_eq!(first.next_page.as_deref(), Some("/posts/page-2.json"));

        let last: ListingChunk =
            serde_json::from_str(&fs::read_to_string(public.join("posts/page-2.json")).unwrap())
                .unwrap();
        assert_eq!(last.results[0].uid, "a");
        assert_eq!(last.next_page, None);
    }

    #[test]
    fn test_write_and_remove_post() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(dir.path())).unwrap();

        let relative = generator
            .write_post(&document("hooks"), &NeighborPair::default())
            .unwrap();
        assert_eq!(relative, "post/hooks/index.html");
        assert!(generator.output_exists(&relative));

        generator.remove_output(&relative).unwrap();
        assert!(!generator.output_exists(&relative));
        assert!(!dir.path().join("public/post/hooks").exists());
    }

    #[test]
    fn test_unsafe_paths_are_refused() {
        let dir = TempDir::new().unwrap();
        let generator = Generator::new(&blog(dir.path())).unwrap();

        assert!(generator
            .write_post(&document("../../outside"), &NeighborPair::default())
            .is_err());
        assert!(!dir.path().join("outside").exists());

        let victim = dir.path().join("keep.txt");
        fs::write(&victim, "keep").unwrap();
        for relative in ["../keep.txt", "/etc/hostname", "post/../../keep.txt", ""] {
            assert!(generator.remove_output(relative).is_err(), "{}", relative);
        }
        assert!(victim.exists());
    }

    #[test]
    fn test_builtin_assets_do_not_overwrite() {
        let dir = TempDir::new().unwrap();
        let site = blog(dir.path());
        fs::create_dir_all(site.source_dir.join("css")).unwrap();
        fs::write(site.source_dir.join("css/style.css"), "body {}").unwrap();

        let generator = Generator::new(&site).unwrap();
        assert_eq!(generator.copy_source_assets().unwrap(), 1);
        generator.write_builtin_assets().unwrap();

        let public = dir.path().join("public");
        assert_eq!(fs::read_to_string(public.join("css/style.css")).unwrap(), "body {}");
        assert!(public.join("images/logo.svg").exists());
    }
}
