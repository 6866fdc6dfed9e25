//! spacetraveling: a Prismic-backed blog generator and preview server
//!
//! Posts are fetched from a Prismic repository (or a local fixtures file),
//! normalized into render-ready blocks with an estimated reading time, and
//! rendered with embedded Tera templates into a static site. The listing is
//! walked page by page through the API's cursors and every post links to its
//! chronological neighbors.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod pagination;
pub mod prismic;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use prismic::{ContentSource, MemorySource, PrismicClient};

/// The blog application
#[derive(Clone)]
pub struct Blog {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Static assets copied verbatim into the output
    pub source_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl Blog {
    /// Create a new blog from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let config_path = base_dir.as_ref().join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.apply_env_overrides();
            config
        };

        Ok(Self::with_config(base_dir, config))
    }

    /// Create a blog from an already loaded configuration
    pub fn with_config<P: AsRef<Path>>(base_dir: P, config: config::SiteConfig) -> Self {
        let base_dir = base_dir.as_ref().to_path_buf();
        let source_dir = base_dir.join(&config.source_dir);
        let public_dir = base_dir.join(&config.public_dir);

        Self {
            config,
            base_dir,
            source_dir,
            public_dir,
        }
    }

    /// Custom type holding the posts
    pub fn document_type(&self) -> &str {
        &self.config.prismic.document_type
    }

    /// Open the configured content source
    ///
    /// A fixtures file takes precedence over the API. `preview_ref` pins
    /// API queries to a preview release.
    pub fn content_source(&self, preview_ref: Option<&str>) -> Result<Arc<dyn ContentSource>> {
        let prismic = &self.config.prismic;

        if !prismic.fixtures.is_empty() {
            if preview_ref.is_some() {
                tracing::debug!("Preview ref ignored for fixtures source");
            }
            let source = MemorySource::from_json_file(self.base_dir.join(&prismic.fixtures))?;
            return Ok(Arc::new(source));
        }

        let mut client = PrismicClient::new(prismic)?;
        if let Some(reference) = preview_ref {
            client = client.with_ref(reference);
        }
        Ok(Arc::new(client))
    }

    /// UI strings for the configured language
    pub fn i18n(&self) -> i18n::I18n {
        let mut i18n = i18n::I18n::with_builtin(&self.config.language);
        if let Err(e) = i18n.load_languages(self.base_dir.join("languages")) {
            tracing::warn!("Failed to load language files: {}", e);
        }
        i18n
    }

    /// Initialize a new site
    pub fn init(&self) -> Result<()> {
        commands::init::init_site(&self.base_dir)
    }

    /// Generate the static site
    pub async fn generate(&self) -> Result<()> {
        commands::generate::run(self).await
    }

    /// Clean the public directory
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
