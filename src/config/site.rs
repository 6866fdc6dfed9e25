//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Environment variable overriding `prismic.access_token`
pub const ACCESS_TOKEN_ENV: &str = "PRISMIC_ACCESS_TOKEN";

/// Environment variable overriding `prismic.endpoint`
pub const ENDPOINT_ENV: &str = "PRISMIC_ENDPOINT";

/// Environment variable overriding `prismic.webhook_secret`
pub const WEBHOOK_SECRET_ENV: &str = "PRISMIC_WEBHOOK_SECRET";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub author: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub source_dir: String,
    pub public_dir: String,

    // Date / Time format (date-fns style patterns)
    pub date_format: String,
    pub edited_format: String,

    // Listing
    pub per_page: usize,

    // Content source
    #[serde(default)]
    pub prismic: PrismicConfig,

    // Comment widget
    #[serde(default)]
    pub comments: CommentsConfig,

    // Store any additional fields
    #[serde(flatten)]
    pub extra: HashMap<String, serde_yaml::Value>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            author: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://localhost:4000".to_string(),
            root: "/".to_string(),

            source_dir: "source".to_string(),
            public_dir: "public".to_string(),

            date_format: "d MMM yyyy".to_string(),
            edited_format: "d MMM yyyy, 'às' HH:mm".to_string(),

            per_page: 5,

            prismic: PrismicConfig::default(),
            comments: CommentsConfig::default(),
            extra: HashMap::new(),
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let mut config: SiteConfig = serde_yaml::from_str(&content)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply `PRISMIC_*` environment overrides
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(
            std::env::var(ACCESS_TOKEN_ENV).ok(),
            std::env::var(ENDPOINT_ENV).ok(),
        );
        if let Some(secret) = std::env::var(WEBHOOK_SECRET_ENV).ok().filter(|s| !s.is_empty()) {
            self.prismic.webhook_secret = secret;
        }
    }

    fn apply_overrides(&mut self, access_token: Option<String>, endpoint: Option<String>) {
        if let Some(token) = access_token.filter(|t| !t.is_empty()) {
            tracing::debug!("Using access token from {}", ACCESS_TOKEN_ENV);
            self.prismic.access_token = token;
        }
        if let Some(endpoint) = endpoint.filter(|e| !e.is_empty()) {
            tracing::debug!("Using endpoint from {}", ENDPOINT_ENV);
            self.prismic.endpoint = endpoint;
        }
    }

    /// Listing page size, never zero
    pub fn page_size(&self) -> usize {
        self.per_page.max(1)
    }
}

/// Prismic repository configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PrismicConfig {
    /// API v2 endpoint, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub endpoint: String,
    pub access_token: String,
    /// Custom type holding blog posts
    pub document_type: String,
    /// Local JSON documents used instead of the API when set
    pub fixtures: String,
    /// Shared secret required by `POST /api/revalidate` when set
    pub webhook_secret: String,
}

impl Default for PrismicConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            access_token: String::new(),
            document_type: "posts".to_string(),
            fixtures: String::new(),
            webhook_secret: String::new(),
        }
    }
}

/// utterances comment widget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsConfig {
    pub enable: bool,
    /// GitHub repository holding the comment issues (`owner/name`)
    pub repo: String,
    pub issue_term: String,
    pub label: String,
    pub theme: String,
    pub script_src: String,
}

impl Default for CommentsConfig {
    fn default() -> Self {
        Self {
            enable: false,
            repo: String::new(),
            issue_term: "pathname".to_string(),
            label: "comentário :speech_balloon:".to_string(),
            theme: "github-dark".to_string(),
            script_src: "https://utteranc.es/client.js".to_string(),
        }
    }
}

impl CommentsConfig {
    /// Whether the widget can be mounted at all
    pub fn is_active(&self) -> bool {
        self.enable && !self.repo.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.language, "pt-BR");
        assert_eq!(config.prismic.document_type, "posts");
        assert!(!config.comments.is_active());
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
per_page: 2
prismic:
  endpoint: https://blog.cdn.prismic.io/api/v2
  webhook_secret: hook
comments:
  enable: true
  repo: someone/comments
github_username: someone
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(config.per_page, 2);
        assert_eq!(config.prismic.endpoint, "https://blog.cdn.prismic.io/api/v2");
        assert_eq!(config.prismic.document_type, "posts");
        assert_eq!(config.prismic.webhook_secret, "hook");
        assert!(config.comments.is_active());
        assert_eq!(config.comments.theme, "github-dark");
        assert!(config.extra.contains_key("github_username"));
    }

    #[test]
    fn test_overrides() {
        let mut config = SiteConfig::default();
        config.apply_overrides(Some("secret".to_string()), Some(String::new()));
        assert_eq!(config.prismic.access_token, "secret");
        assert_eq!(config.prismic.endpoint, "");
    }

    #[test]
    fn test_page_size_never_zero() {
        let config = SiteConfig {
            per_page: 0,
            ..SiteConfig::default()
        };
        assert_eq!(config.page_size(), 1);
    }
}
