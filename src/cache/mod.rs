//! Cache module for incremental generation
//!
//! Tracks a hash of every post's render inputs (document plus neighbor
//! links) so unchanged post pages are not rewritten, and remembers output
//! paths so pages of removed posts can be deleted.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::Path;
use walkdir::WalkDir;

/// Cache directory, relative to the site root
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name inside `CACHE_DIR`
const CACHE_FILE: &str = "db.json";

/// Represents a cached entry for a rendered post
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Hash of the post's render inputs
    pub content_hash: u64,
    /// Output path relative to public dir
    pub output_path: String,
}

/// Cache database for tracking post changes
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CacheDb {
    /// Version of the cache format
    pub version: u32,
    /// Hash of the site config, language files and binary version
    pub config_hash: u64,
    /// Cached entries keyed by post uid
    pub posts: HashMap<String, CacheEntry>,
}

impl CacheDb {
    /// Current cache format version
    const VERSION: u32 = 1;

    /// Load cache from disk, or create a new empty cache
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_DIR).join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<CacheDb>(&content) {
                Ok(cache) if cache.version == Self::VERSION => return cache,
                Ok(_) => tracing::info!("Cache version mismatch, rebuilding cache"),
                Err(e) => tracing::warn!("Ignoring unreadable cache {:?}: {}", cache_path, e),
            }
        }
        Self::new()
    }

    /// Save cache to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        let cache_dir = base_dir.join(CACHE_DIR);
        fs::create_dir_all(&cache_dir)?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(cache_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    /// Create a new cache with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }
}

/// Change detection result
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    /// Posts that need rendering (uid)
    pub changed_posts: Vec<String>,
    /// Posts whose cached output is still valid (uid)
    pub unchanged_posts: Vec<String>,
    /// Posts no longer listed, with their old entry
    pub deleted_posts: Vec<(String, CacheEntry)>,
    /// Whether every post must be rendered again
    pub full_rebuild: bool,
}

impl ChangeSet {
    /// Check if any changes were detected
    pub fn has_changes(&self) -> bool {
        self.full_rebuild || !self.changed_posts.is_empty() || !self.deleted_posts.is_empty()
    }

    /// Get summary of changes for logging
    pub fn summary(&self) -> String {
        if self.full_rebuild {
            return "full rebuild required".to_string();
        }

        let mut parts = Vec::new();
        if !self.changed_posts.is_empty() {
            parts.push(format!("{} posts changed", self.changed_posts.len()));
        }
        if !self.deleted_posts.is_empty() {
            parts.push(format!("{} posts deleted", self.deleted_posts.len()));
        }

        if parts.is_empty() {
            "no changes".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Calculate a hash for string content
pub fn hash_content(content: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    content.hash(&mut hasher);
    hasher.finish()
}

/// Calculate a hash for a serializable value through its JSON form
pub fn hash_json<T: Serialize>(value: &T) -> Result<u64> {
    Ok(hash_content(&serde_json::to_string(value)?))
}

/// Calculate hash for a directory's YAML/JSON files
pub fn hash_directory(dir: &Path) -> u64 {
    let mut hasher = DefaultHasher::new();

    // Collect and sort paths for deterministic ordering
    let mut paths: Vec<_> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_file())
        .map(|e| e.path().to_path_buf())
        .collect();

    paths.sort();

    for path in paths {
        let ext = path.extension().and_then(|e| e.to_str());
        if matches!(ext, Some("yml") | Some("yaml") | Some("json")) {
            if let Ok(content) = fs::read_to_string(&path) {
                path.to_string_lossy().hash(&mut hasher);
                content.hash(&mut hasher);
            }
        }
    }

    hasher.finish()
}

/// Calculate hash for everything that affects every page
pub fn hash_config(base_dir: &Path) -> Result<u64> {
    let mut hasher = DefaultHasher::new();
    env!("CARGO_PKG_VERSION").hash(&mut hasher);

    let config_path = base_dir.join("_config.yml");
    if config_path.exists() {
        fs::read_to_string(&config_path)?.hash(&mut hasher);
    }

    let languages = base_dir.join("languages");
    if languages.exists() {
        hash_directory(&languages).hash(&mut hasher);
    }

    Ok(hasher.finish())
}

/// Detect changes between current posts and cached state
pub fn detect_changes(
    cache: &CacheDb,
    config_hash: u64,
    current_posts: &[(String, u64)], // (uid, hash)
) -> ChangeSet {
    let mut changeset = ChangeSet::default();

    if cache.config_hash != config_hash {
        if cache.config_hash != 0 {
            tracing::info!("Config changed, full rebuild required");
        }
        changeset.full_rebuild = true;
    }

    for (uid, hash) in current_posts {
        match cache.posts.get(uid) {
            Some(cached) if !changeset.full_rebuild && cached.content_hash == *hash => {
                changeset.unchanged_posts.push(uid.clone());
            }
            Some(_) => {
                tracing::debug!("Post changed: {}", uid);
                changeset.changed_posts.push(uid.clone());
            }
            None => {
                tracing::debug!("New post: {}", uid);
                changeset.changed_posts.push(uid.clone());
            }
        }
    }

    let current: HashSet<&str> = current_posts.iter().map(|(uid, _)| uid.as_str()).collect();
    let mut deleted: Vec<_> = cache
        .posts
        .iter()
        .filter(|(uid, _)| !current.contains(uid.as_str()))
        .map(|(uid, entry)| (uid.clone(), entry.clone()))
        .collect();
    deleted.sort_by(|a, b| a.0.cmp(&b.0));
    for (uid, _) in &deleted {
        tracing::debug!("Deleted post: {}", uid);
    }
    changeset.deleted_posts = deleted;

    changeset
}

/// Update cache with current state
pub fn update_cache(
    cache: &mut CacheDb,
    config_hash: u64,
    posts: &[(String, u64, String)], // (uid, hash, output_path)
) {
    cache.version = CacheDb::VERSION;
    cache.config_hash = config_hash;

    cache.posts.clear();
    for (uid, hash, output_path) in posts {
        cache.posts.insert(
            uid.clone(),
            CacheEntry {
                content_hash: *hash,
                output_path: output_path.clone(),
            },
        );
    }
}
