//! Generate static files

use anyhow::Result;
use notify::RecursiveMode;
use notify_debouncer_mini::{new_debouncer, DebounceEventResult};
use std::collections::HashSet;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use crate::cache::{self, CacheDb, CACHE_DIR};
use crate::content::{is_safe_uid, PostSummary};
use crate::generator::{post_output_path, Generator};
use crate::pagination::{NeighborPair, NeighborTracker, PostListing};
use crate::prismic::{ContentDocument, ContentSource};
use crate::Blog;

/// Outcome of one generation run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    /// Listing pages walked
    pub listing_pages: usize,
    /// Posts found in the listing
    pub listed: usize,
    /// Post pages written
    pub rendered: usize,
    /// Post pages left untouched
    pub unchanged: usize,
    /// Post pages deleted
    pub removed: usize,
    /// Posts skipped after an error
    pub failed: usize,
}

/// Everything a post page is rendered from
struct PostInput {
    uid: String,
    document: ContentDocument,
    neighbors: NeighborPair,
    hash: u64,
}

/// Generate the static site (with incremental support)
pub async fn run(blog: &Blog) -> Result<()> {
    run_with_options(blog, false).await.map(|_| ())
}

/// Generate with force option
pub async fn run_with_options(blog: &Blog, force: bool) -> Result<GenerateReport> {
    let source = blog.content_source(None)?;
    tracing::debug!("Using {} content source", source.name());
    generate_from(blog, source.as_ref(), force).await
}

/// Generate the site from an explicit content source
pub async fn generate_from(
    blog: &Blog,
    source: &dyn ContentSource,
    force: bool,
) -> Result<GenerateReport> {
    let start = std::time::Instant::now();
    let mut report = GenerateReport::default();

    let generator = Generator::new(blog)?;
    fs::create_dir_all(&blog.public_dir)?;
    let copied = generator.copy_source_assets()?;
    generator.write_builtin_assets()?;
    tracing::debug!("Copied {} source assets", copied);

    // Walk the whole listing, keeping page boundaries for the chunks
    let mut listing =
        PostListing::first_page(source, blog.document_type(), blog.config.page_size()).await?;
    let mut pages: Vec<Vec<PostSummary>> = vec![listing.items().to_vec()];
    while listing.has_more() {
        let added = listing.load_next_page(source).await?.to_vec();
        if !added.is_empty() {
            pages.push(added);
        }
    }
    // Uids become directory names
    let mut rejected = 0;
    for page in &mut pages {
        page.retain(|summary| {
            let safe = is_safe_uid(&summary.uid);
            if !safe {
                tracing::warn!("Skipping post with unusable uid {:?}", summary.uid);
                rejected += 1;
            }
            safe
        });
    }
    pages.retain(|page| !page.is_empty());
    if pages.is_empty() {
        pages.push(Vec::new());
    }
    report.listing_pages = pages.len();
    report.listed = pages.iter().map(Vec::len).sum();
    tracing::info!(
        "Loaded {} posts in {} listing pages",
        report.listed,
        report.listing_pages
    );

    generator.write_listing(&pages)?;

    // Fetch every post with its neighbors
    let mut tracker = NeighborTracker::new(blog.document_type());
    let mut inputs = Vec::new();
    let mut failed_uids = HashSet::new();
    let mut seen = HashSet::new();

    for summary in listing.items() {
        if !is_safe_uid(&summary.uid) || !seen.insert(summary.uid.clone()) {
            continue;
        }

        let document = match source.get_by_uid(blog.document_type(), &summary.uid).await {
            Ok(document) => document,
            Err(e) => {
                tracing::warn!("Skipping post {}: {}", summary.uid, e);
                failed_uids.insert(summary.uid.clone());
                continue;
            }
        };

        let neighbors = tracker.navigate(source, &document).await;
        let hash = cache::hash_json(&(&document, &neighbors))?;
        inputs.push(PostInput {
            uid: summary.uid.clone(),
            document,
            neighbors,
            hash,
        });
    }
    report.failed = failed_uids.len() + rejected;

    // Detect changes
    let config_hash = cache::hash_config(&blog.base_dir)?;
    let old_cache = if force {
        tracing::info!("Full generation (force)");
        CacheDb::new()
    } else {
        CacheDb::load(&blog.base_dir)
    };

    let current: Vec<_> = inputs.iter().map(|i| (i.uid.clone(), i.hash)).collect();
    let mut changeset = cache::detect_changes(&old_cache, config_hash, &current);
    changeset
        .deleted_posts
        .retain(|(uid, _)| !failed_uids.contains(uid));
    tracing::info!("Changes detected: {}", changeset.summary());

    let changed: HashSet<&str> = changeset.changed_posts.iter().map(String::as_str).collect();
    let mut cache_entries = Vec::new();

    for input in &inputs {
        let relative = post_output_path(&input.uid);

        if changed.contains(input.uid.as_str()) || !generator.output_exists(&relative) {
            if let Err(e) = generator.write_post(&input.document, &input.neighbors) {
                tracing::warn!("Failed to render post {}: {}", input.uid, e);
                report.failed += 1;
                continue;
            }
            report.rendered += 1;
        } else {
            report.unchanged += 1;
        }

        cache_entries.push((input.uid.clone(), input.hash, relative));
    }

    // Posts that could not be fetched keep their previous page
    for uid in &failed_uids {
        if let Some(entry) = old_cache.posts.get(uid) {
            cache_entries.push((uid.clone(), entry.content_hash, entry.output_path.clone()));
        }
    }

    for (uid, entry) in &changeset.deleted_posts {
        if let Err(e) = generator.remove_output(&entry.output_path) {
            tracing::warn!("Not removing post {}: {}", uid, e);
            continue;
        }
        tracing::info!("Removed post {}", uid);
        report.removed += 1;
    }

    generator.write_not_found()?;

    // Update cache
    let mut new_cache = CacheDb::new();
    cache::update_cache(&mut new_cache, config_hash, &cache_entries);
    new_cache.save(&blog.base_dir)?;

    tracing::info!(
        "Generated {} posts ({} unchanged, {} removed, {} failed) in {:.2}s",
        report.rendered,
        report.unchanged,
        report.removed,
        report.failed,
        start.elapsed().as_secs_f64()
    );

    Ok(report)
}

/// Watch the config, language files and assets and regenerate on change
///
/// Each successful regeneration is announced on `reload_tx` when given.
pub async fn watch(blog: &Blog, reload_tx: Option<broadcast::Sender<()>>) -> Result<()> {
    let (tx, mut rx) = mpsc::unbounded_channel();

    // Create debouncer to avoid multiple rapid rebuilds
    let mut debouncer = new_debouncer(
        Duration::from_millis(500),
        move |result: DebounceEventResult| {
            let _ = tx.send(result);
        },
    )?;

    let watched: Vec<(PathBuf, RecursiveMode)> = vec![
        (blog.source_dir.clone(), RecursiveMode::Recursive),
        (blog.base_dir.join("languages"), RecursiveMode::Recursive),
        (blog.base_dir.join("_config.yml"), RecursiveMode::NonRecursive),
    ];
    let fixtures = (!blog.config.prismic.fixtures.is_empty())
        .then(|| (blog.base_dir.join(&blog.config.prismic.fixtures), RecursiveMode::NonRecursive));

    for (path, mode) in watched.into_iter().chain(fixtures) {
        if path.exists() {
            debouncer.watcher().watch(&path, mode)?;
            tracing::debug!("Watching: {:?}", path);
        }
    }

    tracing::info!("Watching for changes. Press Ctrl+C to stop.");

    let public_dir = blog.public_dir.clone();
    let cache_dir = blog.base_dir.join(CACHE_DIR);

    while let Some(result) = rx.recv().await {
        let events = match result {
            Ok(events) => events,
            Err(e) => {
                tracing::error!("Watch error: {:?}", e);
                continue;
            }
        };

        // Filter out irrelevant events (like our own output, .git, etc.)
        let relevant: Vec<_> = events
            .iter()
            .filter(|e| {
                let path_str = e.path.to_string_lossy();
                !e.path.starts_with(&public_dir)
                    && !e.path.starts_with(&cache_dir)
                    && !path_str.contains(".git")
                    && !path_str.contains(".DS_Store")
                    && !path_str.ends_with('~')
            })
            .collect();

        if relevant.is_empty() {
            continue;
        }

        for event in &relevant {
            tracing::info!("File changed: {}", event.path.display());
        }

        // Config may have changed: reload it
        let blog = match Blog::new(&blog.base_dir) {
            Ok(blog) => blog,
            Err(e) => {
                tracing::error!("Invalid configuration: {}", e);
                continue;
            }
        };

        match run_with_options(&blog, false).await {
            Ok(_) => {
                if let Some(reload_tx) = &reload_tx {
                    let _ = reload_tx.send(());
                }
            }
            Err(e) => tracing::error!("Generation failed: {}", e),
        }
    }

    Ok(())
}

/// Clear the cache
pub fn clear_cache(blog: &Blog) -> Result<()> {
    let cache_dir = blog.base_dir.join(CACHE_DIR);
    if cache_dir.exists() {
        fs::remove_dir_all(&cache_dir)?;
        tracing::info!("Cache cleared");
    }
    Ok(())
}
