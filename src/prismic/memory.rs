//! In-process content source over a fixed set of documents
//!
//! Used for offline generation from a fixtures file and in tests. It
//! understands the subset of the query language the blog issues.

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering as CmpOrdering;
use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};

use super::document::{parse_timestamp, ContentDocument, PaginatedListing, PostFields};
use super::predicate::{Ordering, Predicate, QueryOptions};
use super::source::{ContentSource, SourceError};

/// Prefix of the cursor tokens handed out by this source
const CURSOR_PREFIX: &str = "memory:";

/// Page size when a query does not ask for one (Prismic's default)
const DEFAULT_PAGE_SIZE: usize = 20;

/// Content source backed by a vector of documents
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    documents: Vec<ContentDocument>,
}

/// Everything needed to replay a query at another page
#[derive(Debug, Serialize, Deserialize)]
struct Cursor {
    predicates: Vec<Predicate>,
    options: QueryOptions,
}

/// Accepted fixtures layouts: a bare array or a search response
#[derive(Deserialize)]
#[serde(untagged)]
enum Fixtures {
    Documents(Vec<ContentDocument>),
    Listing { results: Vec<ContentDocument> },
}

impl MemorySource {
    /// Create a source; documents without an id are identified by their uid
    pub fn new(documents: Vec<ContentDocument>) -> Self {
        let documents = documents
            .into_iter()
            .map(|mut doc| {
                if doc.id.is_empty() {
                    doc.id = doc.uid.clone();
                }
                doc
            })
            .collect();
        Self { documents }
    }

    /// Load documents from a JSON fixtures file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let fixtures: Fixtures = serde_json::from_str(&content)?;
        let documents = match fixtures {
            Fixtures::Documents(docs) => docs,
            Fixtures::Listing { results } => results,
        };
        tracing::debug!(
            "Loaded {} fixture documents from {:?}",
            documents.len(),
            path.as_ref()
        );
        Ok(Self::new(documents))
    }

    /// All documents held by the source
    pub fn documents(&self) -> &[ContentDocument] {
        &self.documents
    }

    fn run(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PaginatedListing, SourceError> {
        let mut matched: Vec<&ContentDocument> = self
            .documents
            .iter()
            .filter(|doc| predicates.iter().all(|p| matches_predicate(p, doc)))
            .collect();

        matched.sort_by(|a, b| compare(a, b, &options.orderings));

        if let Some(after) = &options.after {
            match matched.iter().position(|doc| doc.id == *after) {
                Some(pos) => {
                    matched.drain(..=pos);
                }
                None => matched.clear(),
            }
        }

        let page_size = options.page_size.unwrap_or(DEFAULT_PAGE_SIZE).max(1);
        let page = options.page.unwrap_or(1).max(1);
        let total_results_size = matched.len();
        let total_pages = total_results_size.div_ceil(page_size);

        let results = matched
            .iter()
            .skip((page - 1).saturating_mul(page_size))
            .take(page_size)
            .map(|doc| project(doc, &options.fetch))
            .collect();

        let next_page = if page < total_pages {
            Some(encode_cursor(predicates, options, page + 1)?)
        } else {
            None
        };
        let prev_page = if page > 1 {
            Some(encode_cursor(predicates, options, page - 1)?)
        } else {
            None
        };

        Ok(PaginatedListing {
            page,
            results_per_page: page_size,
            total_results_size,
            total_pages,
            next_page,
            prev_page,
            results,
        })
    }
}

#[async_trait]
impl ContentSource for MemorySource {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PaginatedListing, SourceError> {
        self.run(predicates, options)
    }

    async fn load_next_page(&self, token: &str) -> Result<PaginatedListing, SourceError> {
        let cursor: Cursor = token
            .strip_prefix(CURSOR_PREFIX)
            .and_then(|raw| serde_json::from_str(raw).ok())
            .ok_or_else(|| SourceError::InvalidCursor {
                token: token.to_string(),
            })?;
        self.run(&cursor.predicates, &cursor.options)
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}

fn encode_cursor(
    predicates: &[Predicate],
    options: &QueryOptions,
    page: usize,
) -> Result<String, SourceError> {
    let cursor = Cursor {
        predicates: predicates.to_vec(),
        options: options.clone().page(page),
    };
    let raw = serde_json::to_string(&cursor).map_err(|e| SourceError::Decode {
        message: e.to_string(),
    })?;
    Ok(format!("{}{}", CURSOR_PREFIX, raw))
}

/// Resolve a predicate path to a document value
fn field_value(doc: &ContentDocument, path: &str) -> Option<String> {
    match path {
        "document.type" => return Some(doc.doc_type.clone()),
        "document.id" => return Some(doc.id.clone()),
        "document.uid" => return Some(doc.uid.clone()),
        _ => {}
    }

    // my.<type>.<field>
    let rest = path.strip_prefix("my.")?;
    let (doc_type, field) = rest.split_once('.')?;
    if doc_type != doc.doc_type {
        return None;
    }
    match field {
        "uid" => Some(doc.uid.clone()),
        "title" => Some(doc.data.title.clone()),
        "subtitle" => doc.data.subtitle.clone(),
        "author" => Some(doc.data.author.clone()),
        _ => None,
    }
}

fn date_value(doc: &ContentDocument, path: &str) -> Option<DateTime<Utc>> {
    match path {
        "document.first_publication_date" => doc.first_publication_date,
        "document.last_publication_date" => doc.last_publication_date,
        _ => None,
    }
}

fn matches_predicate(predicate: &Predicate, doc: &ContentDocument) -> bool {
    let value = field_value(doc, predicate.path());
    match predicate {
        Predicate::DateAfter { path, value: bound } => {
            matches!((date_value(doc, path), parse_timestamp(bound)), (Some(d), Some(b)) if d > b)
        }
        Predicate::DateBefore { path, value: bound } => {
            matches!((date_value(doc, path), parse_timestamp(bound)), (Some(d), Some(b)) if d < b)
        }
        Predicate::At { value: expected, .. } => value.as_deref() == Some(expected.as_str()),
        Predicate::Not { value: expected, .. } => value.as_deref() != Some(expected.as_str()),
        Predicate::Any { values, .. } => value.map(|v| values.contains(&v)).unwrap_or(false),
    }
}

fn compare(a: &ContentDocument, b: &ContentDocument, orderings: &[Ordering]) -> CmpOrdering {
    for ordering in orderings {
        let result = compare_field(a, b, &ordering.field);
        let result = if ordering.descending {
            result.reverse()
        } else {
            result
        };
        if result != CmpOrdering::Equal {
            return result;
        }
    }
    CmpOrdering::Equal
}

fn compare_field(a: &ContentDocument, b: &ContentDocument, field: &str) -> CmpOrdering {
    // Unpublished documents (preview) sort after published ones
    let by_date = |x: Option<_>, y: Option<_>| (x.is_none(), x).cmp(&(y.is_none(), y));
    match field {
        "document.first_publication_date" => {
            by_date(a.first_publication_date, b.first_publication_date)
        }
        "document.last_publication_date" => {
            by_date(a.last_publication_date, b.last_publication_date)
        }
        _ => field_value(a, field).cmp(&field_value(b, field)),
    }
}

/// Apply a `fetch` restriction to the data fields
fn project(doc: &ContentDocument, fetch: &[String]) -> ContentDocument {
    if fetch.is_empty() {
        return doc.clone();
    }
    let wants = |field: &str| {
        fetch
            .iter()
            .any(|f| f.rsplit('.').next().map(|name| name == field).unwrap_or(false))
    };

    let data = &doc.data;
    ContentDocument {
        data: PostFields {
            title: if wants("title") { data.title.clone() } else { String::new() },
            subtitle: if wants("subtitle") { data.subtitle.clone() } else { None },
            author: if wants("author") { data.author.clone() } else { String::new() },
            banner: if wants("banner") { data.banner.clone() } else { None },
            content: if wants("content") { data.content.clone() } else { Vec::new() },
        },
        ..doc.clone()
    }
}
