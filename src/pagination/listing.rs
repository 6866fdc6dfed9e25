//! Listing accumulation over a cursor-paginated source

use std::collections::HashSet;

use crate::content::PostSummary;
use crate::prismic::{
    ContentSource, Ordering, PaginatedListing, Predicate, QueryOptions, SourceError,
    FIRST_PUBLICATION_DATE,
};

/// Posts accumulated page by page, newest first
///
/// Pages are appended in arrival order without de-duplication or
/// reordering. A cursor is followed at most once, so walking the listing
/// always terminates.
#[derive(Debug, Clone, Default)]
pub struct PostListing {
    items: Vec<PostSummary>,
    next_page: Option<String>,
    followed: HashSet<String>,
    pages_loaded: usize,
}

impl PostListing {
    /// Predicates and options of the home listing query
    pub fn query(doc_type: &str, page_size: usize) -> (Vec<Predicate>, QueryOptions) {
        let fields: Vec<String> = ["title", "subtitle", "author"]
            .iter()
            .map(|f| format!("{}.{}", doc_type, f))
            .collect();
        let fields: Vec<&str> = fields.iter().map(String::as_str).collect();

        let options = QueryOptions::default()
            .fetch(&fields)
            .order_by(Ordering::desc(FIRST_PUBLICATION_DATE))
            .page_size(page_size.max(1));

        (vec![Predicate::document_type(doc_type)], options)
    }

    /// Fetch the first page of the listing
    pub async fn first_page(
        source: &dyn ContentSource,
        doc_type: &str,
        page_size: usize,
    ) -> Result<Self, SourceError> {
        let (predicates, options) = Self::query(doc_type, page_size);
        let listing = source.query(&predicates, &options).await?;
        Ok(Self::from_listing(listing))
    }

    /// Start an accumulator from an already fetched page
    pub fn from_listing(listing: PaginatedListing) -> Self {
        let mut accumulated = Self::default();
        accumulated.append(listing);
        accumulated
    }

    /// Accumulated posts in arrival order
    pub fn items(&self) -> &[PostSummary] {
        &self.items
    }

    /// Cursor of the next page, if any
    pub fn next_page(&self) -> Option<&str> {
        self.next_page.as_deref()
    }

    /// Whether a "load more" action can fetch anything
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }

    /// Number of pages accumulated so far
    pub fn pages_loaded(&self) -> usize {
        self.pages_loaded
    }

    /// Append a page and take over its cursor, returning the new items
    pub fn append(&mut self, listing: PaginatedListing) -> &[PostSummary] {
        let start = self.items.len();
        self.items
            .extend(listing.results.iter().map(PostSummary::from_document));

        self.next_page = match listing.next_page_token() {
            Some(token) if self.followed.contains(token) => {
                tracing::warn!("Listing cursor repeats an already loaded page, stopping");
                None
            }
            Some(token) => Some(token.to_string()),
            None => None,
        };
        self.pages_loaded += 1;

        &self.items[start..]
    }

    /// Fetch the next page and append it
    ///
    /// At the end of the listing this is a no-op returning no items. On
    /// failure the accumulated state is left untouched.
    pub async fn load_next_page(
        &mut self,
        source: &dyn ContentSource,
    ) -> Result<&[PostSummary], SourceError> {
        let token = match self.next_page.clone() {
            Some(token) => token,
            None => return Ok(&[]),
        };

        let listing = source.load_next_page(&token).await?;
        self.followed.insert(token);
        Ok(self.append(listing))
    }

    /// Follow cursors until the listing is exhausted
    pub async fn load_all(&mut self, source: &dyn ContentSource) -> Result<(), SourceError> {
        while self.has_more() {
            let added = self.load_next_page(source).await?.len();
            tracing::debug!(
                "Loaded listing page {} ({} posts)",
                self.pages_loaded,
                added
            );
        }
        Ok(())
    }
}
