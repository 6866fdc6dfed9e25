//! Previous/next post resolution

use serde::Serialize;
use std::cmp::Ordering as CmpOrdering;

use crate::prismic::{
    ContentDocument, ContentSource, Ordering, PaginatedListing, Predicate, QueryOptions,
    SourceError, FIRST_PUBLICATION_DATE,
};

/// Link to an adjacent post
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NeighborLink {
    pub title: String,
    pub uid: String,
}

/// Adjacent posts in publication order
///
/// `previous` was published before the current post, `next` after it.
/// Either side may be absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NeighborPair {
    pub previous: Option<NeighborLink>,
    pub next: Option<NeighborLink>,
}

impl NeighborPair {
    pub fn is_empty(&self) -> bool {
        self.previous.is_none() && self.next.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Previous,
    Next,
}

impl Side {
    fn ordering(self) -> Ordering {
        match self {
            Side::Previous => Ordering::desc(FIRST_PUBLICATION_DATE),
            Side::Next => Ordering::asc(FIRST_PUBLICATION_DATE),
        }
    }

    /// Expected position of a neighbor's date relative to the current one
    fn expected(self) -> CmpOrdering {
        match self {
            Side::Previous => CmpOrdering::Less,
            Side::Next => CmpOrdering::Greater,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Side::Previous => "previous",
            Side::Next => "next",
        }
    }
}

/// Query for the closest post on one side of `current`
///
/// Published posts are bounded by date so ties with the current post are
/// skipped. Unpublished (preview) posts have no date and fall back to the
/// `after` cursor.
fn neighbor_query(
    doc_type: &str,
    current: &ContentDocument,
    side: Side,
) -> (Vec<Predicate>, QueryOptions) {
    let title_field = format!("{}.title", doc_type);
    let mut predicates = vec![Predicate::document_type(doc_type)];
    let mut options = QueryOptions::default()
        .fetch(&[title_field.as_str()])
        .order_by(side.ordering())
        .page_size(1);

    match current.first_publication_date {
        Some(date) => predicates.push(match side {
            Side::Previous => Predicate::date_before(FIRST_PUBLICATION_DATE, &date),
            Side::Next => Predicate::date_after(FIRST_PUBLICATION_DATE, &date),
        }),
        None => options = options.after(&current.id),
    }

    (predicates, options)
}

/// Resolve the posts published right before and right after `current`
///
/// Both lookups are issued concurrently. A failed lookup only empties its
/// own side; it is logged and never fails the caller.
pub async fn resolve_neighbors(
    source: &dyn ContentSource,
    doc_type: &str,
    current: &ContentDocument,
) -> NeighborPair {
    let (previous_predicates, previous_options) = neighbor_query(doc_type, current, Side::Previous);
    let (next_predicates, next_options) = neighbor_query(doc_type, current, Side::Next);

    let (previous, next) = tokio::join!(
        source.query(&previous_predicates, &previous_options),
        source.query(&next_predicates, &next_options),
    );

    NeighborPair {
        previous: pick_neighbor(previous, current, Side::Previous),
        next: pick_neighbor(next, current, Side::Next),
    }
}

fn pick_neighbor(
    result: Result<PaginatedListing, SourceError>,
    current: &ContentDocument,
    side: Side,
) -> Option<NeighborLink> {
    let listing = match result {
        Ok(listing) => listing,
        Err(e) => {
            tracing::warn!(
                "Failed to resolve {} post of {}: {}",
                side.name(),
                current.uid,
                e
            );
            return None;
        }
    };

    listing
        .results
        .into_iter()
        .find(|doc| doc.uid != current.uid && doc.id != current.id)
        .filter(|doc| strictly_ordered(doc, current, side))
        .map(|doc| NeighborLink {
            title: doc.data.title,
            uid: doc.uid,
        })
}

/// Posts sharing the current publication date are never neighbors
fn strictly_ordered(candidate: &ContentDocument, current: &ContentDocument, side: Side) -> bool {
    match (candidate.first_publication_date, current.first_publication_date) {
        (Some(candidate), Some(current)) => candidate.cmp(&current) == side.expected(),
        _ => true,
    }
}

/// Lifecycle of the neighbor links of one post view
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NeighborState {
    /// Nothing requested yet
    Initial,
    /// Lookups in flight
    Loading,
    /// At least one side resolved
    Resolved(NeighborPair),
    /// Neither side exists or both lookups failed
    Absent,
}

/// Tracks the neighbors of the post currently shown
///
/// Neighbors are fetched again only when the displayed post changes.
#[derive(Debug, Clone)]
pub struct NeighborTracker {
    doc_type: String,
    current_uid: Option<String>,
    state: NeighborState,
}

impl NeighborTracker {
    pub fn new(doc_type: &str) -> Self {
        Self {
            doc_type: doc_type.to_string(),
            current_uid: None,
            state: NeighborState::Initial,
        }
    }

    pub fn state(&self) -> &NeighborState {
        &self.state
    }

    pub fn current_uid(&self) -> Option<&str> {
        self.current_uid.as_deref()
    }

    /// The resolved pair, empty unless in the `Resolved` state
    pub fn pair(&self) -> NeighborPair {
        match &self.state {
            NeighborState::Resolved(pair) => pair.clone(),
            _ => NeighborPair::default(),
        }
    }

    fn is_settled_for(&self, uid: &str) -> bool {
        self.current_uid.as_deref() == Some(uid)
            && matches!(
                self.state,
                NeighborState::Resolved(_) | NeighborState::Absent
            )
    }

    /// Show `doc`, resolving its neighbors if it is not the current post
    pub async fn navigate(
        &mut self,
        source: &dyn ContentSource,
        doc: &ContentDocument,
    ) -> NeighborPair {
        if self.is_settled_for(&doc.uid) {
            return self.pair();
        }

        self.current_uid = Some(doc.uid.clone());
        self.state = NeighborState::Loading;
        tracing::debug!("Resolving neighbors of {}", doc.uid);

        let pair = resolve_neighbors(source, &self.doc_type, doc).await;
        self.state = if pair.is_empty() {
            NeighborState::Absent
        } else {
            NeighborState::Resolved(pair.clone())
        };
        pair
    }
}
