//! Prismic content source
//!
//! - [`ContentSource`]: async trait every source implements
//! - [`PrismicClient`]: reqwest-based REST API v2 client
//! - [`MemorySource`]: in-process source over fixture documents

pub mod client;
pub mod document;
pub mod memory;
pub mod predicate;
pub mod source;

pub use client::PrismicClient;
pub use document::{
    Banner, ContentBlock, ContentDocument, Embed, NodeKind, PaginatedListing, PostFields,
    RichTextNode, Span, SpanKind,
};
pub use memory::MemorySource;
pub use predicate::{Ordering, Predicate, QueryOptions, FIRST_PUBLICATION_DATE};
pub use source::{ContentSource, SourceError};
