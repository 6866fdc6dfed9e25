//! Content source trait definition

use async_trait::async_trait;
use thiserror::Error;

use super::document::{ContentDocument, PaginatedListing};
use super::predicate::{Predicate, QueryOptions};

/// Errors that can occur while talking to a content source
#[derive(Debug, Error)]
pub enum SourceError {
    /// Network failure or unreachable API
    #[error("Content source unavailable: {message}")]
    Unavailable {
        /// Underlying error message
        message: String,
    },

    /// Non-success HTTP status
    #[error("Content source error: {status} - {message}")]
    Status {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// Requested document does not exist
    #[error("Document not found: {uid}")]
    NotFound {
        /// uid (or id) that was looked up
        uid: String,
    },

    /// Response body could not be decoded
    #[error("Failed to decode content source response: {message}")]
    Decode {
        /// Decoder error message
        message: String,
    },

    /// Pagination token was not produced by this source
    #[error("Invalid pagination cursor: {token}")]
    InvalidCursor {
        /// The rejected token
        token: String,
    },

    /// API root did not advertise a master ref
    #[error("No master ref advertised by {endpoint}")]
    NoMasterRef {
        /// API endpoint that was queried
        endpoint: String,
    },
}

impl SourceError {
    /// Whether this error means "the document does not exist"
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// A paginated, queryable store of documents
///
/// Implementations only have to provide `query` and `load_next_page`;
/// single-document lookups are expressed as page-size-1 queries.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Run a query and return its first requested page
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PaginatedListing, SourceError>;

    /// Follow an opaque next-page token from a previous listing
    async fn load_next_page(&self, token: &str) -> Result<PaginatedListing, SourceError>;

    /// Get the source name for logging
    fn name(&self) -> &'static str;

    /// Fetch a document of `doc_type` by its uid
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<ContentDocument, SourceError> {
        let listing = self
            .query(
                &[Predicate::document_type(doc_type), Predicate::uid(doc_type, uid)],
                &QueryOptions::default().page_size(1),
            )
            .await?;
        listing
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound {
                uid: uid.to_string(),
            })
    }

    /// Fetch a document by its id
    async fn get_by_id(&self, id: &str) -> Result<ContentDocument, SourceError> {
        let listing = self
            .query(
                &[Predicate::at("document.id", id)],
                &QueryOptions::default().page_size(1),
            )
            .await?;
        listing
            .results
            .into_iter()
            .next()
            .ok_or_else(|| SourceError::NotFound { uid: id.to_string() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EmptySource;

    #[async_trait]
    impl ContentSource for EmptySource {
        async fn query(
            &self,
            _predicates: &[Predicate],
            _options: &QueryOptions,
        ) -> Result<PaginatedListing, SourceError> {
            Ok(PaginatedListing::default())
        }

        async fn load_next_page(&self, token: &str) -> Result<PaginatedListing, SourceError> {
            Err(SourceError::InvalidCursor {
                token: token.to_string(),
            })
        }

        fn name(&self) -> &'static str {
            "empty"
        }
    }

    #[tokio::test]
    async fn test_get_by_uid_not_found() {
        let err = EmptySource.get_by_uid("posts", "missing").await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "Document not found: missing");
    }

    #[tokio::test]
    async fn test_get_by_id_not_found() {
        let err = EmptySource.get_by_id("YF1").await.unwrap_err();
        assert!(err.is_not_found());
    }
}
