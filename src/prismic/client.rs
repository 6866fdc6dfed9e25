//! Prismic REST API v2 client
//!
//! Queries go to `{endpoint}/documents/search` against a content ref: the
//! master ref advertised by the API root (resolved once per client), or a
//! fixed preview ref.

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::OnceCell;

use super::document::PaginatedListing;
use super::predicate::{render_orderings, render_query, Predicate, QueryOptions};
use super::source::{ContentSource, SourceError};
use crate::config::PrismicConfig;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for a Prismic repository
pub struct PrismicClient {
    client: Client,
    endpoint: String,
    access_token: Option<String>,
    fixed_ref: Option<String>,
    master_ref: OnceCell<String>,
}

impl PrismicClient {
    /// Create a client for the configured repository
    pub fn new(config: &PrismicConfig) -> Result<Self, SourceError> {
        if config.endpoint.is_empty() {
            return Err(SourceError::Unavailable {
                message: "prismic.endpoint is not configured".to_string(),
            });
        }

        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SourceError::Unavailable {
                message: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            access_token: Some(config.access_token.clone()).filter(|t| !t.is_empty()),
            fixed_ref: None,
            master_ref: OnceCell::new(),
        })
    }

    /// Pin all queries to a specific ref (preview mode)
    pub fn with_ref(mut self, reference: &str) -> Self {
        self.fixed_ref = Some(reference.to_string());
        self
    }

    /// Build the search endpoint URL
    pub fn search_url(&self) -> String {
        format!("{}/documents/search", self.endpoint)
    }

    /// Query parameters of a search request
    pub fn search_params(
        reference: &str,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Vec<(String, String)> {
        let mut params = vec![("ref".to_string(), reference.to_string())];

        if !predicates.is_empty() {
            params.push(("q".to_string(), render_query(predicates)));
        }
        if let Some(orderings) = render_orderings(&options.orderings) {
            params.push(("orderings".to_string(), orderings));
        }
        if let Some(page_size) = options.page_size {
            params.push(("pageSize".to_string(), page_size.to_string()));
        }
        if let Some(page) = options.page {
            params.push(("page".to_string(), page.to_string()));
        }
        if !options.fetch.is_empty() {
            params.push(("fetch".to_string(), options.fetch.join(",")));
        }
        if let Some(after) = &options.after {
            params.push(("after".to_string(), after.clone()));
        }

        params
    }

    /// Parse a `next_page` cursor, accepting only this repository's search
    /// endpoint. Any access token in the cursor is dropped.
    pub fn next_page_url(&self, token: &str) -> Result<Url, SourceError> {
        let invalid = || SourceError::InvalidCursor {
            token: token.to_string(),
        };
        let url = Url::parse(token).map_err(|_| invalid())?;
        let search = Url::parse(&self.search_url()).map_err(|_| invalid())?;

        let same_origin = url.scheme() == search.scheme()
            && url.host_str() == search.host_str()
            && url.port_or_known_default() == search.port_or_known_default();
        if !same_origin || url.path() != search.path() {
            return Err(invalid());
        }

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(key, _)| key != "access_token")
            .map(|(key, value)| (key.into_owned(), value.into_owned()))
            .collect();
        let mut cleaned = url;
        cleaned.set_query(None);
        if !pairs.is_empty() {
            cleaned.query_pairs_mut().extend_pairs(pairs);
        }
        Ok(cleaned)
    }

    fn token_params(&self) -> Vec<(String, String)> {
        self.access_token
            .iter()
            .map(|t| ("access_token".to_string(), t.clone()))
            .collect()
    }

    /// Ref used for content queries
    async fn content_ref(&self) -> Result<String, SourceError> {
        if let Some(reference) = &self.fixed_ref {
            return Ok(reference.clone());
        }
        self.master_ref
            .get_or_try_init(|| self.fetch_master_ref())
            .await
            .cloned()
    }

    async fn fetch_master_ref(&self) -> Result<String, SourceError> {
        let api: ApiRoot = self.get_json(&self.endpoint, &self.token_params()).await?;
        let master = api
            .refs
            .into_iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.reference)
            .ok_or_else(|| SourceError::NoMasterRef {
                endpoint: self.endpoint.clone(),
            })?;
        tracing::debug!("Resolved master ref {}", master);
        Ok(master)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<T, SourceError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .query(params)
            .send()
            .await
            .map_err(|e| SourceError::Unavailable {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(SourceError::Status {
                status: status.as_u16(),
                message,
            });
        }

        response.json().await.map_err(|e| SourceError::Decode {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ContentSource for PrismicClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> Result<PaginatedListing, SourceError> {
        let reference = self.content_ref().await?;
        let mut params = Self::search_params(&reference, predicates, options);
        params.extend(self.token_params());

        tracing::debug!("Querying {} with {:?}", self.search_url(), params);
        self.get_json(&self.search_url(), &params).await
    }

    async fn load_next_page(&self, token: &str) -> Result<PaginatedListing, SourceError> {
        let url = self.next_page_url(token)?;

        // next_page URLs carry ref and query but not the access token
        tracing::debug!("Following next page {}", url);
        self.get_json(url.as_str(), &self.token_params()).await
    }

    fn name(&self) -> &'static str {
        "prismic"
    }
}

/// API root response (only the refs are used)
#[derive(Debug, Deserialize)]
struct ApiRoot {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(default, rename = "isMasterRef")]
    is_master_ref: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prismic::predicate::{Ordering, FIRST_PUBLICATION_DATE};

    fn config() -> PrismicConfig {
        PrismicConfig {
            endpoint: "https://blog.cdn.prismic.io/api/v2/".to_string(),
            access_token: "token".to_string(),
            ..PrismicConfig::default()
        }
    }

    #[test]
    fn test_requires_endpoint() {
        assert!(PrismicClient::new(&PrismicConfig::default()).is_err());
    }

    #[test]
    fn test_search_url() {
        let client = PrismicClient::new(&config()).unwrap();
        assert_eq!(
            client.search_url(),
            "https://blog.cdn.prismic.io/api/v2/documents/search"
        );
    }

    #[test]
    fn test_search_params() {
        let options = QueryOptions::default()
            .fetch(&["posts.title", "posts.author"])
            .order_by(Ordering::desc(FIRST_PUBLICATION_DATE))
            .page_size(1)
            .after("YF1");
        let params =
            PrismicClient::search_params("master", &[Predicate::document_type("posts")], &options);

        let get = |key: &str| {
            params
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };
        assert_eq!(get("ref"), Some("master"));
        assert_eq!(get("q"), Some(r#"[[at(document.type,"posts")]]"#));
        assert_eq!(
            get("orderings"),
            Some("[document.first_publication_date desc]")
        );
        assert_eq!(get("pageSize"), Some("1"));
        assert_eq!(get("page"), None);
        assert_eq!(get("fetch"), Some("posts.title,posts.author"));
        assert_eq!(get("after"), Some("YF1"));
    }

    #[tokio::test]
    async fn test_rejects_foreign_cursor() {
        let client = PrismicClient::new(&config()).unwrap();
        let err = client.load_next_page("memory:{}").await.unwrap_err();
        assert!(matches!(err, SourceError::InvalidCursor { .. }));
    }

    #[test]
    fn test_next_page_url_must_match_endpoint() {
        let client = PrismicClient::new(&config()).unwrap();

        let url = client
            .next_page_url("https://blog.cdn.prismic.io:443/api/v2/documents/search?ref=M1&page=2&access_token=old")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://blog.cdn.prismic.io/api/v2/documents/search?ref=M1&page=2"
        );

        for token in [
            "https://evil.example/api/v2/documents/search?page=2",
            "http://blog.cdn.prismic.io/api/v2/documents/search?page=2",
            "https://blog.cdn.prismic.io:8443/api/v2/documents/search?page=2",
            "https://blog.cdn.prismic.io/api/v2/documents?page=2",
            "https://blog.cdn.prismic.io.evil.example/api/v2/documents/search",
        ] {
            let err = client.next_page_url(token).unwrap_err();
            assert!(matches!(err, SourceError::InvalidCursor { .. }), "{}", token);
        }
    }

    #[test]
    fn test_decode_api_root() {
        let api: ApiRoot = serde_json::from_str(
            r#"{ "refs": [
                { "id": "release", "ref": "R1", "label": "Release" },
                { "id": "master", "ref": "M1", "label": "Master", "isMasterRef": true }
            ] }"#,
        )
        .unwrap();
        let master = api.refs.iter().find(|r| r.is_master_ref).unwrap();
        assert_eq!(master.reference, "M1");
    }
}
