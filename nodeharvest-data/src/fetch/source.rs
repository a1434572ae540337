//! Remote feature sources answering offset/limit queries.

use async_trait::async_trait;
use nodeharvest_core::SourceKind;
use reqwest::Client;
use url::Url;

use super::page::{Page, parse_count, parse_page};
use super::FetchError;
use crate::http::get_text;

/// A queryable endpoint that serves results one page at a time.
#[async_trait(?Send)]
pub trait FeatureSource {
    /// Endpoint this source queries, for logs and reports.
    fn endpoint(&self) -> &str;

    /// Fetch up to `page_size` elements starting at `offset`.
    async fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Page, FetchError>;

    /// Ask the endpoint for the total number of elements.
    async fn fetch_count(&self) -> Result<usize, FetchError>;
}

/// HTTP implementation of [`FeatureSource`] for ArcGIS and Socrata services.
#[derive(Debug, Clone)]
pub struct HttpFeatureSource {
    client: Client,
    kind: SourceKind,
    endpoint: String,
    query_url: Url,
    timeout_secs: u64,
}

impl HttpFeatureSource {
    /// Build a source for `endpoint` speaking the `kind` dialect.
    ///
    /// ArcGIS layer URLs gain a trailing `/query` segment unless they
    /// already end with one.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::InvalidEndpoint`] when `endpoint` is not an
    /// absolute URL.
    pub fn new(
        client: Client,
        kind: SourceKind,
        endpoint: &str,
        timeout_secs: u64,
    ) -> Result<Self, FetchError> {
        let trimmed = endpoint.trim().trim_end_matches('/');
        let target = match kind {
            SourceKind::Arcgis if !trimmed.ends_with("/query") => format!("{trimmed}/query"),
            _ => trimmed.to_owned(),
        };
        let query_url = Url::parse(&target).map_err(|source| FetchError::InvalidEndpoint {
            endpoint: endpoint.to_owned(),
            source,
        })?;
        Ok(Self {
            client,
            kind,
            endpoint: endpoint.to_owned(),
            query_url,
            timeout_secs,
        })
    }

    /// URL receiving the page and count queries.
    #[must_use]
    pub fn query_url(&self) -> &str {
        self.query_url.as_str()
    }

    fn page_query(&self, offset: usize, page_size: usize) -> Vec<(&'static str, String)> {
        match self.kind {
            SourceKind::Arcgis => vec![
                ("where", "1=1".to_owned()),
                ("outFields", "*".to_owned()),
                ("f", "json".to_owned()),
                ("outSR", "4326".to_owned()),
                ("returnGeometry", "true".to_owned()),
                ("resultOffset", offset.to_string()),
                ("resultRecordCount", page_size.to_string()),
            ],
            SourceKind::Socrata => vec![
                ("$limit", page_size.to_string()),
                ("$offset", offset.to_string()),
                ("$order", ":id".to_owned()),
            ],
        }
    }

    fn count_query(&self) -> Vec<(&'static str, String)> {
        match self.kind {
            SourceKind::Arcgis => vec![
                ("where", "1=1".to_owned()),
                ("returnCountOnly", "true".to_owned()),
                ("f", "json".to_owned()),
            ],
            SourceKind::Socrata => vec![("$select", "count(*)".to_owned())],
        }
    }
}

#[async_trait(?Send)]
impl FeatureSource for HttpFeatureSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Page, FetchError> {
        let url = self.query_url.as_str();
        let body = get_text(
            &self.client,
            url,
            &self.page_query(offset, page_size),
            self.timeout_secs,
        )
        .await?;
        parse_page(url, &body)
    }

    async fn fetch_count(&self) -> Result<usize, FetchError> {
        let url = self.query_url.as_str();
        let body = get_text(&self.client, url, &self.count_query(), self.timeout_secs).await?;
        parse_count(url, &body)
    }
}
