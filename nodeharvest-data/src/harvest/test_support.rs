//! In-memory doubles for [`SourceConnector`].

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};

use nodeharvest_core::{HarvestSourceConfig, RawRecord};

use super::SourceConnector;
use crate::fetch::test_support::StubFeatureSource;
use crate::fetch::{FeatureSource, FetchError, Page};

/// How a stubbed endpoint behaves.
#[derive(Debug, Clone)]
pub enum StubEndpoint {
    /// Serve these records with standard paging.
    Records(Vec<RawRecord>),
    /// Serve these records while answering count queries with `count`.
    Counted {
        /// Backing records.
        records: Vec<RawRecord>,
        /// Answer to the count query, possibly stale.
        count: usize,
    },
    /// Serve these pages in order.
    Pages(Vec<Page>),
    /// Fail the first page request with a timeout.
    Failing,
    /// Serve `records` but time out when asked for `offset`.
    FailingAt {
        /// Backing records.
        records: Vec<RawRecord>,
        /// Offset whose request fails.
        offset: usize,
    },
    /// Refuse the connection.
    Unreachable,
}

/// Connector mapping endpoint URLs to scripted behaviour.
#[derive(Debug, Default)]
pub struct StubConnector {
    endpoints: BTreeMap<String, StubEndpoint>,
    connections: RefCell<VecDeque<String>>,
}

impl StubConnector {
    /// Empty connector; unknown endpoints are unreachable.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `behaviour` for `endpoint`.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: &str, behaviour: StubEndpoint) -> Self {
        self.endpoints.insert(endpoint.to_owned(), behaviour);
        self
    }

    /// Endpoints connected to so far, in order.
    #[must_use]
    pub fn connections(&self) -> Vec<String> {
        self.connections.borrow().iter().cloned().collect()
    }
}

impl SourceConnector for StubConnector {
    fn connect(
        &self,
        _source: &HarvestSourceConfig,
        endpoint: &str,
    ) -> Result<Box<dyn FeatureSource>, FetchError> {
        self.connections.borrow_mut().push_back(endpoint.to_owned());
        let behaviour = self
            .endpoints
            .get(endpoint)
            .cloned()
            .unwrap_or(StubEndpoint::Unreachable);
        let stub = match behaviour {
            StubEndpoint::Records(records) => StubFeatureSource::backed_by(records),
            StubEndpoint::Counted { records, count } => {
                StubFeatureSource::backed_by(records).with_count(count)
            }
            StubEndpoint::Pages(pages) => {
                StubFeatureSource::scripted(pages.into_iter().map(Ok).collect())
            }
            StubEndpoint::Failing => StubFeatureSource::backed_by(Vec::new()).failing_at_offset(0),
            StubEndpoint::FailingAt { records, offset } => {
                StubFeatureSource::backed_by(records).failing_at_offset(offset)
            }
            StubEndpoint::Unreachable => {
                return Err(FetchError::InvalidEndpoint {
                    endpoint: endpoint.to_owned(),
                    source: url::ParseError::EmptyHost,
                });
            }
        };
        Ok(Box::new(stub.with_endpoint(endpoint)))
    }
}
