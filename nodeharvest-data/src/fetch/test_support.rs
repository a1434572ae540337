//! In-memory doubles for [`FeatureSource`].

use std::cell::RefCell;
use std::collections::VecDeque;
use std::future::Future;

use async_trait::async_trait;
use nodeharvest_core::RawRecord;
use serde_json::{Map, Value, json};

use super::{FeatureSource, FetchError, Page};
use crate::http::TransportError;

const STUB_ENDPOINT: &str = "https://stub.example.test/query";

#[derive(Debug)]
enum Backing {
    Scripted(RefCell<VecDeque<Result<Page, FetchError>>>),
    Records {
        records: Vec<RawRecord>,
        server_cap: Option<usize>,
        exceeded_flag: bool,
        failing_offset: Option<usize>,
    },
}

/// Feature source that serves scripted pages or slices of a record list.
#[derive(Debug)]
pub struct StubFeatureSource {
    endpoint: String,
    backing: Backing,
    count: Option<usize>,
    requests: RefCell<Vec<(usize, usize)>>,
}

impl StubFeatureSource {
    /// Serve `pages` in order, then empty pages.
    #[must_use]
    pub fn scripted(pages: Vec<Result<Page, FetchError>>) -> Self {
        Self::with_backing(Backing::Scripted(RefCell::new(pages.into())))
    }

    /// Serve slices of `records` honouring offset and page size.
    #[must_use]
    pub fn backed_by(records: Vec<RawRecord>) -> Self {
        Self::with_backing(Backing::Records {
            records,
            server_cap: None,
            exceeded_flag: false,
            failing_offset: None,
        })
    }

    fn with_backing(backing: Backing) -> Self {
        Self {
            endpoint: STUB_ENDPOINT.to_owned(),
            backing,
            count: None,
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Report a different endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Answer count queries with `count`.
    #[must_use]
    pub const fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    /// Never return more than `cap` records per page.
    #[must_use]
    pub fn with_server_cap(mut self, cap: usize) -> Self {
        if let Backing::Records { server_cap, .. } = &mut self.backing {
            *server_cap = Some(cap);
        }
        self
    }

    /// Flag every page after which records remain.
    #[must_use]
    pub fn with_exceeded_flag(mut self) -> Self {
        if let Backing::Records { exceeded_flag, .. } = &mut self.backing {
            *exceeded_flag = true;
        }
        self
    }

    /// Fail with a timeout when asked for `offset`.
    #[must_use]
    pub fn failing_at_offset(mut self, offset: usize) -> Self {
        if let Backing::Records { failing_offset, .. } = &mut self.backing {
            *failing_offset = Some(offset);
        }
        self
    }

    /// Offsets requested so far.
    #[must_use]
    pub fn requested_offsets(&self) -> Vec<usize> {
        self.requests.borrow().iter().map(|(offset, _)| *offset).collect()
    }

    /// Number of page requests served.
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.requests.borrow().len()
    }
}

#[async_trait(?Send)]
impl FeatureSource for StubFeatureSource {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn fetch_page(&self, offset: usize, page_size: usize) -> Result<Page, FetchError> {
        self.requests.borrow_mut().push((offset, page_size));
        match &self.backing {
            Backing::Scripted(pages) => pages
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| Ok(Page::default())),
            Backing::Records {
                records,
                server_cap,
                exceeded_flag,
                failing_offset,
            } => {
                if *failing_offset == Some(offset) {
                    return Err(timeout_error());
                }
                let size = server_cap.map_or(page_size, |cap| cap.min(page_size));
                let start = offset.min(records.len());
                let end = start.saturating_add(size).min(records.len());
                let slice = records.get(start..end).unwrap_or_default().to_vec();
                Ok(Page::new(slice).with_exceeded_limit(*exceeded_flag && end < records.len()))
            }
        }
    }

    async fn fetch_count(&self) -> Result<usize, FetchError> {
        self.count.ok_or_else(|| FetchError::UnexpectedShape {
            url: self.endpoint.clone(),
        })
    }
}

/// Records whose attributes carry a sequence number `n`.
#[must_use]
pub fn numbered_records(count: usize) -> Vec<RawRecord> {
    (0..count)
        .map(|n| {
            let mut attributes = Map::new();
            attributes.insert("n".to_owned(), json!(n));
            RawRecord::from_attributes(attributes)
        })
        .collect()
}

/// Esri-style point elements inside the default bounding box.
#[must_use]
pub fn esri_points(count: usize, first_id: usize) -> Vec<RawRecord> {
    (first_id..first_id + count)
        .map(|id| {
            let mut attributes = Map::new();
            attributes.insert("OBJECTID".to_owned(), json!(id));
            attributes.insert("NOMBRE".to_owned(), Value::String(format!("Nodo {id}")));
            RawRecord {
                attributes,
                geometry: Some(json!({ "x": -74.08, "y": 4.65 })),
            }
        })
        .collect()
}

/// A transport timeout against the stub endpoint.
#[must_use]
pub fn timeout_error() -> FetchError {
    FetchError::Transport(TransportError::Timeout {
        url: STUB_ENDPOINT.to_owned(),
        timeout_secs: 30,
    })
}

/// Drive `future` to completion on a fresh current-thread runtime.
///
/// # Panics
///
/// Panics when the runtime cannot be built.
pub fn block_on_for_tests<F: Future>(future: F) -> F::Output {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap_or_else(|err| panic!("failed to build test runtime: {err}"));
    runtime.block_on(future)
}
