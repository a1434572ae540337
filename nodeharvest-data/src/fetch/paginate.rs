//! The offset-based pagination loop.
//!
//! After each page the loop continues when the server flagged that the
//! transfer limit was exceeded, or when the page came back exactly full.
//! A full page is ambiguous: the result set may end exactly on the page
//! boundary, so one more page is requested to confirm. The loop stops on an
//! empty page, on a short page without the flag, or when the page cap is
//! hit. A known total only saves the confirmation request after an
//! unflagged full page ending exactly on it; it never overrides the flag,
//! and a total the pages have already overtaken is ignored as stale. Pages are counted by
//! the elements the server sent, so undecodable entries neither end the
//! loop early nor shift the next offset.
//!
//! A failing request ends the loop but keeps every page already received.

use std::fmt;
use std::time::Duration;

use log::{info, warn};
use nodeharvest_core::RawRecord;

use super::{FeatureSource, FetchError};

/// Tuning for [`fetch_all`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationOptions {
    /// Requested page size; zero is treated as one.
    pub page_size: usize,
    /// Pause between consecutive page requests.
    pub delay: Duration,
    /// Upper bound on page requests.
    pub max_pages: Option<usize>,
}

impl PaginationOptions {
    /// Options for `page_size` with no delay and no cap.
    #[must_use]
    pub const fn new(page_size: usize) -> Self {
        Self {
            page_size,
            delay: Duration::ZERO,
            max_pages: None,
        }
    }

    /// Set the pause between pages.
    #[must_use]
    pub const fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Cap the number of page requests.
    #[must_use]
    pub const fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    fn effective_page_size(&self) -> usize {
        self.page_size.max(1)
    }
}

/// Why the pagination loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// A page came back empty.
    Exhausted,
    /// A page came back short without the continuation flag.
    ShortPage,
    /// The page cap was reached.
    PageLimit,
    /// A request failed.
    Failed,
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Exhausted => "empty page",
            Self::ShortPage => "short page",
            Self::PageLimit => "page limit",
            Self::Failed => "request failed",
        })
    }
}

/// Everything a pagination run produced.
#[derive(Debug)]
pub struct FetchOutcome {
    /// Elements of every successful page, in order.
    pub records: Vec<RawRecord>,
    /// Page requests issued, including a failed one.
    pub requests: usize,
    /// Stop reason.
    pub termination: Termination,
    /// Error that ended the loop, if any.
    pub error: Option<FetchError>,
}

impl FetchOutcome {
    /// Whether the loop ended on an error.
    #[must_use]
    pub const fn failed(&self) -> bool {
        self.error.is_some()
    }
}

/// Fetch every page of `source`.
///
/// `known_total` is only reported against; a total of zero is treated as
/// unknown. The delay is observed between pages, never before the first.
pub async fn fetch_all<S>(
    source: &S,
    options: &PaginationOptions,
    known_total: Option<usize>,
) -> FetchOutcome
where
    S: FeatureSource + ?Sized,
{
    let page_size = options.effective_page_size();
    let known_total = known_total.filter(|total| *total > 0);
    let mut records = Vec::new();
    let mut requests = 0_usize;
    let mut offset = 0_usize;

    let (termination, error) = loop {
        if options.max_pages.is_some_and(|max| requests >= max) {
            break (Termination::PageLimit, None);
        }
        if requests > 0 && !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
        requests += 1;

        let page = match source.fetch_page(offset, page_size).await {
            Ok(page) => page,
            Err(err) => {
                warn!(
                    "fetch from {} aborted on page {requests}: {err}; keeping {} records",
                    source.endpoint(),
                    records.len()
                );
                break (Termination::Failed, Some(err));
            }
        };

        let received = page.elements;
        let flagged = page.exceeded_transfer_limit;
        records.extend(page.records);
        match known_total {
            Some(total) => info!(
                "page {requests} from {}: {received} records ({} of {total})",
                source.endpoint(),
                records.len()
            ),
            None => info!(
                "page {requests} from {}: {received} records ({} so far)",
                source.endpoint(),
                records.len()
            ),
        }

        if received == 0 {
            break (Termination::Exhausted, None);
        }
        if !flagged && received < page_size {
            break (Termination::ShortPage, None);
        }
        offset += received;
    };

    if matches!(termination, Termination::Exhausted | Termination::ShortPage)
        && let Some(total) = known_total.filter(|total| *total != records.len())
    {
        warn!(
            "{} reported {total} records but paging returned {}",
            source.endpoint(),
            records.len()
        );
    }

    FetchOutcome {
        records,
        requests,
        termination,
        error,
    }
}
