//! Per-source harvest summaries.

use std::collections::BTreeMap;
use std::fmt;

use nodeharvest_core::{MergeOutcome, Origin, RejectionReason};

use crate::fetch::Termination;

/// What happened to one source during a harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceReport {
    /// Source name.
    pub source: String,
    /// Provenance tag of the source.
    pub origin: Origin,
    /// Endpoint whose results were kept.
    pub endpoint: Option<String>,
    /// Page requests issued across every endpoint tried.
    pub requests: usize,
    /// Why the kept fetch stopped.
    pub termination: Option<Termination>,
    /// Raw elements received.
    pub fetched: usize,
    /// Elements turned into records.
    pub accepted: usize,
    /// Rejected elements by reason.
    pub rejected: BTreeMap<RejectionReason, usize>,
    /// Result of merging the accepted records.
    pub merge: MergeOutcome,
    /// Set when the source exposes no usable coordinates.
    pub unusable: Option<String>,
    /// Error that ended the fetch, if any.
    pub error: Option<String>,
}

impl SourceReport {
    /// Empty report for a source.
    #[must_use]
    pub fn new(source: impl Into<String>, origin: Origin) -> Self {
        Self {
            source: source.into(),
            origin,
            endpoint: None,
            requests: 0,
            termination: None,
            fetched: 0,
            accepted: 0,
            rejected: BTreeMap::new(),
            merge: MergeOutcome::default(),
            unusable: None,
            error: None,
        }
    }

    /// Total rejected elements.
    #[must_use]
    pub fn rejected_total(&self) -> usize {
        self.rejected.values().sum()
    }

    /// Whether the source contributed a usable, at least partial, result.
    #[must_use]
    pub const fn succeeded(&self) -> bool {
        self.unusable.is_none() && (self.error.is_none() || self.fetched > 0)
    }
}

impl fmt::Display for SourceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}]: {} fetched in {} requests, {} accepted, {} rejected, {} new, {} duplicates",
            self.source,
            self.origin,
            self.fetched,
            self.requests,
            self.accepted,
            self.rejected_total(),
            self.merge.inserted,
            self.merge.duplicates
        )?;
        for (reason, count) in &self.rejected {
            write!(f, "; {reason}: {count}")?;
        }
        if let Some(termination) = self.termination {
            write!(f, "; stopped on {termination}")?;
        }
        if let Some(unusable) = &self.unusable {
            write!(f, "; unusable: {unusable}")?;
        }
        if let Some(error) = &self.error {
            write!(f, "; error: {error}")?;
        }
        Ok(())
    }
}
