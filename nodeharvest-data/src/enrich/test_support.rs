//! In-memory doubles for [`Geocoder`].

use std::cell::Cell;
use std::collections::BTreeMap;
use std::rc::Rc;

use async_trait::async_trait;

use super::{GeocodeCandidate, GeocodeError, Geocoder};
use crate::http::TransportError;

#[derive(Debug, Clone)]
enum Answer {
    Always(GeocodeCandidate),
    ByAddress(BTreeMap<String, GeocodeCandidate>),
    Nothing,
    Failure,
}

/// Geocoder returning canned answers and counting calls.
#[derive(Debug, Clone)]
pub struct StubGeocoder {
    name: String,
    answer: Answer,
    calls: Rc<Cell<usize>>,
}

impl StubGeocoder {
    fn new(name: &str, answer: Answer) -> Self {
        Self {
            name: name.to_owned(),
            answer,
            calls: Rc::new(Cell::new(0)),
        }
    }

    /// Answer every address with `candidate`.
    #[must_use]
    pub fn answering(name: &str, candidate: GeocodeCandidate) -> Self {
        Self::new(name, Answer::Always(candidate))
    }

    /// Answer only the listed normalised addresses.
    #[must_use]
    pub fn by_address(name: &str, answers: BTreeMap<String, GeocodeCandidate>) -> Self {
        Self::new(name, Answer::ByAddress(answers))
    }

    /// Never find a candidate.
    #[must_use]
    pub fn empty(name: &str) -> Self {
        Self::new(name, Answer::Nothing)
    }

    /// Fail every request with a network error.
    #[must_use]
    pub fn failing(name: &str) -> Self {
        Self::new(name, Answer::Failure)
    }

    /// Shared call counter, still readable after the stub is boxed.
    #[must_use]
    pub fn calls(&self) -> Rc<Cell<usize>> {
        Rc::clone(&self.calls)
    }
}

#[async_trait(?Send)]
impl Geocoder for StubGeocoder {
    fn name(&self) -> &str {
        &self.name
    }

    async fn geocode(&self, address: &str) -> Result<Option<GeocodeCandidate>, GeocodeError> {
        self.calls.set(self.calls.get() + 1);
        match &self.answer {
            Answer::Always(candidate) => Ok(Some(candidate.clone())),
            Answer::ByAddress(answers) => Ok(answers.get(address).cloned()),
            Answer::Nothing => Ok(None),
            Answer::Failure => Err(GeocodeError::Transport(TransportError::Network {
                url: format!("https://{}.example.test", self.name),
                message: "connection refused".to_owned(),
            })),
        }
    }
}

/// A candidate inside the default bounding box.
#[must_use]
pub fn bogota_candidate(score: f64) -> GeocodeCandidate {
    GeocodeCandidate {
        longitude: -74.08,
        latitude: 4.65,
        score,
        address: "Bogotá, Colombia".to_owned(),
    }
}
