//! Decoding of page and count responses.

use nodeharvest_core::RawRecord;
use serde_json::{Map, Value};

use super::FetchError;

/// One decoded page of results.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    /// Elements in server order.
    pub records: Vec<RawRecord>,
    /// Elements the server sent, including ones that did not decode.
    pub elements: usize,
    /// Whether the server flagged that more data remains.
    pub exceeded_transfer_limit: bool,
}

impl Page {
    /// Build a page without the continuation flag.
    #[must_use]
    pub fn new(records: Vec<RawRecord>) -> Self {
        Self {
            elements: records.len(),
            records,
            exceeded_transfer_limit: false,
        }
    }

    /// Record that the server sent `elements` entries, some of them
    /// possibly skipped during decoding.
    #[must_use]
    pub fn with_elements(mut self, elements: usize) -> Self {
        self.elements = elements.max(self.records.len());
        self
    }

    /// Set the continuation flag.
    #[must_use]
    pub const fn with_exceeded_limit(mut self, exceeded: bool) -> Self {
        self.exceeded_transfer_limit = exceeded;
        self
    }
}

/// Decode a page body fetched from `url`.
///
/// The body may be a JSON array of elements or an object with a `features`
/// array. An `error` member turns into [`FetchError::Service`].
pub(crate) fn parse_page(url: &str, body: &str) -> Result<Page, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|source| FetchError::Malformed {
        url: url.to_owned(),
        source,
    })?;
    match value {
        Value::Array(elements) => Ok(decode_elements(elements)),
        Value::Object(mut object) => {
            if let Some(error) = object.get("error") {
                return Err(service_error(url, error));
            }
            let exceeded = exceeded_flag(&object);
            let Some(Value::Array(features)) = object.remove("features") else {
                return Err(FetchError::UnexpectedShape {
                    url: url.to_owned(),
                });
            };
            Ok(decode_elements(features).with_exceeded_limit(exceeded))
        }
        _ => Err(FetchError::UnexpectedShape {
            url: url.to_owned(),
        }),
    }
}

/// Decode a count response: `{"count": N}` or `[{"count": "N"}]`.
pub(crate) fn parse_count(url: &str, body: &str) -> Result<usize, FetchError> {
    let value: Value = serde_json::from_str(body).map_err(|source| FetchError::Malformed {
        url: url.to_owned(),
        source,
    })?;
    if let Some(error) = value.get("error") {
        return Err(service_error(url, error));
    }
    let count = match &value {
        Value::Array(rows) => rows.first().and_then(|row| row.get("count")),
        Value::Object(object) => object.get("count"),
        _ => None,
    };
    count
        .and_then(|count| match count {
            Value::Number(number) => number.as_u64(),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        })
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| FetchError::UnexpectedShape {
            url: url.to_owned(),
        })
}

fn exceeded_flag(object: &Map<String, Value>) -> bool {
    let flag = |map: &Map<String, Value>| {
        map.get("exceededTransferLimit")
            .and_then(Value::as_bool)
            .unwrap_or(false)
    };
    flag(object)
        || object
            .get("properties")
            .and_then(Value::as_object)
            .is_some_and(flag)
}

fn decode_elements(elements: Vec<Value>) -> Page {
    let sent = elements.len();
    Page::new(elements.into_iter().filter_map(element).collect()).with_elements(sent)
}

fn element(value: Value) -> Option<RawRecord> {
    let Value::Object(mut object) = value else {
        return None;
    };
    match object.remove("attributes") {
        Some(Value::Object(attributes)) => Some(RawRecord {
            attributes,
            geometry: object.remove("geometry").filter(|geometry| !geometry.is_null()),
        }),
        Some(other) => {
            object.insert("attributes".to_owned(), other);
            Some(RawRecord::from_attributes(object))
        }
        None => Some(RawRecord::from_attributes(object)),
    }
}

fn service_error(url: &str, error: &Value) -> FetchError {
    let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .map_or_else(|| error.to_string(), str::to_owned);
    FetchError::Service {
        url: url.to_owned(),
        code,
        message,
    }
}
