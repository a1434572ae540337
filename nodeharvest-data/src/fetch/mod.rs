//! Paginated retrieval of remote result sets.

mod error;
mod page;
mod paginate;
mod source;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;

pub use error::FetchError;
pub use page::Page;
pub use paginate::{FetchOutcome, PaginationOptions, Termination, fetch_all};
pub use source::{FeatureSource, HttpFeatureSource};
