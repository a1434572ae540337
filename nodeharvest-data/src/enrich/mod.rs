//! Geocoding study locations that have an address but no coordinates.

mod address;
mod arcgis;
mod chain;
mod checkpoint;
mod geocoder;
mod nominatim;
mod pass;
mod settings;
mod studies;

#[cfg(any(test, feature = "test-support"))]
#[doc(hidden)]
pub mod test_support;


pub use address::{AddressNormalizer, AddressSettings};
pub use arcgis::{ArcgisGeocoder, DEFAULT_ARCGIS_GEOCODER};
pub use chain::{GeocoderChain, ResolvedAddress};
pub use checkpoint::{CheckpointError, GeocodeCheckpoint};
pub use geocoder::{GeocodeCandidate, GeocodeError, Geocoder};
pub use nominatim::{DEFAULT_NOMINATIM_ENDPOINT, NominatimGeocoder};
pub use pass::{EnrichError, EnrichmentPass, EnrichmentReport, PassPaths};
pub use settings::{GeocodingSettings, ProviderSettings};
pub use studies::{PendingNode, StudyIndex, StudyIndexError, StudyNode};
