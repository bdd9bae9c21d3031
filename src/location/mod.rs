//! Location subsystem for the imsakiyah locator.
//!
//! Turns a position fix into the province and city names used by the
//! schedule API: reverse geocoding, lexical normalization, fuzzy matching
//! against the fixed region vocabulary, and a cached region directory.

pub mod address;
pub mod cache;
pub mod matching;
pub mod normalize;
pub mod providers;
pub mod resolver;
pub mod session;
pub mod timezone;
pub mod types;

pub use address::{select_candidates, Candidates};
pub use matching::{resolve_city, resolve_first_province, resolve_province};
pub use normalize::{normalize, NameContext};
pub use providers::{
    EquranDirectory, FixedPosition, GeolocationProvider, IpGeolocator, NominatimGeocoder,
    RegionDirectory, ReverseGeocoder,
};
pub use resolver::{LocationResolver, ResolverOptions};
pub use session::{ResolutionSession, ResolutionState, SupersedeHandle};
pub use timezone::{zone_for_province, IndonesianZone};
pub use types::{
    AddressRecord, CityType, Coordinates, MatchKind, PositionOptions, ProviderError, Resolution,
    ResolutionFailure, ResolveError, ResolvedLocation,
};
