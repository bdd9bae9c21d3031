//! Core types for the location subsystem.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

/// A WGS84 position fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    /// Build a fix, rejecting values outside -90..90 / -180..180.
    pub fn checked(latitude: f64, longitude: f64) -> Option<Self> {
        if (-90.0..=90.0).contains(&latitude) && (-180.0..=180.0).contains(&longitude) {
            Some(Self { latitude, longitude })
        } else {
            None
        }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ns = if self.latitude >= 0.0 { 'N' } else { 'S' };
        let ew = if self.longitude >= 0.0 { 'E' } else { 'W' };
        write!(
            f,
            "{:.4}\u{00B0}{}, {:.4}\u{00B0}{}",
            self.latitude.abs(),
            ns,
            self.longitude.abs(),
            ew
        )
    }
}

/// Hints forwarded to the geolocation provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    /// Accept a cached fix no older than this.
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::from_secs(300),
        }
    }
}

/// Structured address returned by the reverse geocoder, keyed by field name
/// (`state`, `county`, `city`, ...).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AddressRecord {
    fields: BTreeMap<String, String>,
}

impl AddressRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, mostly for tests and fixtures.
    pub fn with(mut self, field: &str, value: &str) -> Self {
        self.fields.insert(field.to_string(), value.to_string());
        self
    }

    /// Value of `field`, or `None` when absent or blank.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.fields
            .get(field)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn is_empty(&self) -> bool {
        self.fields.values().all(|v| v.trim().is_empty())
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for AddressRecord {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}

/// Regency vs. incorporated city, the two second-tier administrative types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CityType {
    /// Kabupaten, listed as "Kab. ..."
    Regency,
    /// Kota, listed as "Kota ..."
    City,
}

impl CityType {
    /// The prefix the reference vocabulary uses for this type.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Regency => "Kab.",
            Self::City => "Kota",
        }
    }
}

impl fmt::Display for CityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// How a reference entry was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchKind {
    Exact,
    Partial,
    /// First list entry taken because no name matched (degraded).
    Fallback,
}

impl fmt::Display for MatchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact => write!(f, "exact"),
            Self::Partial => write!(f, "partial"),
            Self::Fallback => write!(f, "fallback"),
        }
    }
}

/// A reference entry picked by one of the resolvers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    pub name: String,
    pub kind: MatchKind,
}

/// Province and city, both drawn verbatim from the schedule API's reference lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedLocation {
    pub province: String,
    pub city: String,
}

impl ResolvedLocation {
    pub fn new(province: impl Into<String>, city: impl Into<String>) -> Self {
        Self {
            province: province.into(),
            city: city.into(),
        }
    }

    pub fn display_line(&self) -> String {
        format!("\u{1F4CD} {}, {}", self.city, self.province)
    }
}

/// Successful outcome of one resolution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub location: ResolvedLocation,
    pub province_match: MatchKind,
    pub city_match: MatchKind,
}

impl Resolution {
    pub fn is_degraded(&self) -> bool {
        self.city_match == MatchKind::Fallback
    }
}

/// Why an attempt ended in `Failed`. None of these are fatal; the caller
/// falls back to its configured default location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionFailure {
    #[error("geolocation is not supported on this platform")]
    GeolocationUnsupported,
    #[error("current position is unavailable")]
    PositionUnavailable,
    #[error("reverse geocoding failed")]
    GeocodeFailed,
    #[error("no province matched the geocoded address")]
    ProvinceNotFound,
    #[error("no city could be determined for the resolved province")]
    CityNotFound,
    #[error("reference region list could not be fetched")]
    ReferenceUnavailable,
}

impl ResolutionFailure {
    /// User-facing message in Indonesian.
    pub fn localized(&self) -> &'static str {
        match self {
            Self::GeolocationUnsupported => "Perangkat tidak mendukung deteksi lokasi.",
            Self::PositionUnavailable => "Lokasi tidak dapat diperoleh.",
            Self::GeocodeFailed => "Gagal mengenali alamat dari koordinat.",
            Self::ProvinceNotFound => "Provinsi tidak ditemukan.",
            Self::CityNotFound => "Kabupaten/kota tidak ditemukan.",
            Self::ReferenceUnavailable => "Daftar wilayah tidak dapat dimuat.",
        }
    }
}

/// Error returned by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    #[error(transparent)]
    Failed(#[from] ResolutionFailure),
    /// A newer attempt took over; this attempt's result was discarded.
    #[error("resolution attempt superseded by a newer one")]
    Superseded,
}

/// Failures reported by external collaborators.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(String),
    #[error("invalid API response: {0}")]
    InvalidResponse(String),
    #[error("response carried no address")]
    MissingAddress,
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl From<ureq::Error> for ProviderError {
    fn from(e: ureq::Error) -> Self {
        match e {
            ureq::Error::Status(code, resp) => {
                Self::Network(format!("HTTP {} from {}", code, resp.get_url()))
            }
            ureq::Error::Transport(t) => Self::Network(t.to_string()),
        }
    }
}

impl From<tokio::task::JoinError> for ProviderError {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::Network(format!("request task failed: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_coordinates_checked() {
        assert!(Coordinates::checked(-7.7956, 110.3695).is_some());
        assert!(Coordinates::checked(91.0, 0.0).is_none());
        assert!(Coordinates::checked(0.0, -181.0).is_none());
    }

    #[test]
    fn test_coordinates_display() {
        let c = Coordinates::checked(-6.2088, 106.8456).unwrap();
        assert_eq!(c.to_string(), "6.2088\u{00B0}S, 106.8456\u{00B0}E");
    }

    #[test]
    fn test_address_record_blank_is_absent() {
        let rec = AddressRecord::new().with("state", "  ").with("county", "Sleman");
        assert_eq!(rec.get("state"), None);
        assert_eq!(rec.get("county"), Some("Sleman"));
        assert_eq!(rec.get("city"), None);
        assert!(!rec.is_empty());
        assert!(AddressRecord::new().with("town", "").is_empty());
    }

    #[test]
    fn test_address_record_deserializes_flat_map() {
        let rec: AddressRecord =
            serde_json::from_str(r#"{"state":"Jawa Tengah","country_code":"id"}"#).unwrap();
        assert_eq!(rec.get("state"), Some("Jawa Tengah"));
    }

    #[test]
    fn test_failure_serializes_snake_case() {
        let json = serde_json::to_string(&ResolutionFailure::ProvinceNotFound).unwrap();
        assert_eq!(json, "\"province_not_found\"");
    }

    #[test]
    fn test_degraded_resolution() {
        let r = Resolution {
            location: ResolvedLocation::new("DKI Jakarta", "Kota Jakarta Utara"),
            province_match: MatchKind::Exact,
            city_match: MatchKind::Fallback,
        };
        assert!(r.is_degraded());
    }
}
