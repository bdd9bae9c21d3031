//! Runtime configuration, read from `<config_dir>/imsakiyah/config.json`.
//!
//! Every field has a default, so a missing file (or a file that sets only a
//! few keys) is fine. A file that exists but does not parse is an error.

use crate::location::cache::{CachedDirectory, RegionCache, DEFAULT_TTL_DAYS};
use crate::location::{
    EquranDirectory, IpGeolocator, LocationResolver, NominatimGeocoder, PositionOptions,
    RegionDirectory, ResolvedLocation, ResolverOptions,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionConfig {
    pub high_accuracy: bool,
    pub timeout_secs: u64,
    pub maximum_age_secs: u64,
}

impl Default for PositionConfig {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_secs: 10,
            maximum_age_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    pub ttl_days: i64,
    /// Overrides the platform cache directory.
    pub path: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_days: DEFAULT_TTL_DAYS,
            path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub geocoder_url: String,
    pub schedule_api_url: String,
    pub ip_geolocation_url: String,
    pub user_agent: String,
    /// `accept-language` for reverse geocoding.
    pub language: String,
    pub request_timeout_secs: u64,
    pub position: PositionConfig,
    pub cache: CacheConfig,
    /// Applied by callers when resolution fails.
    pub default_location: ResolvedLocation,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            geocoder_url: "https://nominatim.openstreetmap.org".into(),
            schedule_api_url: "https://equran.id/api/v2/imsakiyah".into(),
            ip_geolocation_url: "https://ipapi.co/json/".into(),
            user_agent: concat!("imsakiyah/", env!("CARGO_PKG_VERSION")).into(),
            language: "id".into(),
            request_timeout_secs: 15,
            position: PositionConfig::default(),
            cache: CacheConfig::default(),
            default_location: ResolvedLocation::new("DKI Jakarta", "Kota Jakarta Pusat"),
        }
    }
}

impl Config {
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("."))
            .join("imsakiyah")
            .join("config.json")
    }

    /// Load from the default path; defaults if the file does not exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let data = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&data).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn position_options(&self) -> PositionOptions {
        PositionOptions {
            high_accuracy: self.position.high_accuracy,
            timeout: Duration::from_secs(self.position.timeout_secs),
            maximum_age: Duration::from_secs(self.position.maximum_age_secs),
        }
    }

    pub fn resolver_options(&self) -> ResolverOptions {
        ResolverOptions {
            language: self.language.clone(),
            position: self.position_options(),
        }
    }

    /// Region directory, wrapped in the on-disk cache when enabled.
    pub fn directory(&self) -> Arc<dyn RegionDirectory> {
        let remote = EquranDirectory::new(
            self.schedule_api_url.clone(),
            &self.user_agent,
            self.request_timeout(),
        );
        if !self.cache.enabled {
            return Arc::new(remote);
        }
        let cache = match &self.cache.path {
            Some(path) => RegionCache::load_from(path.clone(), self.cache.ttl_days),
            None => RegionCache::load(self.cache.ttl_days),
        };
        Arc::new(CachedDirectory::new(remote, cache))
    }

    pub fn resolver(&self) -> LocationResolver {
        let geocoder = NominatimGeocoder::new(
            self.geocoder_url.clone(),
            &self.user_agent,
            self.request_timeout(),
        );
        LocationResolver::new(Arc::new(geocoder), self.directory(), self.resolver_options())
    }

    pub fn ip_geolocator(&self) -> IpGeolocator {
        IpGeolocator::new(self.ip_geolocation_url.clone(), self.user_agent.clone())
    }
}
