//! Collaborators: geolocation, Nominatim reverse geocoding, and the
//! equran.id imsakiyah region directory.
//!
//! The HTTP clients are blocking (`ureq`); their async trait methods hop onto
//! the Tokio blocking pool.

use super::types::{AddressRecord, Coordinates, PositionOptions, ProviderError};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

// ─── Collaborator contracts ─────────────────────────────────────

/// Source of the device position.
#[async_trait]
pub trait GeolocationProvider: Send + Sync {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinates, ProviderError>;
}

/// Coordinates to structured address.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn reverse_geocode(&self, at: Coordinates, language: &str) -> Result<AddressRecord, ProviderError>;
}

/// The schedule API's fixed province and city vocabulary.
#[async_trait]
pub trait RegionDirectory: Send + Sync {
    async fn list_provinces(&self) -> Result<Vec<String>, ProviderError>;
    async fn list_cities(&self, province: &str) -> Result<Vec<String>, ProviderError>;
}

fn agent(user_agent: &str, timeout: Duration) -> ureq::Agent {
    ureq::AgentBuilder::new()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
}

// ─── Fixed position ─────────────────────────────────────────────

/// A position supplied up front (CLI flags, HTTP query).
#[derive(Debug, Clone, Copy)]
pub struct FixedPosition(pub Coordinates);

#[async_trait]
impl GeolocationProvider for FixedPosition {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Coordinates, ProviderError> {
        Ok(self.0)
    }
}

// ─── IP-based geolocation ───────────────────────────────────────

#[derive(Deserialize)]
struct IpApiResult {
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: bool,
    #[serde(default)]
    reason: Option<String>,
}

fn parse_ip_fix(r: IpApiResult) -> Result<Coordinates, ProviderError> {
    if r.error {
        return Err(ProviderError::InvalidResponse(
            r.reason.unwrap_or_else(|| "lookup refused".into()),
        ));
    }
    let lat = r.latitude.ok_or_else(|| ProviderError::InvalidResponse("no latitude".into()))?;
    let lon = r.longitude.ok_or_else(|| ProviderError::InvalidResponse("no longitude".into()))?;
    Coordinates::checked(lat, lon)
        .ok_or_else(|| ProviderError::InvalidResponse(format!("out of range: {}, {}", lat, lon)))
}

/// Approximate position from the public IP (city-level accuracy at best).
pub struct IpGeolocator {
    url: String,
    user_agent: String,
    last_fix: Mutex<Option<(Instant, Coordinates)>>,
}

impl IpGeolocator {
    pub fn new(url: impl Into<String>, user_agent: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            user_agent: user_agent.into(),
            last_fix: Mutex::new(None),
        }
    }

    fn cached(&self, maximum_age: Duration) -> Option<Coordinates> {
        let guard = self.last_fix.lock().ok()?;
        (*guard)
            .filter(|(at, _)| at.elapsed() <= maximum_age)
            .map(|(_, fix)| fix)
    }
}

#[async_trait]
impl GeolocationProvider for IpGeolocator {
    async fn current_position(&self, options: &PositionOptions) -> Result<Coordinates, ProviderError> {
        if let Some(fix) = self.cached(options.maximum_age) {
            debug!(%fix, "reusing cached IP fix");
            return Ok(fix);
        }
        if options.high_accuracy {
            debug!("high accuracy requested; IP geolocation is coarse");
        }

        let url = self.url.clone();
        let agent = agent(&self.user_agent, options.timeout);
        let fix = tokio::task::spawn_blocking(move || -> Result<Coordinates, ProviderError> {
            let r: IpApiResult = agent
                .get(&url)
                .call()?
                .into_json()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            parse_ip_fix(r)
        })
        .await??;

        if let Ok(mut guard) = self.last_fix.lock() {
            *guard = Some((Instant::now(), fix));
        }
        Ok(fix)
    }
}

// ─── Nominatim reverse geocoding ────────────────────────────────

#[derive(Deserialize, Debug)]
struct NominatimReverse {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    address: Option<AddressRecord>,
    #[serde(default)]
    error: Option<String>,
}

fn parse_reverse(body: NominatimReverse) -> Result<AddressRecord, ProviderError> {
    if let Some(err) = body.error {
        debug!(error = %err, "nominatim returned an error payload");
        return Err(ProviderError::MissingAddress);
    }
    match body.address {
        Some(address) if !address.is_empty() => {
            debug!(display_name = body.display_name.as_deref().unwrap_or(""), "reverse geocoded");
            Ok(address)
        }
        _ => Err(ProviderError::MissingAddress),
    }
}

/// OpenStreetMap Nominatim `/reverse`.
#[derive(Clone)]
pub struct NominatimGeocoder {
    base_url: String,
    agent: ureq::Agent,
}

impl NominatimGeocoder {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: agent(user_agent, timeout),
        }
    }
}

#[async_trait]
impl ReverseGeocoder for NominatimGeocoder {
    async fn reverse_geocode(&self, at: Coordinates, language: &str) -> Result<AddressRecord, ProviderError> {
        let this = self.clone();
        let language = language.to_string();
        tokio::task::spawn_blocking(move || -> Result<AddressRecord, ProviderError> {
            let body: NominatimReverse = this
                .agent
                .get(&format!("{}/reverse", this.base_url))
                .query("lat", &at.latitude.to_string())
                .query("lon", &at.longitude.to_string())
                .query("format", "jsonv2")
                .query("addressdetails", "1")
                .query("zoom", "10")
                .query("accept-language", &language)
                .call()?
                .into_json()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            parse_reverse(body)
        })
        .await?
    }
}

// ─── equran.id imsakiyah directory ──────────────────────────────

/// `{code, message, data}` envelope used by every equran.id endpoint.
#[derive(Deserialize, Debug)]
struct Envelope<T> {
    code: u16,
    #[serde(default)]
    message: String,
    data: Option<T>,
}

fn unwrap_envelope(env: Envelope<Vec<String>>) -> Result<Vec<String>, ProviderError> {
    if env.code != 200 {
        return Err(ProviderError::InvalidResponse(format!(
            "code {}: {}",
            env.code, env.message
        )));
    }
    env.data
        .ok_or_else(|| ProviderError::InvalidResponse("missing data".into()))
}

/// Province/city vocabulary served by equran.id's imsakiyah API.
#[derive(Clone)]
pub struct EquranDirectory {
    base_url: String,
    agent: ureq::Agent,
}

impl EquranDirectory {
    pub fn new(base_url: impl Into<String>, user_agent: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            agent: agent(user_agent, timeout),
        }
    }
}

#[async_trait]
impl RegionDirectory for EquranDirectory {
    async fn list_provinces(&self) -> Result<Vec<String>, ProviderError> {
        let this = self.clone();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, ProviderError> {
            let env: Envelope<Vec<String>> = this
                .agent
                .get(&format!("{}/provinsi", this.base_url))
                .call()?
                .into_json()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            unwrap_envelope(env)
        })
        .await?
    }

    async fn list_cities(&self, province: &str) -> Result<Vec<String>, ProviderError> {
        let this = self.clone();
        let province = province.to_string();
        tokio::task::spawn_blocking(move || -> Result<Vec<String>, ProviderError> {
            let env: Envelope<Vec<String>> = this
                .agent
                .post(&format!("{}/kabkota", this.base_url))
                .send_json(serde_json::json!({ "provinsi": province }))?
                .into_json()
                .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;
            unwrap_envelope(env)
        })
        .await?
    }
}
