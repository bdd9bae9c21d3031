//! Location resolver: orchestrates one resolution attempt.
//!
//! Flow: position → reverse geocode → candidate selection → province list →
//! province match → scoped city list → city match (or first-entry fallback).
//! Each step that can fail maps to exactly one [`ResolutionFailure`].

use super::address::select_candidates;
use super::matching::{resolve_city, resolve_first_province};
use super::providers::{FixedPosition, GeolocationProvider, RegionDirectory, ReverseGeocoder};
use super::session::{ResolutionSession, ResolutionState};
use super::types::{
    Coordinates, Match, MatchKind, PositionOptions, Resolution, ResolutionFailure, ResolveError,
    ResolvedLocation,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Tunables for the resolver.
#[derive(Debug, Clone)]
pub struct ResolverOptions {
    /// `accept-language` sent to the geocoder.
    pub language: String,
    pub position: PositionOptions,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            language: "id".into(),
            position: PositionOptions::default(),
        }
    }
}

/// The location resolver with its collaborators.
#[derive(Clone)]
pub struct LocationResolver {
    geocoder: Arc<dyn ReverseGeocoder>,
    directory: Arc<dyn RegionDirectory>,
    options: ResolverOptions,
}

impl LocationResolver {
    pub fn new(
        geocoder: Arc<dyn ReverseGeocoder>,
        directory: Arc<dyn RegionDirectory>,
        options: ResolverOptions,
    ) -> Self {
        Self {
            geocoder,
            directory,
            options,
        }
    }

    /// The reference vocabulary this resolver matches against.
    pub fn directory(&self) -> &dyn RegionDirectory {
        self.directory.as_ref()
    }

    /// Resolve a position supplied by the caller.
    pub async fn resolve_at(
        &self,
        session: &mut ResolutionSession,
        at: Coordinates,
    ) -> Result<Resolution, ResolveError> {
        self.resolve_location(session, Some(&FixedPosition(at))).await
    }

    /// Run one attempt. `locator` is `None` when the platform has no
    /// geolocation capability.
    ///
    /// Returns [`ResolveError::Superseded`] if another attempt started (or the
    /// session's supersede handle fired) while this one was in flight; the
    /// session is then left as the newer attempt set it.
    #[instrument(level = "debug", skip_all)]
    pub async fn resolve_location(
        &self,
        session: &mut ResolutionSession,
        locator: Option<&dyn GeolocationProvider>,
    ) -> Result<Resolution, ResolveError> {
        let token = session.begin();

        let Some(locator) = locator else {
            return Err(session.fail(&token, ResolutionFailure::GeolocationUnsupported));
        };

        let at = match locator.current_position(&self.options.position).await {
            Ok(at) => at,
            Err(e) => {
                warn!(error = %e, "position unavailable");
                return Err(session.fail(&token, ResolutionFailure::PositionUnavailable));
            }
        };
        if !token.is_current() {
            return Err(ResolveError::Superseded);
        }
        debug!(%at, "position acquired");

        let address = match self.geocoder.reverse_geocode(at, &self.options.language).await {
            Ok(address) => address,
            Err(e) => {
                warn!(error = %e, %at, "reverse geocoding failed");
                return Err(session.fail(&token, ResolutionFailure::GeocodeFailed));
            }
        };

        let candidates = select_candidates(&address);
        debug!(
            provinces = ?candidates.province_candidates,
            city = candidates.raw_city.as_deref().unwrap_or(""),
            hint = ?candidates.city_type_hint,
            "address candidates"
        );
        session.advance(&token, ResolutionState::Resolving)?;

        let province = match self.match_province(&candidates.province_candidates).await {
            Ok(Some(m)) => m,
            Ok(None) => return Err(session.fail(&token, ResolutionFailure::ProvinceNotFound)),
            Err(reason) => return Err(session.fail(&token, reason)),
        };

        let Some(city_query) = candidates.city_query() else {
            return Err(session.fail(&token, ResolutionFailure::CityNotFound));
        };
        if !token.is_current() {
            return Err(ResolveError::Superseded);
        }

        let cities = match self.directory.list_cities(&province.name).await {
            Ok(cities) => cities,
            Err(e) => {
                warn!(error = %e, province = %province.name, "city list unavailable");
                return Err(session.fail(&token, ResolutionFailure::ReferenceUnavailable));
            }
        };

        let city = match resolve_city(&city_query, &cities) {
            Some(m) => m,
            None => match cities.first() {
                Some(first) => {
                    warn!(
                        query = %city_query,
                        province = %province.name,
                        fallback = %first,
                        "no city matched; using first listed city (degraded)"
                    );
                    Match {
                        name: first.clone(),
                        kind: MatchKind::Fallback,
                    }
                }
                None => {
                    warn!(province = %province.name, "province has no cities");
                    return Err(session.fail(&token, ResolutionFailure::CityNotFound));
                }
            },
        };

        let resolution = Resolution {
            location: ResolvedLocation::new(province.name, city.name),
            province_match: province.kind,
            city_match: city.kind,
        };
        let resolution = session.complete(&token, resolution)?;
        info!(
            province = %resolution.location.province,
            city = %resolution.location.city,
            city_match = %resolution.city_match,
            "location resolved"
        );
        Ok(resolution)
    }

    async fn match_province(&self, candidates: &[String]) -> Result<Option<Match>, ResolutionFailure> {
        if candidates.is_empty() {
            debug!("address has no province fields");
            return Ok(None);
        }
        let provinces = self.directory.list_provinces().await.map_err(|e| {
            warn!(error = %e, "province list unavailable");
            ResolutionFailure::ReferenceUnavailable
        })?;
        Ok(resolve_first_province(candidates, &provinces))
    }
}
