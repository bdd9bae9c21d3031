mod handlers;
mod state;

use axum::http::{header, HeaderValue};
use axum::routing::get;
use axum::Router;
use state::AppState;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::info;

use crate::config::Config;
use crate::location::{LocationResolver, ResolvedLocation};

pub fn build_router(resolver: LocationResolver, default_location: ResolvedLocation) -> Router {
    let state = Arc::new(AppState {
        resolver,
        default_location,
    });

    Router::new()
        .route("/api/resolve", get(handlers::resolve))
        .route("/api/provinces", get(handlers::province_list))
        .route("/api/cities", get(handlers::city_list))
        .layer(SetResponseHeaderLayer::overriding(
            header::CACHE_CONTROL,
            HeaderValue::from_static("no-store"),
        ))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn start(config: &Config, host: &str, port: u16) -> std::io::Result<()> {
    let app = build_router(config.resolver(), config.default_location.clone());
    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("imsakiyah API listening on http://{}", addr);
    eprintln!("  Press Ctrl+C to stop.");

    axum::serve(listener, app).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::location::types::{AddressRecord, Coordinates, ProviderError};
    use crate::location::{RegionDirectory, ResolverOptions, ReverseGeocoder};
    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    struct StaticGeocoder(AddressRecord);

    #[async_trait]
    impl ReverseGeocoder for StaticGeocoder {
        async fn reverse_geocode(&self, _at: Coordinates, _language: &str) -> Result<AddressRecord, ProviderError> {
            Ok(self.0.clone())
        }
    }

    struct StaticDirectory;

    #[async_trait]
    impl RegionDirectory for StaticDirectory {
        async fn list_provinces(&self) -> Result<Vec<String>, ProviderError> {
            Ok(vec!["D.I. Yogyakarta".into(), "Bali".into()])
        }

        async fn list_cities(&self, province: &str) -> Result<Vec<String>, ProviderError> {
            match province {
                "D.I. Yogyakarta" => Ok(vec!["Kab. Sleman".into(), "Kota Yogyakarta".into()]),
                _ => Ok(vec![]),
            }
        }
    }

    fn app(address: AddressRecord) -> Router {
        let resolver = LocationResolver::new(
            Arc::new(StaticGeocoder(address)),
            Arc::new(StaticDirectory),
            ResolverOptions::default(),
        );
        build_router(resolver, ResolvedLocation::new("DKI Jakarta", "Kota Jakarta Pusat"))
    }

    async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let resp = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = resp.status();
        assert_eq!(resp.headers()[header::CACHE_CONTROL], "no-store");
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_resolve_ok() {
        let rec = AddressRecord::new()
            .with("county", "Sleman")
            .with("state", "Daerah Istimewa Yogyakarta");
        let (status, body) = get_json(app(rec), "/api/resolve?lat=-7.72&lon=110.36").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["province"], "D.I. Yogyakarta");
        assert_eq!(body["city"], "Kab. Sleman");
        assert_eq!(body["city_match"], "exact");
        assert_eq!(body["degraded"], false);
        assert_eq!(body["timezone"], "Asia/Jakarta");
    }

    #[tokio::test]
    async fn test_resolve_failure_carries_default() {
        let (status, body) = get_json(app(AddressRecord::new().with("town", "Ubud")), "/api/resolve?lat=-8.5&lon=115.26").await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["reason"], "province_not_found");
        assert_eq!(body["default"]["city"], "Kota Jakarta Pusat");
    }

    #[tokio::test]
    async fn test_resolve_bad_coordinates() {
        let (status, body) = get_json(app(AddressRecord::new()), "/api/resolve?lat=95&lon=10").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["code"], 400);
    }

    #[tokio::test]
    async fn test_lists() {
        let (status, body) = get_json(app(AddressRecord::new()), "/api/provinces").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[1], "Bali");

        let (status, body) =
            get_json(app(AddressRecord::new()), "/api/cities?province=D.I.%20Yogyakarta").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0], "Kab. Sleman");

        let (status, _) = get_json(app(AddressRecord::new()), "/api/cities").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
