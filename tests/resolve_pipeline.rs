//! End-to-end resolution against mocked Nominatim and equran.id servers.

use imsakiyah::config::{CacheConfig, Config};
use imsakiyah::location::{
    Coordinates, MatchKind, ResolutionFailure, ResolutionSession, ResolutionState, ResolveError,
    ResolvedLocation,
};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const PROVINCES: &[&str] = &["Bali", "D.I. Yogyakarta", "DKI Jakarta", "Jawa Barat"];

fn config_for(server: &MockServer, cache_dir: &TempDir) -> Config {
    Config {
        geocoder_url: server.uri(),
        schedule_api_url: server.uri(),
        cache: CacheConfig {
            enabled: true,
            ttl_days: 30,
            path: Some(cache_dir.path().join("regions.json")),
        },
        ..Config::default()
    }
}

async fn mount_reverse(server: &MockServer, lat: &str, address: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .and(query_param("lat", lat))
        .and(query_param("zoom", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "display_name": "test",
            "address": address,
        })))
        .mount(server)
        .await;
}

async fn mount_directory(server: &MockServer, province_fetches: u64) {
    Mock::given(method("GET"))
        .and(path("/provinsi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "Berhasil", "data": PROVINCES,
        })))
        .expect(province_fetches)
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/kabkota"))
        .and(body_json(json!({"provinsi": "D.I. Yogyakarta"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "Berhasil",
            "data": ["Kab. Bantul", "Kab. Gunungkidul", "Kab. Kulon Progo", "Kab. Sleman", "Kota Yogyakarta"],
        })))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/kabkota"))
        .and(body_json(json!({"provinsi": "DKI Jakarta"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 200, "message": "Berhasil",
            "data": ["Kota Jakarta Pusat", "Kota Jakarta Utara", "Kab. Kepulauan Seribu"],
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_sleman_resolves_exactly() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    mount_directory(&server, 1).await;
    mount_reverse(
        &server,
        "-7.7156",
        json!({"county": "Sleman", "state": "Daerah Istimewa Yogyakarta", "country": "Indonesia"}),
    )
    .await;

    let resolver = config_for(&server, &cache).resolver();
    let mut session = ResolutionSession::new();
    let resolution = resolver
        .resolve_at(&mut session, Coordinates::checked(-7.7156, 110.3556).unwrap())
        .await
        .unwrap();

    assert_eq!(resolution.location, ResolvedLocation::new("D.I. Yogyakarta", "Kab. Sleman"));
    assert_eq!(resolution.province_match, MatchKind::Exact);
    assert_eq!(resolution.city_match, MatchKind::Exact);
    assert_eq!(session.state(), &ResolutionState::Done);
}

#[tokio::test]
async fn test_unmatched_city_falls_back_and_cache_serves_second_run() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    // The province list is fetched once; the second resolver reads it from disk.
    mount_directory(&server, 1).await;
    mount_reverse(
        &server,
        "-6.1",
        json!({"city": "Tanjung Priok", "state": "Daerah Khusus Ibukota Jakarta"}),
    )
    .await;

    let config = config_for(&server, &cache);
    let at = Coordinates::checked(-6.1, 106.88).unwrap();

    for _ in 0..2 {
        let resolver = config.resolver();
        let mut session = ResolutionSession::new();
        let resolution = resolver.resolve_at(&mut session, at).await.unwrap();

        assert_eq!(resolution.location, ResolvedLocation::new("DKI Jakarta", "Kota Jakarta Pusat"));
        assert_eq!(resolution.city_match, MatchKind::Fallback);
        assert!(resolution.is_degraded());
    }
    assert!(cache.path().join("regions.json").exists());
}

#[tokio::test]
async fn test_address_without_province_fails() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    mount_directory(&server, 0).await;
    mount_reverse(&server, "1.5", json!({"town": "Somewhere", "country": "Nowhere"})).await;

    let resolver = config_for(&server, &cache).resolver();
    let mut session = ResolutionSession::new();
    let err = resolver
        .resolve_at(&mut session, Coordinates::checked(1.5, 100.0).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err, ResolveError::Failed(ResolutionFailure::ProvinceNotFound));
    assert_eq!(
        session.state(),
        &ResolutionState::Failed(ResolutionFailure::ProvinceNotFound)
    );
    assert!(session.location().is_none());
}

#[tokio::test]
async fn test_geocoder_outage_fails() {
    let server = MockServer::start().await;
    let cache = TempDir::new().unwrap();
    Mock::given(method("GET"))
        .and(path("/reverse"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let resolver = config_for(&server, &cache).resolver();
    let mut session = ResolutionSession::new();
    let err = resolver
        .resolve_at(&mut session, Coordinates::checked(-7.0, 110.0).unwrap())
        .await
        .unwrap_err();

    assert_eq!(err, ResolveError::Failed(ResolutionFailure::GeocodeFailed));
}
