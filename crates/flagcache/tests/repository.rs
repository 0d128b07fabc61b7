//! End-to-end tests driving a repository against a live mock API.

use std::time::Duration;

use flagcache::caching::RefreshError;
use flagcache::config::Config;
use flagcache::repository::FeatureRepository;
use flagcache::types::RetrievalOptions;
use flagcache_test::FeatureServer;
use tokio_util::sync::CancellationToken;

fn config_for(server: &FeatureServer) -> Config {
    Config {
        api_host: server.api_host(),
        client_key: "sdk-abc123".to_owned(),
        cache_ttl: Duration::from_secs(3600),
        ..Default::default()
    }
}

#[tokio::test]
async fn test_fetch_then_serve_from_cache() {
    flagcache_test::setup();

    let server = FeatureServer::new();
    server.set_features(serde_json::json!({
        "flagA": { "defaultValue": true },
    }));

    let repository = FeatureRepository::from_config(&config_for(&server)).unwrap();

    // The first call populates the empty cache from the API.
    let features = repository.latest_features().await.unwrap();
    assert!(features.contains_key("flagA"));
    assert_eq!(server.hits(), 1);

    // Within the TTL, later calls never touch the network, even when the
    // remote payload has changed in the meantime.
    server.set_features(serde_json::json!({
        "flagB": { "defaultValue": false },
    }));
    let features = repository.latest_features().await.unwrap();
    assert!(features.contains_key("flagA"));
    assert_eq!(server.hits(), 1);
}

#[tokio::test]
async fn test_force_refresh_replaces_set_wholesale() {
    flagcache_test::setup();

    let server = FeatureServer::new();
    server.set_features(serde_json::json!({
        "flagA": { "defaultValue": true },
    }));

    let repository = FeatureRepository::from_config(&config_for(&server)).unwrap();
    repository.latest_features().await.unwrap();

    server.set_features(serde_json::json!({
        "flagB": { "defaultValue": false },
    }));

    let options = RetrievalOptions {
        force_refresh: true,
        wait_for_completion: true,
    };
    let features = repository
        .get_features(&options, &CancellationToken::new())
        .await
        .unwrap();

    assert!(features.contains_key("flagB"));
    assert!(!features.contains_key("flagA"));
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn test_failed_refresh_keeps_serving_stale_data() {
    flagcache_test::setup();

    let server = FeatureServer::new();
    server.set_features(serde_json::json!({
        "flagA": { "defaultValue": true },
    }));

    let repository = FeatureRepository::from_config(&config_for(&server)).unwrap();
    repository.latest_features().await.unwrap();

    server.respond_with_status(500);

    let options = RetrievalOptions {
        force_refresh: true,
        wait_for_completion: true,
    };
    let result = repository
        .get_features(&options, &CancellationToken::new())
        .await;
    assert!(matches!(result, Err(RefreshError::Fetch(_))));

    // The cached set survived the failed cycle.
    let features = repository.latest_features().await.unwrap();
    assert!(features.contains_key("flagA"));
}

#[tokio::test]
async fn test_cancel_shuts_the_repository_down() {
    flagcache_test::setup();

    let server = FeatureServer::new();
    server.set_features(serde_json::json!({
        "flagA": { "defaultValue": true },
    }));

    let repository = FeatureRepository::from_config(&config_for(&server)).unwrap();
    repository.latest_features().await.unwrap();

    repository.cancel();

    let hits = server.hits();
    let options = RetrievalOptions {
        force_refresh: true,
        wait_for_completion: true,
    };
    let result = repository
        .get_features(&options, &CancellationToken::new())
        .await;

    assert_eq!(result, Err(RefreshError::Cancelled));
    assert_eq!(server.hits(), hits);

    // Cached reads keep working after shutdown.
    let features = repository.latest_features().await.unwrap();
    assert!(features.contains_key("flagA"));
}
