//! iopool API client tests against a mock server

use iopool_core::ApiKey;
use iopool_devices::{ClientConfig, IopoolClient, PoolApi, PoolError, PoolMode, PoolSummary};
use mockito::Server;
use std::time::Duration;

fn client_for(server: &Server) -> IopoolClient {
    IopoolClient::new(
        ClientConfig::default()
            .with_endpoint(server.url())
            .with_timeout(Duration::from_secs(2)),
    )
    .unwrap()
}

#[tokio::test]
async fn test_list_pools_sends_api_key() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/pools")
        .match_header("x-api-key", "secret")
        .match_header("accept", "application/json")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"[{"id":"p1","name":"Main"},{"id":"p2"}]"#)
        .create_async()
        .await;

    let pools = client_for(&server)
        .list_pools(&ApiKey::new("secret"))
        .await
        .unwrap();

    assert_eq!(
        pools,
        vec![
            PoolSummary { id: "p1".to_string(), name: "Main".to_string() },
            PoolSummary { id: "p2".to_string(), name: "p2".to_string() },
        ]
    );
    mock.assert_async().await;
}

#[tokio::test]
async fn test_pool_detail_maps_all_fields() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/pool/p1")
        .match_header("x-api-key", "secret")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{
                "id": "p1",
                "latestMeasure": {"temperature": 24.5, "ph": 7.2, "orp": 650, "mode": "GATEWAY"},
                "advice": {"filtrationDuration": 6},
                "hasAnActionRequired": false
            }"#,
        )
        .create_async()
        .await;

    let reading = client_for(&server)
        .pool_detail(&ApiKey::new("secret"), "p1")
        .await
        .unwrap();

    assert_eq!(reading.temperature, Some(24.5));
    assert_eq!(reading.ph, Some(7.2));
    assert_eq!(reading.orp, Some(650.0));
    assert_eq!(reading.mode, Some(PoolMode::Standard));
    assert_eq!(reading.filtration_duration, Some(6.0));
    assert_eq!(reading.action_required, Some(false));
    assert_eq!(reading.measured_at, None);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_status_codes_map_to_errors() {
    let mut server = Server::new_async().await;
    let client = client_for(&server);
    let key = ApiKey::new("secret");

    let _unauthorized = server
        .mock("GET", "/pool/locked")
        .with_status(401)
        .with_body("unauthorized")
        .create_async()
        .await;
    let _forbidden = server
        .mock("GET", "/pool/other")
        .with_status(403)
        .create_async()
        .await;
    let _missing = server
        .mock("GET", "/pool/gone")
        .with_status(404)
        .create_async()
        .await;
    let _broken = server
        .mock("GET", "/pool/broken")
        .with_status(500)
        .with_body("x".repeat(1000))
        .create_async()
        .await;

    assert_eq!(
        client.pool_detail(&key, "locked").await,
        Err(PoolError::Unauthorized(401))
    );
    assert_eq!(
        client.pool_detail(&key, "other").await,
        Err(PoolError::Unauthorized(403))
    );
    assert_eq!(
        client.pool_detail(&key, "gone").await,
        Err(PoolError::NotFound("gone".to_string()))
    );
    assert_eq!(client.pool_detail(&key, "broken").await, Err(PoolError::Http(500)));
}

#[tokio::test]
async fn test_unexpected_bodies_are_parse_errors() {
    let mut server = Server::new_async().await;
    let client = client_for(&server);
    let key = ApiKey::new("secret");

    let _list = server
        .mock("GET", "/pools")
        .with_status(200)
        .with_body(r#"{"pools": []}"#)
        .create_async()
        .await;
    let _detail = server
        .mock("GET", "/pool/p1")
        .with_status(200)
        .with_body("<html>maintenance</html>")
        .create_async()
        .await;

    assert!(matches!(client.list_pools(&key).await, Err(PoolError::Parse(_))));
    assert!(matches!(client.pool_detail(&key, "p1").await, Err(PoolError::Parse(_))));
}

#[tokio::test]
async fn test_unreachable_server_is_network_error() {
    let client = IopoolClient::new(
        ClientConfig::default()
            .with_endpoint("http://127.0.0.1:9")
            .with_timeout(Duration::from_secs(1)),
    )
    .unwrap();

    let err = client.list_pools(&ApiKey::new("secret")).await.unwrap_err();
    assert!(matches!(err, PoolError::Network(_)));
    assert_eq!(err.unavailable_reason(), format!("API error: {}", err));
}
