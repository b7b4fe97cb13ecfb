//! Operational endpoint integration tests.
//!
//! Exercises `/health`, `/ready`, `/metrics` and the 404 fallback over real
//! TCP using the `TestLaneServer` harness.

use lane_test_utils::TestLaneServer;

#[tokio::test]
async fn test_health_endpoint_returns_ok_json() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/health", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body.get("status"), Some(&serde_json::json!("ok")));
    assert!(
        body.get("timestamp").and_then(|t| t.as_str()).is_some(),
        "Expected a timestamp string, got {body}"
    );

    Ok(())
}

#[tokio::test]
async fn test_ready_follows_health_state() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let client = reqwest::Client::new();
    let ready_url = format!("{}/ready", server.url());

    assert_eq!(client.get(&ready_url).send().await?.status(), 200);

    server.health().set_not_ready();
    assert_eq!(client.get(&ready_url).send().await?.status(), 503);

    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_is_served() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let client = reqwest::Client::new();

    let response = client
        .get(format!("{}/metrics", server.url()))
        .send()
        .await?;

    assert_eq!(response.status(), 200);

    Ok(())
}

#[tokio::test]
async fn test_unknown_route_returns_404() -> Result<(), anyhow::Error> {
    let server = TestLaneServer::spawn().await?;
    let client = reqwest::Client::new();

    for path in ["/", "/socket.io/", "/v1/lanes"] {
        let response = client
            .get(format!("{}{path}", server.url()))
            .send()
            .await?;
        assert_eq!(response.status(), 404, "path {path}");
    }

    Ok(())
}
