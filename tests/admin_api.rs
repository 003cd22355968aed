//! Admin API served over a real listener.

use reqwest::StatusCode;
use serde_json::{json, Value};

use service_resilience::config::loader::parse_config;
use service_resilience::Resilience;

mod common;
use common::{start_admin, API_KEY};

const CONFIG: &str = r#"
    [[services]]
    name = "auth"
    failure_threshold = 2

    [[services.instances]]
    host = "10.0.0.1"
    port = 8000
    id = "auth-1"

    [[services.instances]]
    host = "10.0.0.2"
    port = 8000
    weight = 3
"#;

async fn spawn() -> (String, Resilience) {
    let resilience = Resilience::from_config(&parse_config(CONFIG).unwrap());
    let addr = start_admin(resilience.clone()).await;
    (format!("http://{}", addr), resilience)
}

async fn get(client: &reqwest::Client, url: String) -> (StatusCode, Value) {
    let res = client.get(url).bearer_auth(API_KEY).send().await.unwrap();
    let status = res.status();
    let body = res.json().await.unwrap_or(Value::Null);
    (status, body)
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let (base, _) = spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .get(format!("{}/admin/status", base))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    let res = client
        .post(format!("{}/admin/circuits/auth/open", base))
        .bearer_auth("wrong")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_status_and_circuit_reports() {
    let (base, resilience) = spawn().await;
    let client = reqwest::Client::new();
    resilience.circuits.record_failure("auth", Some("timeout"));

    let (status, body) = get(&client, format!("{}/admin/status", base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["circuits"], 1);
    assert_eq!(body["services"], 1);

    let (status, body) = get(&client, format!("{}/admin/circuits/auth", base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["state"], "closed");
    assert_eq!(body["failure_count"], 1);
    assert_eq!(body["failure_threshold"], 2);
    assert_eq!(body["last_error"], "timeout");

    let (status, _) = get(&client, format!("{}/admin/circuits/missing", base)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, body) = get(&client, format!("{}/admin/circuits/stats", base)).await;
    assert_eq!(body["total_circuits"], 1);
    assert_eq!(body["failed_calls"], 1);
}

#[tokio::test]
async fn test_force_open_and_close_over_http() {
    let (base, resilience) = spawn().await;
    let client = reqwest::Client::new();

    let res = client
        .post(format!("{}/admin/circuits/auth/open", base))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "open");
    assert!(!resilience.circuits.can_execute("auth"));

    let res = client
        .post(format!("{}/admin/circuits/auth/close", base))
        .bearer_auth(API_KEY)
        .send()
        .await
        .unwrap();
    let body: Value = res.json().await.unwrap();
    assert_eq!(body["state"], "closed");
    assert!(resilience.circuits.can_execute("auth"));
}

#[tokio::test]
async fn test_service_reports_and_health_updates() {
    let (base, resilience) = spawn().await;
    let client = reqwest::Client::new();

    let (status, body) = get(&client, format!("{}/admin/services/auth", base)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_instances"], 2);
    assert_eq!(body["total_weight"], 4);
    assert_eq!(body["default_strategy"], "round_robin");
    assert_eq!(body["instances"][0]["id"], "auth-1");
    assert_eq!(body["instances"][1]["id"], "10.0.0.2:8000");

    let res = client
        .post(format!("{}/admin/services/auth/instances/auth-1/health", base))
        .bearer_auth(API_KEY)
        .json(&json!({ "healthy": false }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NO_CONTENT);
    assert!(!resilience.balancer.instances("auth")[0].healthy);

    let res = client
        .post(format!("{}/admin/services/auth/instances/nope/health", base))
        .bearer_auth(API_KEY)
        .json(&json!({ "healthy": true }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);

    let (_, body) = get(&client, format!("{}/admin/services", base)).await;
    assert_eq!(body["total_services"], 1);
    assert_eq!(body["healthy_instances"], 1);
}
