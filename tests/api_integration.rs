//! End-to-end tests for the REST API served over a real socket

use incidash::dashboard::DashboardService;
use incidash::server::router;
use incidash::store::MemoryIncidentStore;
use incidash::testing::IncidentBuilder;
use serde_json::{json, Value};
use std::sync::Arc;

struct TestServer {
    base: String,
    client: reqwest::Client,
}

impl TestServer {
    async fn start(service: Arc<DashboardService>) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(service)).await.unwrap();
        });
        Self {
            base: format!("http://{addr}/api/v1"),
            client: reqwest::Client::new(),
        }
    }

    async fn get(&self, path: &str) -> (u16, Value) {
        let response = self
            .client
            .get(format!("{}{path}", self.base))
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }

    async fn send(&self, method: reqwest::Method, path: &str, body: Value) -> (u16, Value) {
        let response = self
            .client
            .request(method, format!("{}{path}", self.base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = response.status().as_u16();
        (status, response.json().await.unwrap())
    }
}

fn draft_body(title: &str, priority: &str) -> Value {
    json!({
        "title": title,
        "platform": "Production",
        "priority": priority,
        "responsible_team": "Payments",
        "responsible_team_email": "payments@example.com",
        "intervening_team": "Ops",
        "intervening_person": "Sam",
        "intervening_person_email": "sam@example.com"
    })
}

async fn empty_server() -> TestServer {
    let service = Arc::new(DashboardService::new(
        Arc::new(MemoryIncidentStore::new()),
        None,
    ));
    TestServer::start(service).await
}

#[tokio::test]
async fn test_health_reports_healthy() {
    let server = empty_server().await;
    let (status, body) = server.get("/health").await;
    assert_eq!(status, 200);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["status"], "healthy");
}

#[tokio::test]
async fn test_report_then_triage_updates_stats() {
    let server = empty_server().await;

    let (status, body) = server
        .send(reqwest::Method::POST, "/incidents", draft_body("Checkout down", "P0"))
        .await;
    assert_eq!(status, 201);
    let id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["status"], "NEW");

    let (_, stats) = server.get("/stats").await;
    assert_eq!(stats["data"]["totalIncidents"], 1);
    assert_eq!(stats["data"]["criticalIncidents"], 1);

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            &format!("/incidents/{id}/status"),
            json!({"status": "RESOLVED"}),
        )
        .await;
    assert_eq!(status, 200);
    assert!(body["data"]["resolved_at"].is_string());

    let (status, body) = server
        .send(
            reqwest::Method::PUT,
            &format!("/incidents/{id}/root-cause"),
            json!({"text": "expired certificate"}),
        )
        .await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["root_cause"], "expired certificate");

    let (_, stats) = server.get("/stats").await;
    // resolved but not closed
    assert_eq!(stats["data"]["criticalIncidents"], 1);
    assert_eq!(stats["data"]["resolutionRate"], 100.0);
    assert_eq!(stats["data"]["teamStats"][0]["name"], "Ops");

    let (_, duration) = server.get(&format!("/incidents/{id}/duration")).await;
    assert_eq!(duration["data"]["state"], "unspecified");
    assert_eq!(duration["data"]["text"], "unspecified");
}

#[tokio::test]
async fn test_invalid_requests_are_rejected() {
    let server = empty_server().await;

    let (status, body) = server
        .send(reqwest::Method::POST, "/incidents", draft_body(" ", "P1"))
        .await;
    assert_eq!(status, 400);
    assert_eq!(body["success"], false);

    let (status, _) = server.get("/incidents/missing").await;
    assert_eq!(status, 404);

    let (status, body) = server.get("/stats?window=fortnight").await;
    assert_eq!(status, 400);
    assert!(body["error"].as_str().unwrap().contains("fortnight"));
}

#[tokio::test]
async fn test_reminder_without_notifications_is_unavailable() {
    let service = Arc::new(DashboardService::new(
        Arc::new(MemoryIncidentStore::with_incidents(vec![
            IncidentBuilder::new("a").build(),
        ])),
        None,
    ));
    let server = TestServer::start(service).await;

    let (status, body) = server
        .send(
            reqwest::Method::POST,
            "/incidents/a/reminder",
            json!({"email": "lead@example.com"}),
        )
        .await;
    assert_eq!(status, 503);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_filters_trend_and_export() {
    let base = IncidentBuilder::epoch();
    let store = MemoryIncidentStore::with_incidents(vec![
        IncidentBuilder::new("a")
            .platform("Production")
            .resolved_after_minutes(60)
            .build(),
        IncidentBuilder::new("b").platform("Mobile").team("Network").build(),
        IncidentBuilder::new("c")
            .platform("Production")
            .created_at(base + chrono::Duration::days(1))
            .build(),
    ]);
    let service = Arc::new(DashboardService::new(Arc::new(store), None));
    service.refresh(chrono::Utc::now()).await.unwrap();
    let server = TestServer::start(service).await;

    let (_, stats) = server.get("/stats?platform=Mobile").await;
    assert_eq!(stats["data"]["totalIncidents"], 1);
    assert_eq!(stats["data"]["teamStats"][0]["name"], "Network");

    let (_, trend) = server.get("/stats/trend?platform=all").await;
    let points = trend["data"].as_array().unwrap();
    assert_eq!(points.len(), 2);
    assert_eq!(points[0]["total"], 2);
    assert_eq!(points[1]["total"], 1);

    let (_, platforms) = server.get("/platforms").await;
    assert_eq!(platforms["data"].as_array().unwrap().len(), 2);

    let response = server
        .client
        .get(format!("{}/stats/export?format=csv", server.base))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status().as_u16(), 200);
    assert_eq!(response.headers()["content-type"], "text/csv");
    let csv = response.text().await.unwrap();
    assert!(csv.starts_with("name,mttr,incidents,resolved,resolutionRate"));
    assert_eq!(csv.lines().count(), 3);

    let (status, _) = server.get("/stats/export?format=xml").await;
    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_open_incident_duration_is_in_progress_with_elapsed() {
    let mut open = IncidentBuilder::new("a").build();
    open.incident_start_time = Some(chrono::Utc::now() - chrono::Duration::minutes(90));
    let service = Arc::new(DashboardService::new(
        Arc::new(MemoryIncidentStore::with_incidents(vec![open])),
        None,
    ));
    let server = TestServer::start(service).await;

    let (status, body) = server.get("/incidents/a/duration").await;
    assert_eq!(status, 200);
    assert_eq!(body["data"]["state"], "in_progress");
    assert_eq!(body["data"]["text"], "in progress");
    assert!(body["data"]["elapsed"].as_str().unwrap().starts_with("1h 3"));
}
