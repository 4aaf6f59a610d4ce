//! Integration tests for the fleet quote backend.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use reqwest::Client;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use crate::config::{Config, TextGenConfig};
use crate::db::{init_database, Repository};
use crate::message::TextGenerator;
use crate::search::SearchIndex;
use crate::{create_router, AppState};

const ADMIN_EMAIL: &str = "admin@fleet.test";
const ADMIN_PASSWORD: &str = "admin-password";

/// State over a fresh database with a bootstrap admin.
async fn test_state(temp_dir: &TempDir) -> AppState {
    let db_path = temp_dir.path().join("test.sqlite");
    let index_path = temp_dir.path().join("index");

    let pool = init_database(&db_path).await.expect("Failed to init DB");
    let repo = Arc::new(Repository::new(pool));
    repo.ensure_admin(ADMIN_EMAIL, ADMIN_PASSWORD)
        .await
        .expect("Failed to create admin");

    let search = Arc::new(SearchIndex::open(&index_path).expect("Failed to init search"));

    // No API key: observations always come from the local template
    let textgen = TextGenConfig::default();
    let config = Config {
        db_path,
        index_path,
        bind_addr: "127.0.0.1:0".parse().unwrap(),
        log_level: "warn".to_string(),
        log_json: false,
        session_ttl_hours: 1,
        admin_email: Some(ADMIN_EMAIL.to_string()),
        admin_password: Some(ADMIN_PASSWORD.to_string()),
        textgen: textgen.clone(),
    };

    AppState {
        repo,
        search,
        textgen: Arc::new(TextGenerator::new(textgen).expect("Failed to build generator")),
        config: Arc::new(config),
    }
}

/// Test fixture for integration tests.
struct TestFixture {
    client: Client,
    base_url: String,
    repo: Arc<Repository>,
    _temp_dir: TempDir,
}

impl TestFixture {
    /// Server with a bootstrap admin; `client` carries the admin session.
    async fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let state = test_state(&temp_dir).await;
        let repo = state.repo.clone();
        let app = create_router(state);

        // Bind to random port
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get addr");
        let base_url = format!("http://{}", addr);

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Wait for server to start
        tokio::time::sleep(tokio::time::Duration::from_millis(100)).await;

        let mut fixture = TestFixture {
            client: Client::new(),
            base_url,
            repo,
            _temp_dir: temp_dir,
        };
        let token = fixture.login(ADMIN_EMAIL, ADMIN_PASSWORD).await;
        fixture.client = fixture.client_for(&token);
        fixture
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Log in and return the session token.
    async fn login(&self, email: &str, password: &str) -> String {
        let resp = Client::new()
            .post(self.url("/api/auth/login"))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"]["token"].as_str().unwrap().to_string()
    }

    fn client_for(&self, token: &str) -> Client {
        let mut headers = reqwest::header::HeaderMap::new();
        headers.insert(
            reqwest::header::AUTHORIZATION,
            format!("Bearer {}", token).parse().unwrap(),
        );
        Client::builder().default_headers(headers).build().unwrap()
    }

    async fn create_report(&self, body: Value) -> Value {
        let resp = self
            .client
            .post(self.url("/api/reports"))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
        let body: Value = resp.json().await.unwrap();
        body["data"].clone()
    }

    async fn revision(&self) -> i64 {
        let resp = self
            .client
            .get(self.url("/api/snapshot/revision"))
            .send()
            .await
            .unwrap();
        let body: Value = resp.json().await.unwrap();
        body["data"]["revisionId"].as_i64().unwrap()
    }
}

fn report_body(request_date: &str, department: &str, supplier: &str, total: f64) -> Value {
    json!({
        "requestDate": request_date,
        "prefix": "3310",
        "department": department,
        "description": format!("Service for {}", department),
        "supplier": supplier,
        "approvalNumbers": "AP-1",
        "total": total
    })
}

#[tokio::test]
async fn test_health_check() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .get(fixture.url("/health"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_router_without_server() {
    let temp_dir = TempDir::new().unwrap();
    let app = create_router(test_state(&temp_dir).await);

    let resp = app
        .clone()
        .oneshot(Request::builder().uri("/api/branding").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app
        .oneshot(Request::builder().uri("/api/dashboard").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_missing_and_invalid_token() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/quotes"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    let resp = Client::new()
        .get(fixture.url("/api/quotes"))
        .header("x-session-token", "not-a-session")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_login_rejects_wrong_password() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": ADMIN_EMAIL, "password": "wrong-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
}

#[tokio::test]
async fn test_expired_session_is_rejected() {
    let fixture = TestFixture::new().await;

    let session = fixture.repo.create_session(ADMIN_EMAIL, -1).await.unwrap();
    let resp = fixture
        .client_for(&session.token)
        .get(fixture.url("/api/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");

    // The stale token stays dead
    assert!(fixture.repo.find_session(&session.token).await.unwrap().is_none());
}

#[tokio::test]
async fn test_unlisted_account_logs_in_as_buyer() {
    let fixture = TestFixture::new().await;
    fixture
        .repo
        .set_password("walkin@fleet.test", "walkin-password")
        .await
        .unwrap();

    let resp = Client::new()
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "walkin@fleet.test", "password": "walkin-password" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["role"], "buyer");
    assert_eq!(body["data"]["defaultView"], "quotes");

    let buyer = fixture.client_for(body["data"]["token"].as_str().unwrap());
    let resp = buyer.get(fixture.url("/api/quotes")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let resp = buyer.get(fixture.url("/api/reports")).send().await.unwrap();
    assert_eq!(resp.status(), 403);
}

#[tokio::test]
async fn test_login_me_and_logout() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .post(fixture.url("/api/auth/login"))
        .json(&json!({ "email": "  Admin@Fleet.test ", "password": ADMIN_PASSWORD }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["email"], ADMIN_EMAIL);
    assert_eq!(body["data"]["user"]["role"], "admin");
    assert_eq!(body["data"]["defaultView"], "dashboard");
    assert_eq!(body["data"]["views"].as_array().unwrap().len(), 8);
    assert!(body["data"]["expiresAt"].is_string());

    let token = body["data"]["token"].as_str().unwrap();
    let client = fixture.client_for(token);

    let resp = client.get(fixture.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["user"]["role"], "admin");

    let resp = client
        .post(fixture.url("/api/auth/logout"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(fixture.url("/api/auth/me")).send().await.unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_branding_is_public_and_editable() {
    let fixture = TestFixture::new().await;

    let resp = Client::new()
        .get(fixture.url("/api/branding"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Fleet Desk");

    let resp = fixture
        .client
        .put(fixture.url("/api/settings/branding"))
        .json(&json!({ "name": "North Depot", "accentColor": "teal" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .put(fixture.url("/api/settings/branding"))
        .json(&json!({ "name": "North Depot", "subtitle": "Workshop", "accentColor": "#00aa88" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["accentColor"], "#00AA88");
    assert_eq!(body["data"]["users"][0]["email"], ADMIN_EMAIL);
}

#[tokio::test]
async fn test_compose_uses_fallback_without_key() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/quotes/compose"))
        .json(&json!({
            "quoteType": "request",
            "supplierName": "Brakes Inc",
            "supplierPhone": "+55 (11) 99999-0000",
            "prefix": "3310",
            "firstQuoteNumber": "Q-10",
            "description": "  replace   front brake pads "
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["source"], "fallback");
    assert_eq!(data["observation"], "Replace front brake pads.");
    assert!(data["message"]
        .as_str()
        .unwrap()
        .starts_with("*QUOTE REQUEST*\n\nSupplier: Brakes Inc\nPrefix: 3310\nQuote no.: Q-10"));
    assert!(data["whatsappUrl"]
        .as_str()
        .unwrap()
        .starts_with("https://wa.me/5511999990000?text="));

    // Nothing persisted
    let resp = fixture
        .client
        .get(fixture.url("/api/quotes"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_quote_crud() {
    let fixture = TestFixture::new().await;

    let create_resp = fixture
        .client
        .post(fixture.url("/api/quotes"))
        .json(&json!({
            "quoteType": "request",
            "supplierName": "Glass Co",
            "supplierPhone": "5511988887777",
            "prefix": "4120",
            "description": "cracked windshield"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(create_resp.status(), 200);
    let body: Value = create_resp.json().await.unwrap();
    let quote_id = body["data"]["id"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["observation"], "Cracked windshield.");

    // Filter by type
    let resp = fixture
        .client
        .get(fixture.url("/api/quotes?type=approval"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    let resp = fixture
        .client
        .get(fixture.url("/api/quotes?supplier=glass"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // Update with an explicit observation
    let update_resp = fixture
        .client
        .put(fixture.url(&format!("/api/quotes/{}", quote_id)))
        .json(&json!({
            "quoteType": "approval",
            "supplierName": "Glass Co",
            "supplierPhone": "5511988887777",
            "prefix": "4120",
            "firstQuoteNumber": "778",
            "observation": "Approved as discussed."
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(update_resp.status(), 200);
    let body: Value = update_resp.json().await.unwrap();
    assert_eq!(body["data"]["quoteType"], "approval");
    assert_eq!(body["data"]["observation"], "Approved as discussed.");

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/quotes/{}/message", quote_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["source"], "stored");
    let message = body["data"]["message"].as_str().unwrap();
    assert!(message.starts_with("*QUOTE APPROVED*"));
    assert!(message.contains("Observation: Approved as discussed."));
    assert!(message.ends_with("Please proceed with the service as quoted."));

    // Delete
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/quotes/{}", quote_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/quotes/{}", quote_id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_quote_requires_supplier() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/quotes"))
        .json(&json!({ "quoteType": "request", "supplierName": "  ", "prefix": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_report_crud_filter_and_group() {
    let fixture = TestFixture::new().await;

    let first = fixture
        .create_report(report_body("2024-03-01", "Workshop", "Brakes Inc", 120.0))
        .await;
    fixture
        .create_report(report_body("2024-03-05", "Workshop", "Glass Co", 80.5))
        .await;
    fixture
        .create_report(report_body("2024-04-02", "Logistics", "Brakes Inc", 40.0))
        .await;
    assert_eq!(first["deliveryStatus"], "Pending");

    let resp = fixture
        .client
        .get(fixture.url("/api/reports?department=Workshop&sort=total&order=asc"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let records = body["data"].as_array().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["supplier"], "Glass Co");

    let resp = fixture
        .client
        .get(fixture.url("/api/reports?from=2024-04-01"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    let resp = fixture
        .client
        .get(fixture.url("/api/reports/grouped?by=supplier"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let groups = body["data"].as_array().unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(groups[0]["key"], "Brakes Inc");
    assert_eq!(groups[0]["count"], 2);
    assert_eq!(groups[0]["total"], 160.0);

    // Update
    let id = first["id"].as_str().unwrap();
    let mut body = report_body("2024-03-01", "Workshop", "Brakes Inc", 150.0);
    body["invoice"] = json!("NF-991");
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/reports/{}", id)))
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 150.0);
    assert_eq!(body["data"]["invoice"], "NF-991");

    // Delete
    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/reports/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/reports/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_report_validation() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/reports"))
        .json(&report_body("01/03/2024", "Workshop", "Brakes Inc", 10.0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .post(fixture.url("/api/reports"))
        .json(&report_body("2024-03-01", "Workshop", "Brakes Inc", -1.0))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_protocol_workflow() {
    let fixture = TestFixture::new().await;

    let a = fixture
        .create_report(report_body("2024-02-10", "Workshop", "Brakes Inc", 10.0))
        .await;
    let b = fixture
        .create_report(report_body("2024-01-15", "Workshop", "Glass Co", 20.0))
        .await;
    let a_id = a["id"].as_str().unwrap();
    let b_id = b["id"].as_str().unwrap();

    let resp = fixture
        .client
        .get(fixture.url("/api/protocol/pending"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"][0]["id"], b_id);

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/reports/{}/delivery", a_id)))
        .json(&json!({ "deliveryStatus": "Delivered" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["deliveryStatus"], "Delivered");
    assert!(body["data"]["protocoledAt"].is_null());

    // Unknown id aborts the whole batch
    let resp = fixture
        .client
        .post(fixture.url("/api/protocol/confirm"))
        .json(&json!({ "ids": [a_id, "missing"] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/reports/{}", a_id)))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["deliveryStatus"], "Delivered");

    let resp = fixture
        .client
        .post(fixture.url("/api/protocol/confirm"))
        .json(&json!({ "ids": [a_id, b_id] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    for record in body["data"].as_array().unwrap() {
        assert_eq!(record["deliveryStatus"], "Protocoled");
        assert_eq!(record["protocoledBy"], ADMIN_EMAIL);
        assert!(record["protocoledAt"].is_string());
    }

    let resp = fixture
        .client
        .get(fixture.url("/api/protocol/pending"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"].as_array().unwrap().is_empty());

    // Moving away clears the stamps
    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/reports/{}/delivery", b_id)))
        .json(&json!({ "deliveryStatus": "Pending" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert!(body["data"]["protocoledBy"].is_null());

    let resp = fixture
        .client
        .post(fixture.url("/api/protocol/confirm"))
        .json(&json!({ "ids": [] }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_role_restricts_views() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .json(&json!({
            "email": " Clerk@Fleet.test",
            "role": "clerk",
            "password": "clerk-password"
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let token = fixture.login("clerk@fleet.test", "clerk-password").await;
    let clerk = fixture.client_for(&token);

    let resp = clerk.get(fixture.url("/api/auth/me")).send().await.unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["views"], json!(["protocol", "reports"]));
    assert_eq!(body["data"]["defaultView"], "protocol");

    let resp = clerk.get(fixture.url("/api/quotes")).send().await.unwrap();
    assert_eq!(resp.status(), 403);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let resp = clerk.get(fixture.url("/api/users")).send().await.unwrap();
    assert_eq!(resp.status(), 403);

    let resp = clerk
        .get(fixture.url("/api/protocol/pending"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    // Removing the user ends their sessions
    let resp = fixture
        .client
        .delete(fixture.url("/api/users/clerk@fleet.test"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = clerk
        .get(fixture.url("/api/protocol/pending"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 401);
}

#[tokio::test]
async fn test_users_guard_last_admin() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .json(&json!({ "email": ADMIN_EMAIL, "role": "buyer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/users/{}", ADMIN_EMAIL)))
        .json(&json!({ "role": "manager" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/users/{}", ADMIN_EMAIL)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .put(fixture.url("/api/users/nobody@fleet.test"))
        .json(&json!({ "role": "buyer" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);

    let resp = fixture
        .client
        .post(fixture.url("/api/users"))
        .json(&json!({ "email": "buyer@fleet.test", "role": "buyer", "password": "short" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
}

#[tokio::test]
async fn test_supplier_crud() {
    let fixture = TestFixture::new().await;

    let resp = fixture
        .client
        .post(fixture.url("/api/suppliers"))
        .json(&json!({ "name": "Tyre World", "phone": "5511900001111" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let resp = fixture
        .client
        .put(fixture.url(&format!("/api/suppliers/{}", id)))
        .json(&json!({ "name": "Tyre World Ltd", "phone": "5511900001111" }))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["name"], "Tyre World Ltd");

    let resp = fixture
        .client
        .post(fixture.url("/api/suppliers"))
        .json(&json!({ "name": "", "phone": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .delete(fixture.url(&format!("/api/suppliers/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/suppliers/{}", id)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_report_items_and_options() {
    let fixture = TestFixture::new().await;

    for (category, value) in [
        ("department", "Workshop"),
        ("department", "Logistics"),
        ("supplier", "Brakes Inc"),
        ("delivery", "Delivered"),
    ] {
        let resp = fixture
            .client
            .post(fixture.url("/api/report-items"))
            .json(&json!({ "category": category, "value": value }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 200);
    }

    let resp = fixture
        .client
        .post(fixture.url("/api/report-items"))
        .json(&json!({ "category": "delivery", "value": "Lost" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    let resp = fixture
        .client
        .get(fixture.url("/api/report-items?category=department"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let resp = fixture
        .client
        .get(fixture.url("/api/report-items/options"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["department"], json!(["Logistics", "Workshop"]));
    assert_eq!(body["data"]["supplier"], json!(["Brakes Inc"]));
    assert_eq!(body["data"]["delivery"], json!(["Delivered"]));
}

#[tokio::test]
async fn test_search_reports() {
    let fixture = TestFixture::new().await;

    let mut body = report_body("2024-05-01", "Workshop", "Glass Co", 300.0);
    body["description"] = json!("Windshield replacement on unit 3310");
    fixture.create_report(body).await;
    fixture
        .create_report(report_body("2024-05-02", "Logistics", "Brakes Inc", 90.0))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=windshield"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["results"][0]["report"]["supplier"], "Glass Co");

    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=brakes&limit=500"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["limit"], 100);
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_search_paging_edges() {
    let fixture = TestFixture::new().await;
    fixture
        .create_report(report_body("2024-05-02", "Logistics", "Brakes Inc", 90.0))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=brakes&limit=0"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["limit"], 1);
    assert_eq!(body["data"]["total"], 1);

    let resp = fixture
        .client
        .get(fixture.url(&format!("/api/search?q=brakes&offset={}", usize::MAX)))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);
    assert!(body["data"]["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_dashboard_summary() {
    let fixture = TestFixture::new().await;

    fixture
        .create_report(report_body("2024-05-01", "Workshop", "Glass Co", 100.0))
        .await;
    fixture
        .create_report(report_body("2024-05-02", "Workshop", "Brakes Inc", 50.0))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/dashboard"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let data = &body["data"];
    assert_eq!(data["reportCount"], 2);
    assert_eq!(data["byDeliveryStatus"][0]["deliveryStatus"], "Pending");
    assert_eq!(data["byDeliveryStatus"][0]["count"], 2);
    assert_eq!(data["byDepartment"][0]["department"], "Workshop");
    assert_eq!(data["byDepartment"][0]["total"], 150.0);
    assert_eq!(data["quotes"]["request"], 0);
}

#[tokio::test]
async fn test_snapshot_round_trip() {
    let fixture = TestFixture::new().await;

    let mut body = report_body("2024-06-01", "Workshop", "Glass Co", 10.0);
    body["description"] = json!("Mirror replacement");
    fixture.create_report(body).await;

    let resp = fixture
        .client
        .get(fixture.url("/api/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    let snapshot = body["data"].clone();
    assert_eq!(snapshot["reports"].as_array().unwrap().len(), 1);

    // A snapshot without an admin is refused
    let mut no_admin = snapshot.clone();
    no_admin["settings"]["users"] = json!([]);
    let resp = fixture
        .client
        .put(fixture.url("/api/snapshot"))
        .json(&no_admin)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Wipe the reports, then restore them
    let mut empty = snapshot.clone();
    empty["reports"] = json!([]);
    let resp = fixture
        .client
        .put(fixture.url("/api/snapshot"))
        .json(&empty)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=mirror"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 0);

    let resp = fixture
        .client
        .put(fixture.url("/api/snapshot"))
        .json(&snapshot)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let resp = fixture
        .client
        .get(fixture.url("/api/search?q=mirror"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["total"], 1);
}

#[tokio::test]
async fn test_snapshot_import_is_validated() {
    let fixture = TestFixture::new().await;
    fixture
        .create_report(report_body("2024-06-01", "Workshop", "Glass Co", 10.0))
        .await;

    let resp = fixture
        .client
        .get(fixture.url("/api/snapshot"))
        .send()
        .await
        .unwrap();
    let body: Value = resp.json().await.unwrap();
    let snapshot = body["data"].clone();
    let before = fixture.revision().await;

    let mut case_variants = snapshot.clone();
    case_variants["settings"]["users"] = json!([
        { "email": ADMIN_EMAIL, "role": "admin", "addedAt": "2024-01-01T00:00:00Z" },
        { "email": "Admin@Fleet.test", "role": "admin", "addedAt": "2024-01-01T00:00:00Z" }
    ]);

    let mut duplicated = snapshot.clone();
    duplicated["settings"]["users"] = json!([
        { "email": ADMIN_EMAIL, "role": "admin", "addedAt": "2024-01-01T00:00:00Z" },
        { "email": ADMIN_EMAIL, "role": "buyer", "addedAt": "2024-01-01T00:00:00Z" }
    ]);

    let mut importer_demoted = snapshot.clone();
    importer_demoted["settings"]["users"] = json!([
        { "email": ADMIN_EMAIL, "role": "buyer", "addedAt": "2024-01-01T00:00:00Z" },
        { "email": "other@fleet.test", "role": "admin", "addedAt": "2024-01-01T00:00:00Z" }
    ]);

    let mut bad_report = snapshot.clone();
    bad_report["reports"][0]["requestDate"] = json!("01/06/2024");

    let mut negative_total = snapshot.clone();
    negative_total["reports"][0]["total"] = json!(-5.0);

    let mut bad_item = snapshot.clone();
    bad_item["reportItems"] = json!([{
        "id": "i1",
        "category": "delivery",
        "value": "Lost",
        "createdAt": "2024-01-01T00:00:00Z"
    }]);

    let mut bad_branding = snapshot.clone();
    bad_branding["settings"]["name"] = json!("");
    bad_branding["settings"]["accentColor"] = json!("red");

    let mut nameless_supplier = snapshot.clone();
    nameless_supplier["suppliers"] = json!([{
        "id": "s1",
        "name": " ",
        "phone": "",
        "createdAt": "2024-01-01T00:00:00Z"
    }]);

    for invalid in [
        case_variants,
        duplicated,
        importer_demoted,
        bad_report,
        negative_total,
        bad_item,
        bad_branding,
        nameless_supplier,
    ] {
        let resp = fixture
            .client
            .put(fixture.url("/api/snapshot"))
            .json(&invalid)
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), 400);
        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    // Nothing was written and the importer is still an admin
    assert_eq!(fixture.revision().await, before);
    let resp = fixture
        .client
        .get(fixture.url("/api/snapshot"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["data"]["reports"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_revision_increments_on_write() {
    let fixture = TestFixture::new().await;

    let before = fixture.revision().await;
    fixture
        .create_report(report_body("2024-06-01", "Workshop", "Glass Co", 10.0))
        .await;
    let after_create = fixture.revision().await;
    assert!(after_create > before);

    // Reads leave it alone
    fixture
        .client
        .get(fixture.url("/api/reports"))
        .send()
        .await
        .unwrap();
    assert_eq!(fixture.revision().await, after_create);
}
