use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
};
use chrono::{Duration, Utc};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tempfile::TempDir;
use tower::ServiceExt;

use beton_dispatch_server::{
    app,
    config::Config,
    db,
    handlers::AppState,
    models::{NewUser, ReferenceKind, Role},
    services::entry_service::PrepaymentSplit,
};

const PASSWORD: &str = "secret-pass";

struct TestApp {
    _dir: TempDir,
    state: AppState,
    router: Router,
}

impl TestApp {
    async fn new() -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = Config {
            server_host: "127.0.0.1".to_string(),
            server_port: 0,
            database_url: format!("sqlite://{}", dir.path().join("api.db").display()),
            jwt_secret: "api-test-secret".to_string(),
            jwt_expiration_hours: 12,
            share_base_url: "https://wa.me/".to_string(),
            prepayment_split: PrepaymentSplit::Even,
            admin_username: "admin".to_string(),
            admin_password: Some(PASSWORD.to_string()),
        };

        let pool = db::init_db_pool(&config.database_url)
            .await
            .expect("failed to init database");
        let state = AppState::new(pool, &config);
        state.auth.ensure_admin(&config).await.expect("failed to seed admin");

        for (username, role) in [
            ("director", Role::Director),
            ("accountant", Role::Accountant),
            ("operator", Role::Operator),
        ] {
            state
                .auth
                .register(&NewUser {
                    username: username.to_string(),
                    password: PASSWORD.to_string(),
                    role,
                })
                .await
                .expect("failed to seed user");
        }
        for driver in ["Ivan Ivanov", "Petr Petrov"] {
            state
                .references
                .add(ReferenceKind::Drivers, driver)
                .await
                .expect("failed to seed driver");
        }

        let router = app(state.clone());
        Self {
            _dir: dir,
            state,
            router,
        }
    }

    async fn request(
        &self,
        method: Method,
        uri: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }

        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(serde_json::to_vec(&json).expect("failed to serialize body"))
            }
            None => Body::empty(),
        };

        let response = self
            .router
            .clone()
            .oneshot(builder.body(body).expect("failed to build request"))
            .await
            .expect("router error");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("failed to read body")
            .to_bytes();
        (status, bytes.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>, token: Option<&str>) -> (StatusCode, Value) {
        let (status, bytes) = self.request(method, uri, body, token).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("response is not json")
        };
        (status, value)
    }

    async fn login(&self, username: &str) -> String {
        let (status, body) = self
            .json(
                Method::POST,
                "/api/auth/login",
                Some(json!({ "username": username, "password": PASSWORD })),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().expect("token missing").to_string()
    }
}

fn sample_order() -> Value {
    json!({
        "object": "ZhK Astana",
        "grade": "М300",
        "entries": [
            { "driver": "Ivan Ivanov", "volume": 10.0 },
            { "driver": "Petr Petrov", "volume": 5.0, "invoice": "17" },
            { "driver": "Ivan Ivanov", "volume": 0.0 }
        ],
        "unit_price": 5000.0,
        "prepaid_total": 30000.0
    })
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new().await;
    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"OK");
}

#[tokio::test]
async fn login_rejects_bad_credentials_uniformly() {
    let app = TestApp::new().await;

    let (wrong_status, wrong) = app
        .json(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "director", "password": "wrong-pass" })),
            None,
        )
        .await;
    let (unknown_status, unknown) = app
        .json(
            Method::POST,
            "/api/auth/login",
            Some(json!({ "username": "nobody", "password": PASSWORD })),
            None,
        )
        .await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong, unknown);
}

#[tokio::test]
async fn missing_or_expired_token_is_unauthorized() {
    let app = TestApp::new().await;

    let (status, _) = app.request(Method::GET, "/api/shipments", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (expired, _) = app
        .state
        .auth
        .issue_token_at("director", Role::Director, Utc::now() - Duration::hours(24))
        .expect("failed to issue token");
    let (status, _) = app
        .request(Method::GET, "/api/shipments", None, Some(&expired))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn batch_submission_creates_one_record_per_truck() {
    let app = TestApp::new().await;
    let token = app.login("director").await;

    let (status, receipt) = app
        .json(Method::POST, "/api/shipments", Some(sample_order()), Some(&token))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let records = receipt["records"].as_array().expect("records missing");
    assert_eq!(records.len(), 2);
    assert_eq!(records[0]["total"], 50000.0);
    assert_eq!(records[0]["paid"], 15000.0);
    assert_eq!(records[0]["debt"], 35000.0);
    assert_eq!(records[1]["debt"], 10000.0);
    assert_eq!(records[0]["batch_id"], records[1]["batch_id"]);

    let message = receipt["message"].as_str().expect("message missing");
    assert!(message.contains("🚛 Ivan Ivanov: *10 м³*\n"));
    assert!(message.contains("🚛 Petr Petrov: *5 м³* (№17)\n"));
    assert!(receipt["share_link"].as_str().unwrap().starts_with("https://wa.me/?text="));

    let batch_id = receipt["batch_id"].as_str().unwrap();
    let (status, again) = app
        .json(
            Method::GET,
            &format!("/api/batches/{}/message?phone=%2B77010000000", batch_id),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(again["message"], receipt["message"]);
    assert!(again["share_link"].as_str().unwrap().starts_with("https://wa.me/77010000000?text="));

    let (_, log) = app.json(Method::GET, "/api/shipments", None, Some(&token)).await;
    assert_eq!(log.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn invalid_batch_is_rejected_without_rows() {
    let app = TestApp::new().await;
    let token = app.login("director").await;

    let mut order = sample_order();
    order["object"] = json!("   ");
    let (status, body) = app
        .json(Method::POST, "/api/shipments", Some(order), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().is_some());

    let mut order = sample_order();
    order["entries"] = json!([{ "driver": "Ivan Ivanov", "volume": 0.0 }]);
    let (status, _) = app
        .json(Method::POST, "/api/shipments", Some(order), Some(&token))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, log) = app.json(Method::GET, "/api/shipments", None, Some(&token)).await;
    assert!(log.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn operator_sees_no_prices_and_cannot_delete() {
    let app = TestApp::new().await;
    let director = app.login("director").await;
    let operator = app.login("operator").await;

    let (_, receipt) = app
        .json(Method::POST, "/api/shipments", Some(sample_order()), Some(&director))
        .await;
    let id = receipt["records"][0]["id"].as_i64().unwrap();

    let (status, record) = app
        .json(Method::GET, &format!("/api/shipments/{}", id), None, Some(&operator))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(record["total"], 0.0);
    assert_eq!(record["volume"], 10.0);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/shipments/{}", id), None, Some(&operator))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::DELETE, &format!("/api/shipments/{}", id), None, Some(&director))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn export_is_a_csv_download() {
    let app = TestApp::new().await;
    let token = app.login("accountant").await;
    app.json(Method::POST, "/api/shipments", Some(sample_order()), Some(&token))
        .await;

    let response = app
        .router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/shipments/export")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION].to_str().unwrap();
    assert!(disposition.contains("otchet_beton_"));

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 3);
}

#[tokio::test]
async fn reference_and_user_management_is_role_gated() {
    let app = TestApp::new().await;
    let operator = app.login("operator").await;
    let admin = app.login("admin").await;

    let (status, _) = app
        .request(
            Method::POST,
            "/api/references/plants",
            Some(json!({ "name": "Plant 2" })),
            Some(&operator),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(
            Method::POST,
            "/api/references/plants",
            Some(json!({ "name": "Plant 2" })),
            Some(&admin),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, list) = app
        .json(Method::GET, "/api/references/plants", None, Some(&operator))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list["names"], json!(["Plant 2"]));

    let (status, _) = app.request(Method::GET, "/api/users", None, Some(&operator)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, users) = app.json(Method::GET, "/api/users", None, Some(&admin)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 4);

    let (status, _) = app
        .request(Method::DELETE, "/api/users/operator", None, Some(&admin))
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = app
        .request(Method::GET, "/api/shipments", None, Some(&operator))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_cannot_delete_own_account_under_any_casing() {
    let app = TestApp::new().await;
    app.state
        .auth
        .register(&NewUser {
            username: "Админ".to_string(),
            password: PASSWORD.to_string(),
            role: Role::Admin,
        })
        .await
        .expect("failed to seed user");
    let token = app.login("Админ").await;

    let shouted: String = url::form_urlencoded::byte_serialize("АДМИН".as_bytes()).collect();
    let (status, _) = app
        .request(Method::DELETE, &format!("/api/users/{}", shouted), None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = app.request(Method::GET, "/api/auth/me", None, Some(&token)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn load_report_groups_by_site_and_grade() {
    let app = TestApp::new().await;
    let token = app.login("director").await;
    app.json(Method::POST, "/api/shipments", Some(sample_order()), Some(&token))
        .await;

    let (status, loads) = app
        .json(Method::GET, "/api/reports/loads", None, Some(&token))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(loads[0]["label"], "ZhK Astana / М300");
    assert_eq!(loads[0]["trips"], 2);
    assert_eq!(loads[0]["volume"], 15.0);
}
