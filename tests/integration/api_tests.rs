//! API integration tests, driven in-process through the router

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use circulation_desk::{
    api::{self, Claims},
    models::Role,
    AppState,
};

use crate::{config_in, sample_library};

struct TestApp {
    _dir: TempDir,
    router: Router,
    state: AppState,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = config_in(dir.path());
        Self::with_config(dir, config)
    }

    /// Data directory path points at a regular file, so every save fails
    fn unwritable() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "").unwrap();
        let config = config_in(&blocker);
        Self::with_config(dir, config)
    }

    fn with_config(dir: TempDir, config: circulation_desk::AppConfig) -> Self {
        let state = AppState::new(config, sample_library());
        Self {
            router: api::router(state.clone()),
            state,
            _dir: dir,
        }
    }

    fn token(&self, username: &str, role: Role) -> String {
        Claims::new(username, role, 1)
            .create_token(&self.state.config.auth.jwt_secret)
            .unwrap()
    }

    async fn send(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = tokio_test::assert_ok!(self.router.clone().oneshot(request).await);
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }
}

#[tokio::test]
async fn test_health_check() {
    let app = TestApp::new();
    let (status, body) = app.send(Method::GET, "/api/v1/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["books"], 3);
}

#[tokio::test]
async fn test_login() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "alice-pw" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["token_type"], "Bearer");
    assert!(body["patron"].get("password").is_none());

    let token = body["token"].as_str().unwrap();
    let (status, me) = app.send(Method::GET, "/api/v1/auth/me", Some(token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["username"], "alice");
    assert_eq!(me["active_loans"], 0);
}

#[tokio::test]
async fn test_login_invalid_credentials() {
    let app = TestApp::new();
    let (status, body) = app
        .send(
            Method::POST,
            "/api/v1/auth/login",
            None,
            Some(json!({ "username": "alice", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["code"], 2);
}

#[tokio::test]
async fn test_requests_without_token_rejected() {
    let app = TestApp::new();
    let (status, _) = app.send(Method::GET, "/api/v1/books", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_catalog_writes_need_admin() {
    let app = TestApp::new();
    let book = json!({
        "isbn": "978-9",
        "title": "Kindred",
        "author": "Octavia Butler",
        "publisher": "Doubleday",
        "publish_year": 1979
    });

    let alice = app.token("alice", Role::Regular);
    let (status, _) = app
        .send(Method::POST, "/api/v1/books", Some(&alice), Some(book.clone()))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = app.token("admin", Role::Administrator);
    let (status, created) = app
        .send(Method::POST, "/api/v1/books", Some(&admin), Some(book.clone()))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["availability"], "available");

    let (status, _) = app
        .send(Method::POST, "/api/v1/books", Some(&admin), Some(book))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, body) = app
        .send(
            Method::PUT,
            "/api/v1/books/978-9",
            Some(&admin),
            Some(json!({ "field": "year", "value": "3000" })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], 18);

    assert!(app.state.config.storage.books_path().exists());
}

#[tokio::test]
async fn test_search_and_sort_books() {
    let app = TestApp::new();
    let alice = app.token("alice", Role::Regular);

    let (status, body) = app
        .send(Method::GET, "/api/v1/books?field=author&q=Austen", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["isbn"], "978-2");

    let (_, body) = app
        .send(Method::GET, "/api/v1/books?sort=year&order=desc", Some(&alice), None)
        .await;
    let years: Vec<i64> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|b| b["publish_year"].as_i64().unwrap())
        .collect();
    assert_eq!(years, vec![1965, 1961, 1815]);

    let (_, body) = app
        .send(Method::GET, "/api/v1/books/years?from=1900&to=2000", Some(&alice), None)
        .await;
    assert_eq!(body.as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn test_borrow_queue_and_return_flow() {
    let app = TestApp::new();
    let alice = app.token("alice", Role::Regular);
    let bob = app.token("bob", Role::Regular);

    let (status, body) = app
        .send(Method::POST, "/api/v1/loans", Some(&alice), Some(json!({ "isbn": "978-1" })))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["outcome"], "borrowed");
    assert_eq!(body["record_id"], 1);

    let (status, body) = app
        .send(Method::POST, "/api/v1/loans", Some(&bob), Some(json!({ "isbn": "978-1" })))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["outcome"], "queued");
    assert_eq!(body["position"], 1);

    let (status, body) = app.send(Method::GET, "/api/v1/queues/978-1", Some(&bob), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["position"], 1);
    assert!(body.get("patrons").is_none());

    // Bob may not return Alice's loan
    let (status, _) = app
        .send(Method::POST, "/api/v1/loans/REC000001/return", Some(&bob), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app
        .send(Method::POST, "/api/v1/loans/REC000001/return", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["promoted"]["username"], "bob");

    let (status, _) = app
        .send(Method::POST, "/api/v1/loans/1/renew", Some(&alice), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (_, body) = app.send(Method::GET, "/api/v1/loans", Some(&bob), None).await;
    let loans = body.as_array().unwrap();
    assert_eq!(loans.len(), 1);
    assert_eq!(loans[0]["record_id"], "REC000002");
    assert_eq!(loans[0]["status"], "active");
}

#[tokio::test]
async fn test_cancel_reservation() {
    let app = TestApp::new();
    let alice = app.token("alice", Role::Regular);
    let bob = app.token("bob", Role::Regular);

    app.send(Method::POST, "/api/v1/loans", Some(&alice), Some(json!({ "isbn": "978-3" })))
        .await;
    app.send(Method::POST, "/api/v1/loans", Some(&bob), Some(json!({ "isbn": "978-3" })))
        .await;

    let (status, _) = app.send(Method::DELETE, "/api/v1/queues/978-3", Some(&bob), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = app.send(Method::DELETE, "/api/v1/queues/978-3", Some(&bob), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_patron_with_loans_cannot_be_removed() {
    let app = TestApp::new();
    let admin = app.token("admin", Role::Administrator);

    app.send(
        Method::POST,
        "/api/v1/loans",
        Some(&admin),
        Some(json!({ "isbn": "978-2", "username": "alice" })),
    )
    .await;

    let (status, body) = app
        .send(Method::DELETE, "/api/v1/patrons/alice", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], 21);

    let (status, _) = app.send(Method::DELETE, "/api/v1/patrons/bob", Some(&admin), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_legacy_import_and_export() {
    let app = TestApp::new();
    let admin = app.token("admin", Role::Administrator);

    let body = "{'书名': '三体', '作者': '刘慈欣', '出版社': '重庆出版社', 'ISBN': '978-7', '出版年限': 2008}\n\
                broken line\n\
                {'isbn': '978-1', 'title': 'Dune', 'author': 'Herbert', 'publisher': 'Chilton', 'year': 1965}\n";
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/books/import")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .header(header::CONTENT_TYPE, "text/plain")
        .body(Body::from(body))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let report: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(report["total"], 3);
    assert_eq!(report["imported"], 1);

    let request = Request::builder()
        .uri("/api/v1/books/export")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert_eq!(text.lines().count(), 4);
    assert!(text.contains("'ISBN': '978-7'"));
    assert!(text.contains("'出版年限': 2008"));

    let request = Request::builder()
        .uri("/api/v1/books/export?keys=english")
        .header(header::AUTHORIZATION, format!("Bearer {}", admin))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("'isbn': '978-7'"));
}

#[tokio::test]
async fn test_failed_save_leaves_library_unchanged() {
    let app = TestApp::unwritable();
    let alice = app.token("alice", Role::Regular);
    let admin = app.token("admin", Role::Administrator);

    let (status, _) = app
        .send(Method::POST, "/api/v1/loans", Some(&alice), Some(json!({ "isbn": "978-1" })))
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let (status, _) = app
        .send(Method::DELETE, "/api/v1/books/978-2", Some(&admin), None)
        .await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

    let library = app.state.library.lock().await;
    assert!(library.circulation.is_empty());
    assert!(library.catalog.get("978-1").unwrap().is_available());
    assert_eq!(library.catalog.len(), 3);
}
