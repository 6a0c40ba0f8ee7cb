//! Shared fixtures: an in-memory SQLite database with the schema applied and a
//! few seeded users, plus a JSON request helper for router tests.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceExt;

use vmtags::db::migrations;
use vmtags::db::services::user_service;
use vmtags::server::config::ServerConfig;
use vmtags::web::create_axum_router;

pub const ADMIN: i32 = 1;
pub const ALICE: i32 = 2;
pub const BOB: i32 = 3;

/// Every test gets its own private database. A single pooled connection keeps
/// the in-memory database alive for the whole test.
pub async fn setup_db() -> DatabaseConnection {
    let mut opt = ConnectOptions::new("sqlite::memory:");
    opt.max_connections(1).min_connections(1).sqlx_logging(false);
    let db = Database::connect(opt).await.expect("connect to in-memory sqlite");

    migrations::run(&db).await.expect("apply migrations");
    for (id, name) in [(ADMIN, "admin"), (ALICE, "alice"), (BOB, "bob")] {
        user_service::upsert_user(&db, id, name).await.expect("seed user");
    }
    db
}

pub async fn setup_router() -> (axum::Router, DatabaseConnection) {
    let db = setup_db().await;
    let config = Arc::new(ServerConfig::with_database_url("sqlite::memory:"));
    (create_axum_router(db.clone(), config), db)
}

pub async fn json_request(
    router: &axum::Router,
    method: &str,
    uri: &str,
    body: Option<serde_json::Value>,
) -> (StatusCode, serde_json::Value) {
    let mut builder = Request::builder().method(method).uri(uri);

    let body = match body {
        Some(v) => {
            builder = builder.header("Content-Type", "application/json");
            Body::from(serde_json::to_vec(&v).unwrap())
        }
        None => Body::empty(),
    };

    let request = builder.body(body).unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();

    let body_bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body_json: serde_json::Value = if body_bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&body_bytes).unwrap_or(serde_json::Value::Null)
    };

    (status, body_json)
}
