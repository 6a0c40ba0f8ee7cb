//! End-to-end checks of the HTTP surface: envelope shape, status/error codes
//! and request parsing.

mod common;

use axum::http::StatusCode;
use common::{json_request, setup_router, ADMIN, ALICE, BOB};
use serde_json::{json, Value};

async fn tag_id(router: &axum::Router, query: &str) -> String {
    let (status, body) = json_request(router, "GET", &format!("/api/tags?{query}"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    body["data"][0]["id"].as_str().expect("tag id").to_string()
}

async fn vm_id(router: &axum::Router, name: &str) -> String {
    let (_, body) = json_request(router, "GET", "/api/vms", None).await;
    body["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|vm| vm["name"] == name)
        .and_then(|vm| vm["id"].as_str())
        .expect("vm id")
        .to_string()
}

#[tokio::test]
async fn test_health() {
    let (router, _db) = setup_router().await;
    let response = tower::ServiceExt::oneshot(
        router,
        axum::http::Request::builder()
            .uri("/api/health")
            .body(axum::body::Body::empty())
            .unwrap(),
    )
    .await
    .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_list_users() {
    let (router, _db) = setup_router().await;
    let (status, body) = json_request(&router, "GET", "/api/users", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "success");
    assert_eq!(body["errorCode"], 0);
    assert_eq!(body["data"][0], json!({ "userId": ADMIN, "userName": "admin" }));
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_and_list_tags() {
    let (router, _db) = setup_router().await;

    let (status, body) = json_request(
        &router,
        "POST",
        "/api/tags",
        Some(json!({ "tag_name": "env", "scope": "prod", "user_id": ALICE })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["status"], "success");
    assert_eq!(body["data"], "");

    let (status, body) = json_request(
        &router,
        "POST",
        "/api/tags",
        Some(json!({ "tag_name": "env", "scope": "prod", "user_id": BOB })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["status"], "error");
    assert_eq!(body["errorCode"], 102);
    assert_eq!(body["data"], Value::Null);

    let (status, body) = json_request(
        &router,
        "POST",
        "/api/tags",
        Some(json!({ "tag_name": "env", "scope": "", "user_id": BOB })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = json_request(&router, "GET", "/api/tags?tag_name=env&scope=prod", None).await;
    assert_eq!(status, StatusCode::OK);
    let tags = body["data"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["name"], "env");
    assert_eq!(tags[0]["scope"], "prod");
    assert_eq!(tags[0]["userId"], ALICE);

    let (_, body) = json_request(&router, "GET", "/api/tags?scope=", None).await;
    let tags = body["data"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["scope"], Value::Null);

    let (_, body) = json_request(&router, "GET", &format!("/api/tags?user_id={BOB}"), None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_tag_rejects_bad_input() {
    let (router, _db) = setup_router().await;

    let (status, body) =
        json_request(&router, "POST", "/api/tags", Some(json!({ "scope": "prod", "user_id": ALICE }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 103);

    let (status, body) = json_request(&router, "POST", "/api/tags", Some(json!({ "tag_name": "env" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 103);

    let (status, body) =
        json_request(&router, "POST", "/api/tags", Some(json!({ "tag_name": "env", "user_id": 99 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], 100);

    let (status, body) = json_request(&router, "GET", "/api/tags?tag_id=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 103);
}

#[tokio::test]
async fn test_delete_tag_codes() {
    let (router, _db) = setup_router().await;
    json_request(
        &router,
        "POST",
        "/api/tags",
        Some(json!({ "tag_name": "env", "user_id": ALICE })),
    )
    .await;
    let id = tag_id(&router, "tag_name=env").await;

    let (status, body) = json_request(&router, "DELETE", &format!("/api/tags?user_id={ALICE}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 100);

    let (_, body) = json_request(&router, "DELETE", &format!("/api/tags?tag_id=None&user_id={ALICE}"), None).await;
    assert_eq!(body["errorCode"], 100);

    let (status, body) = json_request(&router, "DELETE", &format!("/api/tags?tag_id={id}"), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 400);

    let (status, body) =
        json_request(&router, "DELETE", &format!("/api/tags?tag_id={id}&user_id={BOB}"), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["errorCode"], 100);

    json_request(&router, "POST", "/api/vms", Some(json!({ "vm_name": "web-1" }))).await;
    let vm = vm_id(&router, "web-1").await;
    let (status, _) = json_request(
        &router,
        "POST",
        "/api/tags/assignments",
        Some(json!({ "action": "assign", "tag_name": "env", "vm_ids": [vm] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        json_request(&router, "DELETE", &format!("/api/tags/{id}?user_id={ADMIN}"), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errorCode"], 101);

    let (status, _) = json_request(&router, "DELETE", &format!("/api/vms/{vm}"), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) =
        json_request(&router, "DELETE", &format!("/api/tags/{id}?user_id={ADMIN}"), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "success");

    let (status, body) =
        json_request(&router, "DELETE", &format!("/api/tags?tag_id={id}&user_id={ALICE}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], 100);
}

#[tokio::test]
async fn test_assignment_codes() {
    let (router, _db) = setup_router().await;
    json_request(&router, "POST", "/api/vms", Some(json!({ "vm_name": "web-1" }))).await;
    let vm = vm_id(&router, "web-1").await;

    let (status, body) = json_request(
        &router,
        "POST",
        "/api/tags/assignments",
        Some(json!({ "action": "toggle", "tag_name": "env", "vm_ids": [vm] })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 108);

    let (status, body) = json_request(
        &router,
        "POST",
        "/api/tags/assignments",
        Some(json!({ "action": "assign", "tag_name": "env", "vm_ids": [vm] })),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], 404);

    json_request(
        &router,
        "POST",
        "/api/tags",
        Some(json!({ "tag_name": "env", "user_id": ALICE })),
    )
    .await;
    for _ in 0..2 {
        let (status, body) = json_request(
            &router,
            "POST",
            "/api/tags/assignments",
            Some(json!({ "action": "assign", "tag_name": "env", "vm_ids": [vm] })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (_, body) = json_request(&router, "GET", "/api/vms?tag_name=env", None).await;
    let vms = body["data"].as_array().unwrap();
    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0]["tags"].as_array().unwrap().len(), 1);

    let (status, _) = json_request(
        &router,
        "POST",
        "/api/tags/assignments",
        Some(json!({ "action": "unassign", "tag_name": "env", "vm_ids": [vm] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = json_request(&router, "GET", "/api/vms?tag_name=env", None).await;
    assert!(body["data"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_vm_lifecycle() {
    let (router, _db) = setup_router().await;

    let (status, body) = json_request(
        &router,
        "POST",
        "/api/vms",
        Some(json!({ "vm_name": "db-1", "tag_name": "role", "scope": "db", "user_id": ALICE })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");

    let (status, body) = json_request(&router, "POST", "/api/vms", Some(json!({ "vm_name": "db-1" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["errorCode"], 102);

    let (status, body) = json_request(&router, "POST", "/api/vms", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorCode"], 103);

    let (_, body) = json_request(&router, "GET", "/api/vms?scope=db", None).await;
    let vms = body["data"].as_array().unwrap();
    assert_eq!(vms.len(), 1);
    assert_eq!(vms[0]["name"], "db-1");
    assert_eq!(vms[0]["tags"][0]["name"], "role");
    assert!(vms[0]["createdAt"].is_string());
    let vm = vms[0]["id"].as_str().unwrap().to_string();

    json_request(
        &router,
        "POST",
        "/api/tags",
        Some(json!({ "tag_name": "env", "scope": "prod", "user_id": BOB })),
    )
    .await;
    let env = tag_id(&router, "tag_name=env").await;

    let (status, body) =
        json_request(&router, "PUT", &format!("/api/vms/{vm}"), Some(json!({ "tag_ids": [env] }))).await;
    assert_eq!(status, StatusCode::OK, "{body}");

    let (_, body) = json_request(&router, "GET", "/api/vms", None).await;
    let tags = body["data"][0]["tags"].as_array().unwrap();
    assert_eq!(tags.len(), 1);
    assert_eq!(tags[0]["name"], "env");

    let (status, body) =
        json_request(&router, "PUT", "/api/vms/not-a-uuid", Some(json!({ "tag_ids": [] }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], 100);

    let (status, _) = json_request(&router, "DELETE", &format!("/api/vms/{vm}"), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = json_request(&router, "DELETE", &format!("/api/vms/{vm}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["errorCode"], 100);
}

#[tokio::test]
async fn test_malformed_json_is_invalid_input() {
    let (router, _db) = setup_router().await;
    let request = axum::http::Request::builder()
        .method("POST")
        .uri("/api/tags")
        .header("Content-Type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(router, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

async fn message_in(router: &axum::Router, accept_language: &str) -> String {
    use http_body_util::BodyExt;

    let request = axum::http::Request::builder()
        .uri("/api/users")
        .header("Accept-Language", accept_language)
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(router.clone(), request).await.unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    body["message"].as_str().unwrap().to_string()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_requests_keep_their_own_language() {
    let (router, _db) = setup_router().await;

    let mut handles = Vec::new();
    for i in 0..20 {
        let router = router.clone();
        let language = if i % 2 == 0 { "zh-CN" } else { "en-US,en;q=0.9" };
        handles.push(tokio::spawn(async move { (language, message_in(&router, language).await) }));
    }

    for handle in handles {
        let (language, message) = handle.await.unwrap();
        let expected = if language == "zh-CN" {
            "获取用户成功"
        } else {
            "Users retrieved successfully"
        };
        assert_eq!(message, expected, "Accept-Language: {language}");
    }
}
