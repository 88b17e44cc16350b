mod common;

use axum::http::StatusCode;
use serde_json::{Value, json};

#[tokio::test]
async fn test_list_without_cookie_unauthorized() {
    let server = common::memory_server();

    let response = server.get("/api/user/urls").await;

    response.assert_status(StatusCode::UNAUTHORIZED);
    assert!(common::issued_cookie(&response).starts_with("user_id="));
}

#[tokio::test]
async fn test_list_empty_no_content() {
    let server = common::memory_server();

    let response = server
        .get("/api/user/urls")
        .add_header("Cookie", common::identity_cookie("alice").as_str())
        .await;

    response.assert_status(StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_list_returns_only_own_mappings() {
    let server = common::memory_server();
    let alice = common::identity_cookie("alice");
    let bob = common::identity_cookie("bob");

    let first = server
        .post("/")
        .add_header("Cookie", alice.as_str())
        .text("https://one.example.com")
        .await
        .text();
    server
        .post("/api/shorten")
        .add_header("Cookie", alice.as_str())
        .json(&json!({ "url": "https://two.example.com" }))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/")
        .add_header("Cookie", bob.as_str())
        .text("https://three.example.com")
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .get("/api/user/urls")
        .add_header("Cookie", alice.as_str())
        .await;

    response.assert_status_ok();
    let items = response.json::<Vec<Value>>();
    assert_eq!(items.len(), 2);
    assert!(
        items
            .iter()
            .any(|i| i["short_url"] == first.as_str() && i["original_url"] == "https://one.example.com")
    );
    assert!(items.iter().all(|i| i["original_url"] != "https://three.example.com"));
}

#[tokio::test]
async fn test_cookie_issued_on_create_lists_mapping() {
    let server = common::memory_server();

    let created = server.post("/").text("https://example.com").await;
    let cookie = common::issued_cookie(&created);

    let response = server
        .get("/api/user/urls")
        .add_header("Cookie", cookie.as_str())
        .await;

    response.assert_status_ok();
    let items = response.json::<Vec<Value>>();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0]["short_url"], created.text().as_str());
}

#[tokio::test]
async fn test_list_response_is_gzipped_on_request() {
    let server = common::memory_server();
    let cookie = common::identity_cookie("alice");

    for i in 0..5 {
        server
            .post("/")
            .add_header("Cookie", cookie.as_str())
            .text(format!("https://example.com/page/{i}"))
            .await
            .assert_status(StatusCode::CREATED);
    }

    let response = server
        .get("/api/user/urls")
        .add_header("Cookie", cookie.as_str())
        .add_header("Accept-Encoding", "gzip")
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-encoding"), "gzip");
}

#[tokio::test]
async fn test_delete_is_accepted() {
    let server = common::memory_server();
    let cookie = common::identity_cookie("alice");

    let short_url = server
        .post("/")
        .add_header("Cookie", cookie.as_str())
        .text("https://example.com")
        .await
        .text();

    let response = server
        .delete("/api/user/urls")
        .add_header("Cookie", cookie.as_str())
        .json(&json!([common::code_of(&short_url)]))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_delete_without_cookie_is_accepted() {
    let server = common::memory_server();

    let response = server
        .delete("/api/user/urls")
        .json(&json!(["abc123"]))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
}

#[tokio::test]
async fn test_delete_invalid_body() {
    let server = common::memory_server();

    let response = server
        .delete("/api/user/urls")
        .add_header("Cookie", common::identity_cookie("alice").as_str())
        .json(&json!({ "codes": "abc123" }))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}
