use std::collections::HashMap;
use std::sync::Arc;

use featureswitch_cli::server::routes::{ItemResponse, ListResponse, PROCESSED_MESSAGE};
use featureswitch_cli::{build_router, AppState};
use featureswitch_lib::{FeatureStore, MemoryStore, RetryPolicy, SledStore};
use reqwest::{Client, StatusCode};
use serde_json::json;

/// Spin up the HTTP server on an OS-assigned port, returning the base URL.
async fn spawn_server(store: Arc<dyn FeatureStore>) -> String {
    let app = build_router(Arc::new(AppState::new(store)));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://127.0.0.1:{}", port)
}

async fn spawn_test_server() -> String {
    spawn_server(Arc::new(MemoryStore::new())).await
}

async fn create(client: &Client, base: &str, name: &str, friendly_id: i64) -> String {
    let resp = client
        .post(format!("{}/features", base))
        .json(&json!({"name": name, "friendlyId": friendly_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json::<String>().await.unwrap()
}

#[tokio::test]
async fn add_duplicate_delete_get_scenario() {
    let base = spawn_test_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{}/features", base))
        .json(&json!({"name": "X", "friendlyId": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let location = resp.headers()["location"].to_str().unwrap().to_string();
    let id: String = resp.json().await.unwrap();
    assert_eq!(location, format!("/features/{}", id));

    let resp = client
        .post(format!("{}/features", base))
        .json(&json!({"name": "Other", "friendlyId": 1}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: HashMap<String, String> = resp.json().await.unwrap();
    assert!(errors.contains_key("friendlyId"));

    let resp = client
        .delete(format!("{}/features/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{}/features/{}", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn duplicate_name_reports_name_field() {
    let base = spawn_test_server().await;
    let client = Client::new();
    create(&client, &base, "X", 1).await;

    let resp = client
        .post(format!("{}/features", base))
        .json(&json!({"name": "X", "friendlyId": 2}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: HashMap<String, String> = resp.json().await.unwrap();
    assert!(errors["name"].contains("already exists"));
}

#[tokio::test]
async fn invalid_bodies_are_rejected_with_field_map() {
    let base = spawn_test_server().await;
    let client = Client::new();

    let resp = client
        .post(format!("{}/features", base))
        .json(&json!({"name": " ", "friendlyId": 0}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: HashMap<String, String> = resp.json().await.unwrap();
    assert!(errors.contains_key("name"));
    assert!(errors.contains_key("friendlyId"));

    let resp = client
        .post(format!("{}/features", base))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let errors: HashMap<String, String> = resp.json().await.unwrap();
    assert!(errors.contains_key("body"));

    let resp = client
        .get(format!("{}/features/not-a-uuid", base))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn lookups_by_id_friendly_id_and_name() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let id = create(&client, &base, "NewCheckout", 7).await;

    for path in [
        format!("/features/{}", id),
        "/features/7".to_string(),
        "/features/name/NewCheckout".to_string(),
    ] {
        let resp = client.get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "{path}");
        let body: ItemResponse = resp.json().await.unwrap();
        assert_eq!(body.item.id.to_string(), id, "{path}");
        assert_eq!(body.item.friendly_id, 7, "{path}");
        assert_eq!(body.item.name, "NewCheckout", "{path}");
    }

    for path in ["/features/8", "/features/name/Missing"] {
        let resp = client.get(format!("{}{}", base, path)).send().await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path}");
    }

    let resp = client.get(format!("{}/features", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body: ListResponse = resp.json().await.unwrap();
    assert_eq!(body.items.len(), 1);
}

#[tokio::test]
async fn update_replaces_fields_and_keeps_id() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let id = create(&client, &base, "X", 1).await;
    create(&client, &base, "Taken", 2).await;

    let resp = client
        .put(format!("{}/features", base))
        .json(&json!({"id": id, "name": "Y", "friendlyId": 3, "bucketList": ["a"]}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.json::<String>().await.unwrap(), PROCESSED_MESSAGE);

    let body: ItemResponse = client
        .get(format!("{}/features/{}", base, id))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.item.id.to_string(), id);
    assert_eq!(body.item.name, "Y");
    assert_eq!(body.item.friendly_id, 3);
    assert_eq!(body.item.bucket_list, vec!["a"]);

    let resp = client
        .put(format!("{}/features", base))
        .json(&json!({"id": id, "name": "Taken", "friendlyId": 3}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let resp = client
        .put(format!("{}/features", base))
        .json(&json!({"id": "6a1f0d3c-0c56-4d0e-9d57-5d3c8f1f2a10", "name": "Z", "friendlyId": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let resp = client
        .put(format!("{}/features", base))
        .json(&json!({"name": "Z", "friendlyId": 9}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn delete_unknown_feature_is_404() {
    let base = spawn_test_server().await;
    let resp = Client::new()
        .delete(format!(
            "{}/features/6a1f0d3c-0c56-4d0e-9d57-5d3c8f1f2a10",
            base
        ))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn bucket_membership_over_http() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let id = create(&client, &base, "Targeted", 1).await;
    let bucket = format!("{}/features/{}/bucket", base, id);

    let resp = client.put(format!("{}/B", bucket)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let contains: bool = client
        .get(format!("{}/B", bucket))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(contains);

    let resp = client.delete(format!("{}/B", bucket)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let contains: bool = client
        .get(format!("{}/B", bucket))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(!contains);

    client.put(format!("{}/C", bucket)).send().await.unwrap();
    client.put(format!("{}/D", bucket)).send().await.unwrap();
    let list: Vec<String> = client.get(&bucket).send().await.unwrap().json().await.unwrap();
    assert_eq!(list, vec!["C", "D"]);

    let resp = client
        .delete(format!("{}/clear", bucket))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<String> = client.get(&bucket).send().await.unwrap().json().await.unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn bucket_named_clear_can_be_added_and_queried() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let id = create(&client, &base, "X", 1).await;
    let bucket = format!("{}/features/{}/bucket", base, id);

    let resp = client.put(format!("{}/clear", bucket)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let contains: bool = client
        .get(format!("{}/clear", bucket))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(contains);

    client.put(format!("{}/other", bucket)).send().await.unwrap();
    let list: Vec<String> = client.get(&bucket).send().await.unwrap().json().await.unwrap();
    assert_eq!(list, vec!["clear", "other"]);

    // DELETE on the same segment empties the whole list
    let resp = client
        .delete(format!("{}/clear", bucket))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let list: Vec<String> = client.get(&bucket).send().await.unwrap().json().await.unwrap();
    assert!(list.is_empty());
}

#[tokio::test]
async fn bucket_routes_on_unknown_feature_are_404() {
    let base = spawn_test_server().await;
    let client = Client::new();
    let bucket = format!(
        "{}/features/6a1f0d3c-0c56-4d0e-9d57-5d3c8f1f2a10/bucket",
        base
    );

    assert_eq!(
        client.get(&bucket).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.get(format!("{}/B", bucket)).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.put(format!("{}/B", bucket)).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        client.delete(format!("{}/clear", bucket)).send().await.unwrap().status(),
        StatusCode::NOT_FOUND
    );
}

#[tokio::test]
async fn health_and_metrics_endpoints() {
    let base = spawn_test_server().await;
    let client = Client::new();
    create(&client, &base, "X", 1).await;

    let health: serde_json::Value = client
        .get(format!("{}/health", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(health["status"], "ok");
    assert_eq!(health["features_loaded"], 1);

    let resp = client.get(format!("{}/metrics", base)).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let text = resp.text().await.unwrap();
    assert!(text.contains("fsw_http_requests_total"));
}

#[tokio::test]
async fn sled_backed_server_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let store = SledStore::open(dir.path(), RetryPolicy::default()).unwrap();
    let base = spawn_server(Arc::new(store)).await;
    let client = Client::new();

    let id = create(&client, &base, "Persisted", 4).await;
    let resp = client
        .put(format!("{}/features/{}/bucket/user-1", base, id))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let body: ItemResponse = client
        .get(format!("{}/features/4", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body.item.id.to_string(), id);
    assert_eq!(body.item.bucket_list, vec!["user-1"]);
}
