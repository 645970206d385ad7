use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use ibird_mongoose::{mount, MemoryAdapter, ModelDescriptor, ModelRegistry, MountOptions, RegistrationHooks, Schema};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

struct TestApp {
    router: Router,
    adapter: Arc<MemoryAdapter>,
}

fn test_app(options: MountOptions) -> TestApp {
    let mut registry = ModelRegistry::new();
    let hooks = RegistrationHooks::new();
    registry
        .register(
            ModelDescriptor::new(
                "Article",
                Schema::from_json(&json!({
                    "title": { "type": "String", "required": true },
                    "status": { "type": "String", "enum": ["draft", "published"], "default": "draft" },
                    "views": { "type": "Integer", "min": 0, "default": 0 }
                }))
                .unwrap(),
            )
            .tombstone_key("deleted"),
            &hooks,
        )
        .unwrap();
    registry
        .register(
            ModelDescriptor::new("Tag", Schema::from_json(&json!({ "label": "String" })).unwrap()),
            &hooks,
        )
        .unwrap();
    let registry = registry.freeze();
    let adapter = Arc::new(MemoryAdapter::new(options.getters(registry)));
    let router = mount(adapter.clone(), &options);
    TestApp { router, adapter }
}

async fn send(app: &TestApp, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let req = match body {
        Some(b) => builder
            .header("content-type", "application/json")
            .body(Body::from(b.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let resp = app.router.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

#[tokio::test]
async fn create_applies_defaults_and_returns_id() {
    let app = test_app(MountOptions::default());
    let (status, body) = send(&app, "POST", "/api/Article", Some(json!({ "title": "Hello" }))).await;

    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    assert_eq!(data["title"], "Hello");
    assert_eq!(data["status"], "draft");
    assert_eq!(data["views"], 0);
    assert_eq!(data["deleted"], false);
    assert_eq!(data["_id"].as_str().unwrap().len(), 24);
}

#[tokio::test]
async fn create_rejects_invalid_documents() {
    let app = test_app(MountOptions::default());
    let (status, body) = send(&app, "POST", "/api/Article", Some(json!({ "status": "draft" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");

    let (status, _) = send(&app, "POST", "/api/Article", Some(json!({ "title": "x", "status": "gone" }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn unknown_model_is_not_found() {
    let app = test_app(MountOptions::default());
    let (status, body) = send(&app, "GET", "/api/Ghost", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
}

#[tokio::test]
async fn delete_with_tombstone_hides_but_keeps_document() {
    let app = test_app(MountOptions::default());
    let (_, created) = send(&app, "POST", "/api/Article", Some(json!({ "title": "Soon gone" }))).await;
    let id = created["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/Article/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, "GET", &format!("/api/Article/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, list) = send(&app, "GET", "/api/Article", None).await;
    assert_eq!(list["meta"]["count"], 0);
    let (status, _) = send(&app, "DELETE", &format!("/api/Article/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let raw = app.adapter.raw_documents("articles");
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].get_bool("deleted").unwrap(), true);
}

#[tokio::test]
async fn delete_without_tombstone_removes_document() {
    let app = test_app(MountOptions::default());
    let (_, created) = send(&app, "POST", "/api/Tag", Some(json!({ "label": "rust" }))).await;
    let id = created["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/Tag/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(app.adapter.raw_documents("tags").is_empty());
}

#[tokio::test]
async fn list_filters_sorts_and_pages() {
    let app = test_app(MountOptions::default());
    let items = json!([
        { "title": "b", "views": 5, "status": "published" },
        { "title": "a", "views": 9, "status": "published" },
        { "title": "c", "views": 1 }
    ]);
    let (status, created) = send(&app, "POST", "/api/Article/bulk", Some(items)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["meta"]["count"], 3);

    let (_, body) = send(&app, "GET", "/api/Article?status=published&sort=-views", None).await;
    let titles: Vec<&str> = body["data"].as_array().unwrap().iter().map(|r| r["title"].as_str().unwrap()).collect();
    assert_eq!(titles, vec!["a", "b"]);

    let (_, body) = send(&app, "GET", "/api/Article?sort=title&offset=1&limit=1", None).await;
    assert_eq!(body["data"][0]["title"], "b");
    assert_eq!(body["meta"]["count"], 1);

    let (status, _) = send(&app, "GET", "/api/Article?sort=nope", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_changes_present_fields_only() {
    let app = test_app(MountOptions::default());
    let (_, created) = send(&app, "POST", "/api/Article", Some(json!({ "title": "Draft" }))).await;
    let id = created["data"]["_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/api/Article/{}", id),
        Some(json!({ "status": "published", "views": "3" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["title"], "Draft");
    assert_eq!(body["data"]["status"], "published");
    assert_eq!(body["data"]["views"], 3);

    let (status, _) = send(&app, "PATCH", "/api/Article/not-an-id", Some(json!({ "views": 1 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn custom_prefix_and_metadata_route_are_mounted() {
    let app = test_app(MountOptions::default().route_prefix("/v1/").metadata_path("/meta"));
    let (status, _) = send(&app, "GET", "/v1/Tag", None).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, "GET", "/meta", None).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 2);

    let (status, body) = send(&app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn tombstone_getter_override_is_honored() {
    // Tags get soft delete through an override even though the model did not declare one.
    let app = test_app(MountOptions::default().tombstone_key_getter(|name| match name {
        "Tag" => Some("hidden".to_string()),
        _ => None,
    }));
    let (_, created) = send(&app, "POST", "/api/Tag", Some(json!({ "label": "old" }))).await;
    let id = created["data"]["_id"].as_str().unwrap().to_string();

    let (status, _) = send(&app, "DELETE", &format!("/api/Tag/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let raw = app.adapter.raw_documents("tags");
    assert_eq!(raw.len(), 1);
    assert_eq!(raw[0].get_bool("hidden").unwrap(), true);
}

#[tokio::test]
async fn tombstone_field_cannot_be_written_by_clients() {
    let app = test_app(MountOptions::default());
    let (status, body) = send(&app, "POST", "/api/Article", Some(json!({ "title": "x", "deleted": true }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"]["code"], "validation_error");
    let (status, _) = send(&app, "POST", "/api/Article/bulk", Some(json!([{ "title": "x", "deleted": false }]))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(app.adapter.raw_documents("articles").is_empty());

    let (_, created) = send(&app, "POST", "/api/Article", Some(json!({ "title": "Kept" }))).await;
    let id = created["data"]["_id"].as_str().unwrap().to_string();
    let (status, _) = send(&app, "PATCH", &format!("/api/Article/{}", id), Some(json!({ "deleted": true }))).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    let (status, _) = send(&app, "GET", &format!("/api/Article/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn list_limit_stays_within_page_bounds() {
    let app = test_app(MountOptions::default());
    let items: Vec<Value> = (0..3).map(|i| json!({ "label": format!("t{}", i) })).collect();
    send(&app, "POST", "/api/Tag/bulk", Some(Value::Array(items))).await;

    let (status, body) = send(&app, "GET", "/api/Tag?limit=0", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], 1);

    let (_, body) = send(&app, "GET", "/api/Tag?limit=5000", None).await;
    assert_eq!(body["meta"]["count"], 3);
}
