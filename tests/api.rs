use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Method, Request, StatusCode, header},
    response::Response,
};
use http_body_util::BodyExt;
use serde_json::{Value, json};
use tower::ServiceExt;

use admin_styler::application::preview::{PreviewConfig, PreviewService};
use admin_styler::application::settings::SettingsService;
use admin_styler::application::stylesheet::TemplateRenderer;
use admin_styler::cache::{CacheConfig, GenerationCache};
use admin_styler::domain::schema::SettingKey;
use admin_styler::infra::http::{self, REQUEST_ID_HEADER, RouterState};
use admin_styler::infra::memory::MemorySettingsStore;

fn build_app() -> Router {
    let cache = Arc::new(GenerationCache::new(
        CacheConfig::default(),
        Arc::new(TemplateRenderer),
    ));
    let settings = Arc::new(SettingsService::new(
        Arc::new(MemorySettingsStore::default()),
        cache,
    ));
    let preview = Arc::new(PreviewService::new(
        Arc::clone(&settings),
        PreviewConfig::default(),
    ));
    http::app_router(RouterState::new(settings, preview))
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

fn get(uri: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(uri)
        .body(Body::empty())
        .expect("request should build")
}

fn json_request(method: Method, uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

async fn body_text(response: Response) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should collect")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

async fn body_json(response: Response) -> Value {
    serde_json::from_str(&body_text(response).await).expect("json body")
}

#[tokio::test]
async fn stylesheet_is_served_with_etag_and_revalidates() {
    let app = build_app();

    let response = send(&app, get("/styles/admin.css")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/css; charset=utf-8"
    );
    let etag = response.headers()[header::ETAG]
        .to_str()
        .expect("ascii etag")
        .to_string();
    assert!(etag.starts_with('"') && etag.ends_with('"'));
    let css = body_text(response).await;
    assert!(css.contains("#adminmenu"));
    assert!(css.contains("#23282d"));

    let revalidate = Request::builder()
        .method(Method::GET)
        .uri("/styles/admin.css")
        .header(header::IF_NONE_MATCH, etag.as_str())
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app, revalidate).await;
    assert_eq!(response.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(response.headers()[header::ETAG], etag.as_str());
}

#[tokio::test]
async fn saving_settings_changes_the_served_stylesheet() {
    let app = build_app();

    let before = send(&app, get("/styles/admin.css")).await;
    let before_etag = before.headers()[header::ETAG].clone();

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            "/api/v1/settings",
            json!({"menu_background": "#FF0000", "not_a_setting": 1}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["settings"]["menu_background"], "#ff0000");
    assert_eq!(saved["ignored"], json!(["not_a_setting"]));

    let after = send(&app, get("/styles/admin.css")).await;
    assert_ne!(after.headers()[header::ETAG], before_etag);
    let css = body_text(after).await;
    assert!(css.contains("#ff0000"));

    let current = body_json(send(&app, get("/api/v1/settings")).await).await;
    assert_eq!(current["settings"]["menu_background"], "#ff0000");
    assert_eq!(current["fingerprint"], saved["fingerprint"]);
}

#[tokio::test]
async fn invalid_setting_is_rejected_without_saving() {
    let app = build_app();

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            "/api/v1/settings",
            json!({"menu_background": "#00ff00", "menu_width": "wide"}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "invalid_setting");

    let current = body_json(send(&app, get("/api/v1/settings")).await).await;
    assert_eq!(current["settings"]["menu_background"], "#23282d");
    assert_eq!(current["settings"]["menu_width"], 160);
}

#[tokio::test]
async fn out_of_range_length_is_clamped_and_saved() {
    let app = build_app();

    let response = send(
        &app,
        json_request(
            Method::PATCH,
            "/api/v1/settings",
            json!({"menu_width": 9999}),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let saved = body_json(response).await;
    assert_eq!(saved["settings"]["menu_width"], 400);

    let css = body_text(send(&app, get("/styles/admin.css")).await).await;
    assert!(css.contains("width: 400px;"));
}

#[tokio::test]
async fn malformed_json_gets_error_envelope() {
    let app = build_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/preview")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn preview_renders_overrides_without_saving() {
    let app = build_app();

    let response = send(
        &app,
        json_request(
            Method::POST,
            "/api/v1/preview",
            json!({
                "session": "editor-1",
                "sequence": 1,
                "settings": {"menu_background": "#123456", "menu_width": "oops"}
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "delivered");
    assert_eq!(body["sequence"], 1);
    assert!(body["css"].as_str().expect("css").contains("#123456"));
    assert_eq!(body["warnings"][0]["key"], "menu_width");

    let current = body_json(send(&app, get("/api/v1/settings")).await).await;
    assert_eq!(current["settings"]["menu_background"], "#23282d");
}

#[tokio::test]
async fn stale_preview_sequence_is_superseded() {
    let app = build_app();

    let newer = json!({"session": "editor-2", "sequence": 5, "settings": {"link_color": "#abcdef"}});
    let older = json!({"session": "editor-2", "sequence": 3, "settings": {"link_color": "#000000"}});

    let body = body_json(send(&app, json_request(Method::POST, "/api/v1/preview", newer)).await).await;
    assert_eq!(body["status"], "delivered");

    let response = send(&app, json_request(Method::POST, "/api/v1/preview", older)).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "superseded");
    assert_eq!(body["sequence"], 3);
    assert_eq!(body["latest"], 5);
    assert!(body.get("css").is_none());
}

#[tokio::test]
async fn preview_can_answer_with_raw_css() {
    let app = build_app();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/preview")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "text/css")
        .body(Body::from(
            json!({"settings": {"content_background": "#fafafa"}}).to_string(),
        ))
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()["x-preview-status"], "delivered");
    assert_eq!(response.headers()["x-preview-sequence"], "1");
    assert!(body_text(response).await.contains("#fafafa"));
}

#[tokio::test]
async fn reset_restores_defaults() {
    let app = build_app();

    send(
        &app,
        json_request(
            Method::PATCH,
            "/api/v1/settings",
            json!({"font_size": 16}),
        ),
    )
    .await;

    let response = send(
        &app,
        Request::builder()
            .method(Method::POST)
            .uri("/api/v1/settings/reset")
            .body(Body::empty())
            .expect("request should build"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["settings"]["font_size"], 13);
}

#[tokio::test]
async fn schema_lists_every_setting() {
    let app = build_app();

    let body = body_json(send(&app, get("/api/v1/settings/schema")).await).await;
    let entries = body.as_array().expect("schema array");
    assert_eq!(entries.len(), SettingKey::COUNT);
    assert_eq!(entries[0]["key"], "enable_plugin");
    assert_eq!(entries[0]["kind"], "toggle");
}

#[tokio::test]
async fn health_reports_no_content_and_echoes_request_id() {
    let app = build_app();

    let request = Request::builder()
        .method(Method::GET)
        .uri("/health")
        .header(REQUEST_ID_HEADER, "req-42")
        .body(Body::empty())
        .expect("request should build");
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    assert_eq!(response.headers()[REQUEST_ID_HEADER], "req-42");
}
