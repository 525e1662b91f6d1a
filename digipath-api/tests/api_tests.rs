//! HTTP tests for digipath-api
//!
//! Drive the full router with `oneshot` against an in-memory database:
//! - Health and build info (no auth)
//! - Login, refresh and bearer-token enforcement
//! - Admin tag/speaker/session flows and the error envelope
//! - Public catalogue, calendar export and cache invalidation

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use digipath_api::pagination::PageLimits;
use digipath_api::{build_router, AppState};
use digipath_common::api::TokenKeys;
use digipath_common::config::BootstrapAdmin;
use digipath_common::db::{ensure_admin_user, init_memory_database};
use digipath_common::time;
use serde_json::{json, Value};
use std::time::Duration;
use tower::util::ServiceExt; // for `oneshot` method

const ADMIN_EMAIL: &str = "admin@digipath.example";
const ADMIN_PASSWORD: &str = "correct horse battery";

/// Test helper: state with one admin account
async fn setup_state() -> AppState {
    let pool = init_memory_database().await.unwrap();
    ensure_admin_user(
        &pool,
        &BootstrapAdmin {
            email: ADMIN_EMAIL.into(),
            name: "Administrator".into(),
            password: ADMIN_PASSWORD.into(),
        },
    )
    .await
    .unwrap();

    let tokens = TokenKeys::new(
        b"integration-test-secret-0123456789abcdef",
        Duration::from_secs(900),
        Duration::from_secs(86_400),
    );
    AppState::new(pool, tokens, Duration::from_secs(60), PageLimits::default(), 64)
}

async fn setup_app() -> Router {
    build_router(setup_state().await)
}

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// Send a request, returning status and parsed JSON (Null for empty bodies)
async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("Should read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("Should parse JSON")
    };
    (status, body)
}

async fn login(app: &Router) -> Value {
    let (status, body) = send(
        app,
        request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": ADMIN_EMAIL, "password": ADMIN_PASSWORD})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "login failed: {}", body);
    body
}

async fn access_token(app: &Router) -> String {
    login(app).await["access_token"].as_str().unwrap().to_string()
}

async fn create(app: &Router, token: &str, uri: &str, body: Value) -> Value {
    let (status, body) = send(app, request("POST", uri, Some(token), Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "POST {} failed: {}", uri, body);
    body
}

/// Creates one tag per category, a speaker and a session; returns the session JSON
async fn seed_session(app: &Router, token: &str, meeting_link: Option<&str>) -> Value {
    let organ = create(app, token, "/api/v1/admin/tags", json!({"label": "Kidney", "category": "organ"})).await;
    let kind = create(app, token, "/api/v1/admin/tags", json!({"label": "Lecture", "category": "type"})).await;
    let level = create(app, token, "/api/v1/admin/tags", json!({"label": "Advanced", "category": "level"})).await;
    let speaker = create(
        app,
        token,
        "/api/v1/admin/speakers",
        json!({"name": "Dr. Lin", "title": "Professor", "affiliation": "Renal Unit"}),
    )
    .await;

    let date = (time::today() + chrono::Duration::days(10)).to_string();
    create(
        app,
        token,
        "/api/v1/admin/sessions",
        json!({
            "title": "Renal biopsy, part 1",
            "summary": "Glomerular patterns",
            "abstract": "A tour of the glomerulus",
            "objectives": ["Classify lupus nephritis"],
            "date": date,
            "time": "18:30:00",
            "duration_minutes": 90,
            "platform": "Zoom",
            "meeting_link": meeting_link,
            "speaker_id": speaker["id"],
            "organ_tag_id": organ["id"],
            "type_tag_id": kind["id"],
            "level_tag_id": level["id"],
        }),
    )
    .await
}

// =============================================================================
// Service info
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_no_auth_required() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/health", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["module"], "digipath-api");
    assert_eq!(body["database"], "ok");
}

#[tokio::test]
async fn test_build_info() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/build_info", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert!(body["git_hash"].is_string());
}

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_admin_routes_require_token() {
    let app = setup_app().await;
    let (status, body) = send(&app, request("GET", "/api/v1/admin/tags", None, None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "AUTH_ERROR");

    let (status, _) = send(&app, request("GET", "/api/v1/admin/tags", Some("not-a-jwt"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_login_and_me() {
    let app = setup_app().await;
    let tokens = login(&app).await;
    assert_eq!(tokens["token_type"], "bearer");
    assert_eq!(tokens["expires_in"], 900);
    assert!(tokens["refresh_token"].is_string());

    let token = tokens["access_token"].as_str().unwrap();
    let (status, me) = send(&app, request("GET", "/api/v1/auth/me", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(me["email"], ADMIN_EMAIL);
    assert_eq!(me["role"], "super_admin");
    assert!(me.get("password_hash").is_none());

    let (status, _) = send(&app, request("POST", "/api/v1/auth/logout", Some(token), None)).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_bad_credentials_look_identical() {
    let app = setup_app().await;
    let (status_a, wrong_password) = send(
        &app,
        request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": ADMIN_EMAIL, "password": "nope"})),
        ),
    )
    .await;
    let (status_b, unknown_email) = send(
        &app,
        request(
            "POST",
            "/api/v1/auth/login",
            None,
            Some(json!({"email": "who@example.org", "password": "nope"})),
        ),
    )
    .await;

    assert_eq!(status_a, StatusCode::UNAUTHORIZED);
    assert_eq!(status_b, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_password, unknown_email);
}

#[tokio::test]
async fn test_refresh_token_only_refreshes() {
    let app = setup_app().await;
    let tokens = login(&app).await;
    let access = tokens["access_token"].as_str().unwrap();
    let refresh = tokens["refresh_token"].as_str().unwrap();

    // A refresh token does not open admin routes
    let (status, _) = send(&app, request("GET", "/api/v1/admin/tags", Some(refresh), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // An access token does not refresh
    let (status, _) = send(&app, request("POST", "/api/v1/auth/refresh", Some(access), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(&app, request("POST", "/api/v1/auth/refresh", Some(refresh), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.get("refresh_token").is_none());

    let new_access = body["access_token"].as_str().unwrap();
    let (status, _) = send(&app, request("GET", "/api/v1/admin/tags", Some(new_access), None)).await;
    assert_eq!(status, StatusCode::OK);
}

// =============================================================================
// Admin flows
// =============================================================================

#[tokio::test]
async fn test_malformed_input_uses_error_envelope() {
    let app = setup_app().await;
    let token = access_token(&app).await;

    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/admin/tags")
        .header(header::AUTHORIZATION, format!("Bearer {}", token))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(&app, request("GET", "/api/v1/admin/sessions/not-a-uuid", Some(&token), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, body) = send(
        &app,
        request(
            "POST",
            "/api/v1/admin/tags",
            Some(&token),
            Some(json!({"label": "X", "category": "colour"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_tag_delete_with_replacement() {
    let app = setup_app().await;
    let token = access_token(&app).await;
    let session = seed_session(&app, &token, None).await;
    let organ_id = session["organ_tag_id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        request("DELETE", &format!("/api/v1/admin/tags/{}", organ_id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    let (_, usage) = send(
        &app,
        request("GET", &format!("/api/v1/admin/tags/{}/usage", organ_id), Some(&token), None),
    )
    .await;
    assert_eq!(usage["usage_count"], 1);
    assert_eq!(usage["can_delete"], false);

    let lung = create(&app, &token, "/api/v1/admin/tags", json!({"label": "Lung", "category": "organ"})).await;
    let lung_id = lung["id"].as_str().unwrap();
    let (status, body) = send(
        &app,
        request(
            "DELETE",
            &format!("/api/v1/admin/tags/{}?replace_with={}", organ_id, lung_id),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", body);
    assert_eq!(body["reassigned_sessions"], 1);

    let session_id = session["id"].as_str().unwrap();
    let (_, detail) = send(
        &app,
        request("GET", &format!("/api/v1/admin/sessions/{}", session_id), Some(&token), None),
    )
    .await;
    assert_eq!(detail["organ_tag_id"], lung_id);
    assert_eq!(detail["organ_tag"]["label"], "Lung");
}

#[tokio::test]
async fn test_session_lifecycle_over_http() {
    let app = setup_app().await;
    let token = access_token(&app).await;
    let session = seed_session(&app, &token, None).await;
    assert_eq!(session["status"], "draft");
    assert_eq!(session["has_recording"], false);
    let id = session["id"].as_str().unwrap();

    // Publishing without a link fails validation
    let (status, body) = send(
        &app,
        request("POST", &format!("/api/v1/admin/sessions/{}/publish", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");

    let (status, _) = send(
        &app,
        request(
            "PUT",
            &format!("/api/v1/admin/sessions/{}", id),
            Some(&token),
            Some(json!({"meeting_link": "https://zoom.us/j/1"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = send(
        &app,
        request("POST", &format!("/api/v1/admin/sessions/{}/publish", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "published");

    let (status, body) = send(
        &app,
        request(
            "POST",
            &format!("/api/v1/admin/sessions/{}/complete", id),
            Some(&token),
            Some(json!({"youtube_url": "https://youtu.be/dQw4w9WgXcQ"})),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["has_recording"], true);

    let recording_id = body["recording"]["id"].as_str().unwrap().to_string();
    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/v1/admin/recordings/{}", recording_id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, detail) = send(
        &app,
        request("GET", &format!("/api/v1/admin/sessions/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(detail["status"], "published");
    assert_eq!(detail["has_recording"], false);

    let (status, _) = send(
        &app,
        request("DELETE", &format!("/api/v1/admin/sessions/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (status, _) = send(
        &app,
        request("GET", &format!("/api/v1/admin/sessions/{}", id), Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// =============================================================================
// Public catalogue
// =============================================================================

#[tokio::test]
async fn test_public_catalogue_and_calendar() {
    let app = setup_app().await;
    let token = access_token(&app).await;
    let session = seed_session(&app, &token, Some("https://zoom.us/j/77")).await;
    let id = session["id"].as_str().unwrap();

    // Drafts are invisible to the public
    let (status, _) = send(&app, request("GET", &format!("/api/v1/public/sessions/{}", id), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(
        &app,
        request("GET", &format!("/api/v1/public/sessions/{}/calendar", id), None, None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (_, upcoming) = send(&app, request("GET", "/api/v1/public/sessions/upcoming", None, None)).await;
    assert_eq!(upcoming["total"], 0);

    send(
        &app,
        request("POST", &format!("/api/v1/admin/sessions/{}/publish", id), Some(&token), None),
    )
    .await;

    // The publish event invalidated the cached listing
    let (_, upcoming) = send(&app, request("GET", "/api/v1/public/sessions/upcoming", None, None)).await;
    assert_eq!(upcoming["total"], 1);
    assert_eq!(upcoming["items"][0]["id"], id);

    let response = app
        .clone()
        .oneshot(request("GET", &format!("/api/v1/public/sessions/{}/calendar", id), None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/calendar; charset=utf-8"
    );
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        format!("attachment; filename=session-{}.ics", id).as_str()
    );
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let ics = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(ics.starts_with("BEGIN:VCALENDAR\r\n"));
    assert!(ics.contains("SUMMARY:Renal biopsy\\, part 1"));
    assert!(ics.contains("TRIGGER:-PT15M"));

    let (_, home) = send(&app, request("GET", "/api/v1/public/home", None, None)).await;
    assert_eq!(home["stats"]["total_sessions"], 1);
    assert_eq!(home["upcoming_sessions"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_public_tags_reflect_changes() {
    let app = setup_app().await;
    let token = access_token(&app).await;
    create(&app, &token, "/api/v1/admin/tags", json!({"label": "Breast", "category": "organ"})).await;

    let (_, tags) = send(&app, request("GET", "/api/v1/public/tags", None, None)).await;
    assert_eq!(tags["organ"].as_array().unwrap().len(), 1);

    let bone = create(&app, &token, "/api/v1/admin/tags", json!({"label": "Bone", "category": "organ"})).await;
    let (_, tags) = send(&app, request("GET", "/api/v1/public/tags", None, None)).await;
    assert_eq!(tags["organ"].as_array().unwrap().len(), 2);

    let (status, _) = send(
        &app,
        request(
            "POST",
            &format!("/api/v1/admin/tags/{}/deactivate", bone["id"].as_str().unwrap()),
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let (_, tags) = send(&app, request("GET", "/api/v1/public/tags", None, None)).await;
    assert_eq!(tags["organ"].as_array().unwrap().len(), 1);
    assert!(tags["type"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_public_recording_counts_views() {
    let app = setup_app().await;
    let token = access_token(&app).await;
    let session = seed_session(&app, &token, None).await;

    let recording = create(
        &app,
        &token,
        "/api/v1/admin/recordings",
        json!({"session_id": session["id"], "youtube_url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ"}),
    )
    .await;
    let uri = format!("/api/v1/public/recordings/{}", recording["id"].as_str().unwrap());

    send(&app, request("GET", &uri, None, None)).await;
    let (status, body) = send(&app, request("GET", &uri, None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["views_count"], 2);
    assert_eq!(body["session"]["status"], "completed");

    let (_, library) = send(&app, request("GET", "/api/v1/public/recordings?sort=views", None, None)).await;
    assert_eq!(library["total"], 1);
}

#[tokio::test]
async fn test_ignored_query_parameters_share_cache_entries() {
    let state = setup_state().await;
    let app = build_router(state.clone());

    for i in 0..200 {
        for uri in [
            format!("/api/v1/public/tags?junk={}", i),
            format!("/api/v1/public/home?junk={}", i),
            format!("/api/v1/public/sessions/upcoming?junk={}&status=draft", i),
        ] {
            let (status, _) = send(&app, request("GET", &uri, None, None)).await;
            assert_eq!(status, StatusCode::OK);
        }
    }
    assert_eq!(state.cache.len().await, 3);

    // Distinct real filters still get their own entries, up to the cap
    for i in 0..50 {
        let uri = format!("/api/v1/public/sessions/upcoming?search=term{}", i);
        send(&app, request("GET", &uri, None, None)).await;
    }
    assert_eq!(state.cache.len().await, 53);
    assert!(state.cache.len().await <= digipath_api::cache::DEFAULT_MAX_ENTRIES);
}
