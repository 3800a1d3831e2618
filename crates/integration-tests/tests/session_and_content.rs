//! Sign-in, admin gating and cached content over the REST client.

use std::sync::{Arc, Mutex};

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::IntoResponse;
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use parish_client::content::{Announcement, LiturgicalColorOverride};
use parish_client::storage::keys;
use parish_client::{AuthError, AuthService, ContentClient, ContentKind, Storage};
use parish_core::{LiturgicalColor, OverrideId, UserRole};
use parish_integration_tests::{Hits, TestBackend};
use secrecy::SecretString;
use serde_json::{Value, json};

fn login_routes(role: &'static str, logout_hits: &Hits) -> Router {
    let logout_hits = logout_hits.clone();
    Router::new()
        .route(
            "/auth/login",
            post(move |Json(body): Json<Value>| async move {
                if body.get("password").and_then(Value::as_str) != Some("correct horse") {
                    return (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({"message": "Invalid email or password"})),
                    )
                        .into_response();
                }
                Json(json!({
                    "token": "t-123",
                    "user": {
                        "_id": "u1",
                        "name": "Fr. Emmanuel",
                        "email": body.get("email").cloned().unwrap_or(Value::Null),
                        "role": role,
                        "parishionerId": "p9"
                    }
                }))
                .into_response()
            }),
        )
        .route(
            "/auth/logout",
            post(move || async move {
                logout_hits.bump();
                Json(json!({"message": "Logged out"}))
            }),
        )
}

// ============================================================================
// Sessions
// ============================================================================

#[tokio::test]
async fn test_login_persists_session_and_logout_clears_it() {
    let logout_hits = Hits::new();
    let backend = TestBackend::start(login_routes("parish-priest", &logout_hits)).await;
    let (api, storage) = backend.client();
    let auth = AuthService::new(api);

    let user = auth
        .login("  priest@Example.COM ", &SecretString::from("correct horse"))
        .await
        .expect("login failed");

    assert_eq!(user.role, UserRole::ParishPriest);
    assert_eq!(user.email, "priest@example.com");
    assert_eq!(storage.get(keys::ACCESS_TOKEN).as_deref(), Some("t-123"));
    assert_eq!(storage.get(keys::PARISHIONER_ID).as_deref(), Some("p9"));
    assert_eq!(auth.current_session(), Some(user.clone()));
    assert_eq!(auth.require_admin().expect("priest is admin"), user);

    auth.logout().await.expect("logout failed");
    assert_eq!(logout_hits.count(), 1);
    assert_eq!(auth.current_session(), None);
    for key in keys::AUTH {
        assert_eq!(storage.get(key), None, "{key} should be cleared");
    }
}

#[tokio::test]
async fn test_parishioner_is_refused_admin() {
    let backend = TestBackend::start(login_routes("parishioner", &Hits::new())).await;
    let (api, _) = backend.client();
    let auth = AuthService::new(api);

    auth.login("marie@example.com", &SecretString::from("correct horse"))
        .await
        .expect("login failed");

    assert!(matches!(
        auth.require_admin(),
        Err(AuthError::Forbidden(UserRole::Parishioner))
    ));
}

#[tokio::test]
async fn test_wrong_password_surfaces_backend_message() {
    let backend = TestBackend::start(login_routes("admin", &Hits::new())).await;
    let (api, storage) = backend.client();
    let auth = AuthService::new(api);

    let err = auth
        .login("admin@example.com", &SecretString::from("nope"))
        .await
        .expect_err("login must fail");

    let info = err.info();
    assert_eq!(info.status, Some(401));
    assert_eq!(info.message, "Invalid email or password");
    assert_eq!(storage.get(keys::ACCESS_TOKEN), None);
}

// ============================================================================
// Content
// ============================================================================

#[tokio::test]
async fn test_content_list_is_cached_until_a_write() {
    let list_hits = Hits::new();
    let counted = list_hits.clone();
    let created: Arc<Mutex<Vec<Value>>> = Arc::default();
    let store = Arc::clone(&created);

    let backend = TestBackend::start(
        Router::new().route(
            "/announcements",
            get(move || async move {
                counted.bump();
                Json(json!({"announcements": [
                    {"_id": "a1", "title": "Parish picnic", "content": "Sunday after Mass", "isPublished": true}
                ]}))
            })
            .post(move |Json(body): Json<Value>| async move {
                store.lock().expect("lock").push(body.clone());
                let mut saved = body;
                if let Some(fields) = saved.as_object_mut() {
                    fields.insert("_id".to_string(), json!("a2"));
                }
                (StatusCode::CREATED, Json(saved))
            }),
        ),
    )
    .await;
    let (api, _) = backend.client();
    let content = ContentClient::new(api);

    let first = content.list::<Announcement>().await.expect("list failed");
    let second = content.list::<Announcement>().await.expect("list failed");
    assert_eq!(first, second);
    assert_eq!(first.len(), 1);
    assert_eq!(first.first().map(|a| a.title.as_str()), Some("Parish picnic"));
    assert_eq!(list_hits.count(), 1);

    let new = Announcement {
        id: None,
        title: "Choir practice moved".to_string(),
        content: "Thursday at 7pm".to_string(),
        priority: None,
        is_published: true,
        expires_at: None,
        extra: serde_json::Map::new(),
    };
    let saved = content.create(&new).await.expect("create failed");
    assert_eq!(saved.id.map(|id| id.to_string()).as_deref(), Some("a2"));
    assert_eq!(created.lock().expect("lock").len(), 1);

    content.list::<Announcement>().await.expect("list failed");
    assert_eq!(list_hits.count(), 2);
}

#[tokio::test]
async fn test_raw_listing_uses_collection_path() {
    let backend = TestBackend::start(Router::new().route(
        "/mass-schedules",
        get(|| async { Json(json!([{"day": "Sunday", "time": "08:00"}, {"day": "Sunday", "time": "10:30"}])) }),
    ))
    .await;
    let (api, _) = backend.client();

    let items = ContentClient::new(api)
        .list_raw(ContentKind::MassSchedules)
        .await
        .expect("list failed");
    assert_eq!(items.len(), 2);
}

#[tokio::test]
async fn test_override_delete_hits_item_path_with_bearer() {
    let deleted: Arc<Mutex<Option<(String, Option<String>)>>> = Arc::default();
    let seen = Arc::clone(&deleted);

    let backend = TestBackend::start(
        Router::new()
            .route(
                "/liturgical-color-overrides",
                get(|| async {
                    Json(json!([{"_id": "o1", "date": "2026-12-13", "color": "rose", "reason": "Gaudete"}]))
                }),
            )
            .route(
                "/liturgical-color-overrides/{id}",
                delete(move |Path(id): Path<String>, headers: HeaderMap| async move {
                    let auth = headers
                        .get(header::AUTHORIZATION)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_owned);
                    *seen.lock().expect("lock") = Some((id, auth));
                    StatusCode::NO_CONTENT
                }),
            ),
    )
    .await;
    let (api, _) = backend.client();
    api.store_access_token("admin-token").expect("store token");
    let content = ContentClient::new(api);

    let overrides = content
        .list::<LiturgicalColorOverride>()
        .await
        .expect("list failed");
    assert_eq!(overrides.first().map(|o| o.color), Some(LiturgicalColor::Rose));

    content
        .delete::<LiturgicalColorOverride>(&OverrideId::new("o1"))
        .await
        .expect("delete failed");

    let seen = deleted.lock().expect("lock").clone();
    assert_eq!(
        seen,
        Some(("o1".to_string(), Some("Bearer admin-token".to_string())))
    );
}
