//! API router.
//!
//! Read endpoints are open; mutating endpoints sit behind the identity
//! middleware (`X-User-Id` required, 401 otherwise). The evaluation trigger
//! is machine-invoked (cron) and carries no user identity.

use axum::routing::{get, patch, post, put};
use axum::Router;

use crate::api::endpoints;
use crate::api::middleware;
use crate::api::types::ApiContext;

pub fn api_router(ctx: ApiContext) -> Router {
    let reads = Router::new()
        .route("/health", get(endpoints::health::check))
        .route("/medications", get(endpoints::medications::list))
        .route("/medications/:id", get(endpoints::medications::detail))
        .route("/doses", get(endpoints::doses::list))
        .route("/doses/today", get(endpoints::doses::today))
        .route("/guardian", get(endpoints::guardian::get))
        .route("/evaluation/run", post(endpoints::evaluation::run))
        .with_state(ctx.clone());

    let mutations = Router::new()
        .route("/medications", post(endpoints::medications::create))
        .route(
            "/medications/:id",
            put(endpoints::medications::update).delete(endpoints::medications::delete),
        )
        .route("/medications/:id/confirm", post(endpoints::medications::confirm))
        .route("/doses/:id", patch(endpoints::doses::patch_quantity))
        .route("/doses/:id/take", post(endpoints::doses::take))
        .route("/device/confirm", post(endpoints::device::confirm))
        .route("/guardian", put(endpoints::guardian::update))
        .with_state(ctx)
        .layer(axum::middleware::from_fn(middleware::identity::require_identity));

    Router::new().nest("/api", reads.merge(mutations))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;
    use uuid::Uuid;

    use super::*;
    use crate::db::sqlite::open_memory_database;
    use crate::notifier::RecordingNotifier;

    fn test_ctx() -> (Router, Arc<RecordingNotifier>) {
        let notifier = Arc::new(RecordingNotifier::new());
        let ctx = ApiContext::new(open_memory_database().unwrap(), notifier.clone());
        (api_router(ctx), notifier)
    }

    fn req(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(user) = user {
            builder = builder.header("X-User-Id", user);
        }
        match body {
            Some(json) => builder
                .header("Content-Type", "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn json_body(resp: axum::response::Response) -> Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn medication_payload() -> Value {
        json!({
            "name": "Metformin",
            "kind": "prescription",
            "quantity": 2,
            "start_date": "2025-11-01",
            "end_date": "2025-11-03",
            "intake_timing": "after_meal",
            "alarm_time": "08:30:00",
        })
    }

    #[tokio::test]
    async fn health_is_open() {
        let (app, _) = test_ctx();
        let resp = app.oneshot(req("GET", "/api/health", None, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_requires_identity() {
        let (app, _) = test_ctx();
        let resp = app
            .oneshot(req("POST", "/api/medications", None, Some(medication_payload())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "IDENTITY_REQUIRED");
    }

    #[tokio::test]
    async fn malformed_identity_is_rejected() {
        let (app, _) = test_ctx();
        let resp = app
            .oneshot(req(
                "POST",
                "/api/medications",
                Some("not-a-uuid"),
                Some(medication_payload()),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn create_expands_and_detail_shows_obligations() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();

        let resp = app
            .clone()
            .oneshot(req("POST", "/api/medications", Some(&user), Some(medication_payload())))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let created = json_body(resp).await;
        assert_eq!(created["user_id"], user);
        let id = created["id"].as_str().unwrap().to_string();

        let resp = app
            .oneshot(req("GET", &format!("/api/medications/{id}"), None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let detail = json_body(resp).await;
        let obligations = detail["obligations"].as_array().unwrap();
        assert_eq!(obligations.len(), 3);
        assert_eq!(obligations[0]["date"], "2025-11-01");
        assert_eq!(obligations[0]["quantity"], 2);
        assert_eq!(obligations[0]["taken"], false);
    }

    #[tokio::test]
    async fn create_rejects_inverted_range() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();
        let mut payload = medication_payload();
        payload["end_date"] = json!("2025-10-01");

        let resp = app
            .oneshot(req("POST", "/api/medications", Some(&user), Some(payload)))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = json_body(resp).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn unknown_medication_detail_is_404() {
        let (app, _) = test_ctx();
        let resp = app
            .oneshot(req(
                "GET",
                &format!("/api/medications/{}", Uuid::new_v4()),
                None,
                None,
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn dose_list_rejects_malformed_date() {
        let (app, _) = test_ctx();
        let resp = app
            .oneshot(req("GET", "/api/doses?date=tomorrow", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn dose_list_filters_by_date() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();
        app.clone()
            .oneshot(req("POST", "/api/medications", Some(&user), Some(medication_payload())))
            .await
            .unwrap();

        let resp = app
            .oneshot(req("GET", "/api/doses?date=2025-11-02", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["obligations"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn guardian_roundtrip() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();

        let resp = app
            .clone()
            .oneshot(req("GET", "/api/guardian", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = app
            .clone()
            .oneshot(req(
                "PUT",
                "/api/guardian",
                Some(&user),
                Some(json!({
                    "name": "Jordan Park",
                    "email": "jordan@example.com",
                    "owner_name": "Alex Kim",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let resp = app.oneshot(req("GET", "/api/guardian", None, None)).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["email"], "jordan@example.com");
    }

    #[tokio::test]
    async fn guardian_update_rejects_empty_email() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();
        let resp = app
            .oneshot(req(
                "PUT",
                "/api/guardian",
                Some(&user),
                Some(json!({
                    "name": "Jordan Park",
                    "email": "  ",
                    "owner_name": "Alex Kim",
                })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn evaluation_run_reports_skip_without_guardian() {
        let (app, notifier) = test_ctx();
        let resp = app
            .oneshot(req("POST", "/api/evaluation/run", None, None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["outcome"], "skipped_no_guardian");
        assert_eq!(notifier.sent_count(), 0);
    }

    #[tokio::test]
    async fn take_marks_obligation_and_is_idempotent() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();

        let resp = app
            .clone()
            .oneshot(req("POST", "/api/medications", Some(&user), Some(medication_payload())))
            .await
            .unwrap();
        let id = json_body(resp).await["id"].as_str().unwrap().to_string();

        let detail = json_body(
            app.clone()
                .oneshot(req("GET", &format!("/api/medications/{id}"), None, None))
                .await
                .unwrap(),
        )
        .await;
        let ob_id = detail["obligations"][0]["id"].as_str().unwrap().to_string();

        let resp = app
            .clone()
            .oneshot(req("POST", &format!("/api/doses/{ob_id}/take"), Some(&user), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let first = json_body(resp).await;
        assert_eq!(first["taken"], true);
        let taken_at = first["taken_at"].clone();

        // second take is a no-op and keeps the original timestamp
        let resp = app
            .oneshot(req("POST", &format!("/api/doses/{ob_id}/take"), Some(&user), None))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["taken_at"], taken_at);
    }

    #[tokio::test]
    async fn device_confirm_unknown_medication_is_404() {
        let (app, _) = test_ctx();
        let user = Uuid::new_v4().to_string();
        let resp = app
            .oneshot(req(
                "POST",
                "/api/device/confirm",
                Some(&user),
                Some(json!({ "medication_id": Uuid::new_v4() })),
            ))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
