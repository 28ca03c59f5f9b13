//! API route configuration.

use std::sync::Arc;

use axum::{
    routing::{delete, get},
    Router,
};

use crate::handlers;
use crate::state::AppState;

/// Creates the API router with all routes configured.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))

        // Users
        .route(
            "/api/v1/users",
            get(handlers::list_users).post(handlers::create_user),
        )
        .route("/api/v1/users/:id", get(handlers::get_user))
        .route("/api/v1/users/:id/score", get(handlers::get_user_score))

        // Cache
        .route("/api/v1/cache/stats", get(handlers::cache_stats))
        .route("/api/v1/cache", delete(handlers::clear_cache))

        .fallback(handlers::not_found)
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::response::Response;
    use scorecache_score::ScoreConfig;
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::state::ApiConfig;

    fn test_state() -> Arc<AppState> {
        let config = ApiConfig {
            score: ScoreConfig::default().with_compute_delay(Duration::ZERO),
            seed_demo_users: true,
        };
        Arc::new(AppState::new(config))
    }

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        create_router(state.clone()).oneshot(request).await.unwrap()
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let state = test_state();
        let response = send(&state, get_request("/health")).await;

        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["users_count"], 2);
    }

    #[tokio::test]
    async fn test_list_and_get_users() {
        let state = test_state();

        let response = send(&state, get_request("/api/v1/users")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body.as_array().unwrap().len(), 2);

        let response = send(&state, get_request("/api/v1/users/1")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = json_body(response).await;
        assert_eq!(body["name"], "John Doe");
    }

    #[tokio::test]
    async fn test_get_missing_user() {
        let state = test_state();
        let response = send(&state, get_request("/api/v1/users/99")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_create_user() {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"Ada","email":"ada@example.com"}"#))
            .unwrap();

        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = json_body(response).await;
        assert_eq!(body["id"], 3);
        assert_eq!(body["points"], 0);
    }

    #[tokio::test]
    async fn test_create_user_validation() {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"name":"","email":"nobody"}"#))
            .unwrap();

        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    }

    #[tokio::test]
    async fn test_create_user_malformed_json() {
        let state = test_state();
        let request = Request::builder()
            .method("POST")
            .uri("/api/v1/users")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from("{not json"))
            .unwrap();

        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
        assert!(body["error"]["message"].as_str().unwrap().contains("JSON"));
        assert_eq!(state.users.len(), 2);
    }

    #[tokio::test]
    async fn test_non_numeric_user_id() {
        let state = test_state();
        let response = send(&state, get_request("/api/v1/users/abc/score")).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let state = test_state();
        let response = send(&state, get_request("/api/v2/nothing")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let body = json_body(response).await;
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_user_score_is_cached() {
        let state = test_state();

        let response = send(&state, get_request("/api/v1/users/1/score")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let first = json_body(response).await;
        assert_eq!(first["score"], 120);
        assert_eq!(first["cached"], false);

        let response = send(&state, get_request("/api/v1/users/1/score")).await;
        let second = json_body(response).await;
        assert_eq!(second["score"], 120);
        assert_eq!(second["cached"], true);
    }

    #[tokio::test]
    async fn test_score_for_missing_user() {
        let state = test_state();
        let response = send(&state, get_request("/api/v1/users/42/score")).await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_cache_stats_and_clear() {
        let state = test_state();
        send(&state, get_request("/api/v1/users/2/score")).await;

        let response = send(&state, get_request("/api/v1/cache/stats")).await;
        assert_eq!(response.status(), StatusCode::OK);
        let stats = json_body(response).await;
        assert_eq!(stats["cache"]["total_entries"], 1);
        assert_eq!(stats["coalescer"]["computations"], 1);

        let request = Request::builder()
            .method("DELETE")
            .uri("/api/v1/cache")
            .body(Body::empty())
            .unwrap();
        let response = send(&state, request).await;
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        assert_eq!(state.scores.stats().cache.total_entries, 0);

        let response = send(&state, get_request("/api/v1/users/2/score")).await;
        let body = json_body(response).await;
        assert_eq!(body["cached"], false);
    }
}
