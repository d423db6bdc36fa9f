use axum::extract::DefaultBodyLimit;
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::Router;
use serde::Serialize;
use tower_http::services::ServeDir;

use crate::error::{ApiError, ApiErrorCategory};
use crate::extract::Json;
use crate::App;

mod profile;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn health() -> Response {
    Json(HealthResponse { status: "ok" }).into_response()
}

async fn method_not_allowed_route() -> Response {
    ApiError::new(ApiErrorCategory::InvalidRequest).into_response()
}

async fn not_found_route(method: Method) -> Response {
    match method {
        Method::HEAD => StatusCode::NOT_FOUND.into_response(),
        _ => ApiError::new(ApiErrorCategory::NotFound).into_response(),
    }
}

/// Builds an [axum router] with all routes of the profile API.
///
/// [axum router]: axum::Router
pub fn build_router(app: App) -> Router {
    let body_limit = app.config.uploads.body_limit();

    let api = Router::new()
        .route(
            "/profile",
            get(profile::get_profile)
                .put(profile::update_profile)
                .delete(profile::delete_user),
        )
        .route(
            "/profile/assessment",
            put(profile::update_assessment).delete(profile::delete_assessment_results),
        )
        .route("/profile/custom-id", put(profile::update_custom_id))
        .route("/profile/custom-id/check", get(profile::check_custom_id))
        .route(
            "/profile/username/:username/check",
            get(profile::check_username),
        )
        .route("/profile/photo", post(profile::update_photo))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(app.clone());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api)
        .nest_service(
            "/uploads",
            ServeDir::new(&app.config.uploads.dir).append_index_html_on_directories(false),
        )
        .method_not_allowed_fallback(method_not_allowed_route)
        .fallback(not_found_route)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{self, Claims};

    use axum::body::Body;
    use axum::http::{header, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn test_router() -> (App, Router) {
        let app = App::new_for_tests();
        let router = build_router(app.clone());
        (app, router)
    }

    fn bearer_token(app: &App) -> String {
        let claims = Claims {
            sub: "uid-1234".into(),
            email: Some("alice@example.com".into()),
            name: Some("Alice".into()),
            exp: chrono::Utc::now().timestamp() + 3600,
        };
        format!(
            "Bearer {}",
            jwt::encode_for_tests(&app.config.jwt_secret, &claims)
        )
    }

    async fn json_body(response: Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn health_is_open_to_anyone() {
        let (_app, router) = test_router();

        let response = router
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "status": "ok" }));
    }

    #[tokio::test]
    async fn profile_requires_a_token() {
        let (_app, router) = test_router();

        let response = router
            .oneshot(Request::get("/api/profile").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(json_body(response).await["code"], "access_denied");
    }

    #[tokio::test]
    async fn profile_rejects_a_garbage_token() {
        let (_app, router) = test_router();

        let response = router
            .oneshot(
                Request::get("/api/profile")
                    .header(header::AUTHORIZATION, "Bearer not-a-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn blank_display_name_is_rejected() {
        let (app, router) = test_router();

        let response = router
            .oneshot(
                Request::put("/api/profile")
                    .header(header::AUTHORIZATION, bearer_token(&app))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(
                        json!({ "display_name": "  ", "major": "Biology" }).to_string(),
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "Display name is required");
    }

    #[tokio::test]
    async fn malformed_username_is_rejected() {
        let (app, router) = test_router();

        let response = router
            .oneshot(
                Request::get("/api/profile/username/ab%20cd/check")
                    .header(header::AUTHORIZATION, bearer_token(&app))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["code"], "invalid_request");
    }

    #[tokio::test]
    async fn empty_custom_id_check_reports_available() {
        let (app, router) = test_router();

        let response = router
            .oneshot(
                Request::get("/api/profile/custom-id/check")
                    .header(header::AUTHORIZATION, bearer_token(&app))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!({ "available": true }));
    }

    #[tokio::test]
    async fn pdf_upload_is_rejected() {
        let (app, router) = test_router();

        let boundary = "waypoint-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
            Content-Disposition: form-data; name=\"photo\"; filename=\"paper.pdf\"\r\n\
            Content-Type: application/pdf\r\n\r\n\
            %PDF-1.4\r\n\
            --{boundary}--\r\n"
        );

        let response = router
            .oneshot(
                Request::post("/api/profile/photo")
                    .header(header::AUTHORIZATION, bearer_token(&app))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Only JPEG, PNG and GIF images are allowed"
        );
    }

    #[tokio::test]
    async fn missing_photo_field_is_rejected() {
        let (app, router) = test_router();

        let boundary = "waypoint-test-boundary";
        let body = format!(
            "--{boundary}\r\n\
            Content-Disposition: form-data; name=\"avatar\"; filename=\"me.png\"\r\n\
            Content-Type: image/png\r\n\r\n\
            pretend-png\r\n\
            --{boundary}--\r\n"
        );

        let response = router
            .oneshot(
                Request::post("/api/profile/photo")
                    .header(header::AUTHORIZATION, bearer_token(&app))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn unknown_routes_report_not_found() {
        let (_app, router) = test_router();

        let response = router
            .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(json_body(response).await["code"], "not_found");
    }
}
