use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use tower::ServiceExt;

use profile_pictures::config::{HostResolutionConfig, UploadConfig};
use profile_pictures::{AppState, DefaultHostResolver, InMemoryStorage, build_router};

fn build_app() -> Router {
    let host = DefaultHostResolver::new(&HostResolutionConfig::default(), "http://fallback:8080");
    let state = AppState::new(Arc::new(InMemoryStorage::new()), Arc::new(host));
    build_router(state, &UploadConfig::default())
}

fn request_id(resp: &axum::response::Response) -> String {
    resp.headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let resp = build_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(request_id(&resp).starts_with("req_"));
}

#[tokio::test]
async fn valid_client_request_id_is_echoed_and_unsafe_one_replaced() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/pictures")
                .header("x-request-id", "client.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /pictures");
    assert_eq!(request_id(&resp), "client.req-001");

    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/pictures")
                .header("x-request-id", "has space")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /pictures");
    let id = request_id(&resp);
    assert_ne!(id, "has space");
    assert!(id.starts_with("req_"));
}

#[tokio::test]
async fn problem_details_carry_request_id() {
    // 缺少 userId 的上传会得到 400 ProblemDetails
    let body = "------b\r\nContent-Disposition: form-data; name=\"fileUpload\"; filename=\"a.jpg\"\r\n\r\nx\r\n------b--\r\n";
    let resp = build_app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pictures")
                .header("x-request-id", "err.req-001")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=----b")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .expect("request upload");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let header_id = request_id(&resp);
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&bytes).expect("parse json");
    assert_eq!(json["requestId"].as_str(), Some(header_id.as_str()));
    assert_eq!(header_id, "err.req-001");
}
