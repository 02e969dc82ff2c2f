use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

use profile_pictures::config::{HostResolutionConfig, UploadConfig};
use profile_pictures::{AppState, DefaultHostResolver, LocalStorage, build_router};

#[tokio::test]
async fn filesystem_backend_streams_uploaded_picture() {
    let dir = TempDir::new().expect("tempdir");
    let storage = LocalStorage::new(dir.path());
    let host = DefaultHostResolver::new(
        &HostResolutionConfig {
            public_base_url: Some("https://cdn.example.com".into()),
            ..Default::default()
        },
        "http://fallback:8080",
    );
    let app = build_router(
        AppState::new(Arc::new(storage), Arc::new(host)),
        &UploadConfig::default(),
    );

    let payload = vec![7u8; 64 * 1024];
    let mut body = Vec::new();
    body.extend_from_slice(
        b"--xx\r\nContent-Disposition: form-data; name=\"userId\"\r\n\r\nzoe\r\n--xx\r\nContent-Disposition: form-data; name=\"fileUpload\"; filename=\"z.jpg\"\r\nContent-Type: image/jpeg\r\n\r\n",
    );
    body.extend_from_slice(&payload);
    body.extend_from_slice(b"\r\n--xx--\r\n");

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/pictures")
                .header(header::CONTENT_TYPE, "multipart/form-data; boundary=xx")
                .body(Body::from(body))
                .unwrap(),
        )
        .await
        .expect("upload");
    assert_eq!(resp.status(), StatusCode::CREATED);
    assert_eq!(
        resp.headers().get(header::LOCATION).unwrap(),
        "https://cdn.example.com/pictures/zoe"
    );
    assert!(dir.path().join("zoe.jpg").is_file());

    let resp = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/pictures/zoe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("download");
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(
        resp.headers().get(header::CONTENT_LENGTH).unwrap(),
        &payload.len().to_string()
    );
    let bytes = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    assert_eq!(bytes.as_ref(), payload.as_slice());

    let resp = app
        .oneshot(
            Request::builder()
                .method("DELETE")
                .uri("/pictures/zoe")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("delete");
    assert_eq!(resp.status(), StatusCode::OK);
    assert!(!dir.path().join("zoe.jpg").exists());
}
