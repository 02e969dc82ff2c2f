use axum::{Router, extract::DefaultBodyLimit, routing::get};
use tower_http::compression::CompressionLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::UploadConfig;
use crate::features::{health::health_check, pictures::create_pictures_router};
use crate::openapi::ApiDoc;
use crate::request_id::request_id_middleware;
use crate::state::AppState;

/// 压缩策略：明确排除不该压缩的响应。
///
/// 头像下载本身是 JPEG，再压缩只浪费 CPU；JSON 列表与错误体仍然压缩。
pub fn compression_predicate() -> impl tower_http::compression::predicate::Predicate {
    use tower_http::compression::predicate::{NotForContentType, Predicate, SizeAbove};

    SizeAbove::default()
        .and(NotForContentType::GRPC)
        .and(NotForContentType::IMAGES)
        .and(NotForContentType::SSE)
        .and(NotForContentType::const_new("application/octet-stream"))
}

/// 组装完整路由：健康检查、业务接口（挂载在 api 前缀下）、文档与全局中间件
pub fn build_router(state: AppState, upload: &UploadConfig) -> Router {
    let pictures = create_pictures_router();
    let api = if state.api_prefix.is_empty() {
        pictures
    } else {
        Router::new().nest(&state.api_prefix, pictures)
    };

    Router::<AppState>::new()
        .route("/health", get(health_check))
        .merge(api)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(upload.max_bytes))
        .layer(CompressionLayer::new().compress_when(compression_predicate()))
        .layer(axum::middleware::from_fn(request_id_middleware))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::compression_predicate;
    use axum::body::Body;
    use axum::http::{Response as HttpResponse, header};
    use tower_http::compression::predicate::Predicate;

    fn should_compress_for(ct: &str) -> bool {
        // 命中 SizeAbove（默认 32B），避免因为 body 太小导致测试不稳定。
        let resp = HttpResponse::builder()
            .header(header::CONTENT_TYPE, ct)
            .body(Body::from(vec![b'x'; 2048]))
            .unwrap();
        compression_predicate().should_compress(&resp)
    }

    #[test]
    fn jpeg_downloads_are_not_compressed() {
        assert!(!should_compress_for("image/jpeg"));
        assert!(!should_compress_for("application/octet-stream"));
    }

    #[test]
    fn json_listing_and_problem_details_are_compressed() {
        assert!(should_compress_for("application/json"));
        assert!(should_compress_for("application/problem+json"));
    }
}
