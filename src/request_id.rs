use axum::{
    extract::Request,
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use std::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

/// 请求追踪 ID 的头部名称
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

tokio::task_local! {
    static CURRENT_REQUEST_ID: String;
}

/// 获取当前请求上下文中的 request_id（请求作用域外返回 None）。
pub fn current_request_id() -> Option<String> {
    CURRENT_REQUEST_ID.try_with(Clone::clone).ok()
}

/// 客户端传入的 ID 只接受有限字符集，避免日志/响应头注入
fn accept_client_id(v: &str) -> bool {
    (1..=128).contains(&v.len())
        && v.bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
}

fn request_id_for(req: &Request) -> String {
    req.headers()
        .get(&REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| accept_client_id(v))
        .map(str::to_string)
        .unwrap_or_else(|| format!("req_{}", Uuid::new_v4().simple()))
}

/// request_id 中间件：
/// - 透传合法的 `X-Request-Id`，否则生成新的
/// - 整个请求处理在带 request_id 的 tracing span 内执行
/// - 回写到响应头，并供错误响应体读取
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let request_id = request_id_for(&req);
    let span = tracing::info_span!(
        "http",
        request_id = %request_id,
        method = %req.method(),
        path = %req.uri().path()
    );

    let started = Instant::now();
    let mut res = CURRENT_REQUEST_ID
        .scope(request_id.clone(), next.run(req).instrument(span.clone()))
        .await;

    span.in_scope(|| {
        tracing::info!(
            status = res.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "请求完成"
        );
    });

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        res.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
    }
    res
}

#[cfg(test)]
mod tests {
    use super::accept_client_id;

    #[test]
    fn client_ids_with_safe_chars_are_accepted() {
        assert!(accept_client_id("req-123_abc.def"));
        assert!(accept_client_id(&"a".repeat(128)));
    }

    #[test]
    fn client_ids_that_are_empty_long_or_unsafe_are_rejected() {
        assert!(!accept_client_id(""));
        assert!(!accept_client_id(&"a".repeat(129)));
        assert!(!accept_client_id("bad id"));
        assert!(!accept_client_id("bad/xx"));
    }
}
