//! 对外可见基础地址解析
//!
//! 上传成功后 `Location` 需要指向客户端可访问的地址；服务可能运行在反向代理之后，
//! 因此由 [`HostResolver`] 决定 `scheme://host[:port]`，处理器只负责拼接路径。

use axum::http::{HeaderMap, header};

use crate::config::{AppConfig, HostResolutionConfig};

/// 根据请求头解析对外基础地址（不带末尾 `/`）
pub trait HostResolver: Send + Sync {
    fn resolve(&self, headers: &HeaderMap) -> String;
}

/// 默认解析器：固定地址 > Forwarded > X-Forwarded-* > Host > 监听地址
#[derive(Debug, Clone)]
pub struct DefaultHostResolver {
    public_base_url: Option<String>,
    trust_forwarded_headers: bool,
    allowed_hosts: Vec<String>,
    fallback: String,
}

impl DefaultHostResolver {
    pub fn new(config: &HostResolutionConfig, fallback: impl Into<String>) -> Self {
        Self {
            public_base_url: config
                .public_base_url
                .as_deref()
                .map(|s| s.trim().trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            trust_forwarded_headers: config.trust_forwarded_headers,
            allowed_hosts: config
                .allowed_hosts
                .iter()
                .map(|s| s.trim().trim_end_matches('/').to_ascii_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            fallback: fallback.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.host_resolution, config.fallback_base_url())
    }

    fn resolve_from_headers(&self, headers: &HeaderMap) -> Option<(String, String)> {
        if self.trust_forwarded_headers {
            if let Some(found) = from_forwarded(headers) {
                return Some(found);
            }
            if let Some(found) = from_x_forwarded(headers) {
                return Some(found);
            }
        }
        let host = header_str(headers, header::HOST.as_str())?;
        is_valid_authority(host).then(|| ("http".to_string(), host.to_string()))
    }

    fn is_allowed(&self, base: &str, authority: &str) -> bool {
        if self.allowed_hosts.is_empty() {
            return true;
        }
        let base = base.to_ascii_lowercase();
        let authority = authority.to_ascii_lowercase();
        let hostname = strip_port(&authority);
        self.allowed_hosts
            .iter()
            .any(|a| *a == base || *a == authority || *a == hostname)
    }
}

impl HostResolver for DefaultHostResolver {
    fn resolve(&self, headers: &HeaderMap) -> String {
        if let Some(fixed) = &self.public_base_url {
            return fixed.clone();
        }
        let Some((scheme, authority)) = self.resolve_from_headers(headers) else {
            return self.fallback.clone();
        };
        let base = format!("{scheme}://{authority}");
        if self.is_allowed(&base, &authority) {
            base
        } else {
            tracing::warn!("主机 {} 不在 allowed_hosts 中，回退为 {}", authority, self.fallback);
            self.fallback.clone()
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// 多值头（逗号分隔，最靠近客户端的在最前）只取第一个
fn first_value(raw: &str) -> &str {
    raw.split(',').next().unwrap_or("").trim()
}

/// RFC 7239: `Forwarded: for=1.2.3.4;host=example.com;proto=https`
fn from_forwarded(headers: &HeaderMap) -> Option<(String, String)> {
    let element = first_value(header_str(headers, "forwarded")?);
    let mut host = None;
    let mut proto = None;
    for pair in element.split(';') {
        let Some((k, v)) = pair.split_once('=') else {
            continue;
        };
        let v = v.trim().trim_matches('"');
        match k.trim().to_ascii_lowercase().as_str() {
            "host" => host = Some(v),
            "proto" => proto = Some(v),
            _ => {}
        }
    }
    let host = host.filter(|h| is_valid_authority(h))?;
    Some((normalize_scheme(proto), host.to_string()))
}

fn from_x_forwarded(headers: &HeaderMap) -> Option<(String, String)> {
    let host = first_value(header_str(headers, "x-forwarded-host")?);
    if !is_valid_authority(host) {
        return None;
    }
    let scheme = normalize_scheme(header_str(headers, "x-forwarded-proto").map(first_value));
    let port = header_str(headers, "x-forwarded-port")
        .map(first_value)
        .and_then(|p| p.parse::<u16>().ok());

    let authority = match port {
        Some(p) if !has_port(host) && !is_default_port(&scheme, p) => format!("{host}:{p}"),
        _ => host.to_string(),
    };
    Some((scheme, authority))
}

fn normalize_scheme(proto: Option<&str>) -> String {
    match proto.map(|p| p.to_ascii_lowercase()) {
        Some(p) if p == "https" => "https".to_string(),
        _ => "http".to_string(),
    }
}

fn is_default_port(scheme: &str, port: u16) -> bool {
    matches!((scheme, port), ("http", 80) | ("https", 443))
}

fn has_port(authority: &str) -> bool {
    strip_port(authority) != authority
}

/// 去掉端口部分（兼容 `[::1]:8080` 形式）
fn strip_port(authority: &str) -> &str {
    if let Some(end) = authority.rfind(']') {
        return &authority[..=end];
    }
    match authority.rsplit_once(':') {
        Some((h, p)) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => h,
        _ => authority,
    }
}

fn is_valid_authority(v: &str) -> bool {
    !v.is_empty()
        && v.len() <= 255
        && v.bytes().all(|b| {
            b.is_ascii_alphanumeric() || matches!(b, b'.' | b'-' | b'_' | b':' | b'[' | b']')
        })
}
