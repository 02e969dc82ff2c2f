use axum::{
    Router,
    body::{Body, Bytes},
    extract::{Multipart, Path, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    response::{IntoResponse, Json, Response},
    routing::get,
};
use std::collections::BTreeSet;

use super::{encode_path_segment, picture_key};
use crate::error::AppError;
use crate::state::AppState;
use crate::storage::{ObjectEntry, UploadRequest};

/// 路由前缀
pub const PREFIX: &str = "/pictures";

const FILE_FIELD: &str = "fileUpload";
const USER_ID_FIELD: &str = "userId";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";
const JPEG_CONTENT_TYPE: &str = "image/jpeg";

pub fn create_pictures_router() -> Router<AppState> {
    Router::new()
        .route(PREFIX, get(list_pictures).post(upload_picture))
        .route(
            &format!("{PREFIX}/:user_id"),
            get(download_picture).delete(delete_picture),
        )
}

#[utoipa::path(
    get,
    path = "/pictures",
    summary = "列出所有头像",
    description = "返回存储中的全部对象 key，按字典序升序排列。",
    responses(
        (status = 200, description = "对象 key 列表", body = Vec<String>),
        (
            status = 500,
            description = "存储错误",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        )
    ),
    tag = "Pictures"
)]
pub async fn list_pictures(State(state): State<AppState>) -> Result<Json<Vec<String>>, AppError> {
    let keys: BTreeSet<String> = state.storage.list().await?.into_iter().collect();
    Ok(Json(keys.into_iter().collect()))
}

#[utoipa::path(
    post,
    path = "/pictures",
    summary = "上传头像",
    description = "以 `<userId>.jpg` 为 key 写入对象存储（已存在则覆盖）。不校验图片内容与 userId。",
    request_body(content = super::models::UploadForm, content_type = "multipart/form-data"),
    responses(
        (
            status = 201,
            description = "已创建",
            headers(
                ("Location" = String, description = "头像下载地址"),
                ("ETag" = String, description = "存储返回的内容标识")
            )
        ),
        (
            status = 400,
            description = "multipart 无法解码或缺少字段",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        ),
        (
            status = 413,
            description = "上传内容超过 upload.max_bytes",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        ),
        (
            status = 500,
            description = "存储错误",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        )
    ),
    tag = "Pictures"
)]
pub async fn upload_picture(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut user_id: Option<String> = None;
    let mut file: Option<(String, Bytes)> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or_default().to_string();
        if name == USER_ID_FIELD {
            user_id = Some(field.text().await?);
        } else if name == FILE_FIELD || field.file_name().is_some() {
            let content_type = field
                .content_type()
                .unwrap_or(DEFAULT_CONTENT_TYPE)
                .to_string();
            file = Some((content_type, field.bytes().await?));
        }
    }

    let user_id =
        user_id.ok_or_else(|| AppError::BadRequest(format!("缺少 {USER_ID_FIELD} 字段")))?;
    let (content_type, bytes) =
        file.ok_or_else(|| AppError::BadRequest(format!("缺少 {FILE_FIELD} 文件")))?;

    let key = picture_key(&user_id);
    let size = bytes.len();
    let uploaded = state
        .storage
        .upload(UploadRequest::new(key, content_type, bytes))
        .await?;
    tracing::info!(key = %uploaded.key, size, etag = %uploaded.etag, "头像已上传");

    let location = format!(
        "{}{}{}/{}",
        state.host_resolver.resolve(&headers),
        state.api_prefix,
        PREFIX,
        encode_path_segment(&user_id)
    );
    let location = HeaderValue::from_str(&location)
        .map_err(|e| AppError::Internal(format!("Location 头无效: {e}")))?;
    let etag = HeaderValue::from_str(&uploaded.etag)
        .map_err(|e| AppError::Internal(format!("ETag 头无效: {e}")))?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location), (header::ETAG, etag)],
    )
        .into_response())
}

#[utoipa::path(
    get,
    path = "/pictures/{user_id}",
    summary = "下载头像",
    description = "以附件形式流式返回 JPEG；对象不存在时返回空 404。",
    params(("user_id" = String, Path, description = "用户 ID")),
    responses(
        (status = 200, description = "JPEG 字节流"),
        (status = 404, description = "头像不存在"),
        (
            status = 500,
            description = "存储错误",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        )
    ),
    tag = "Pictures"
)]
pub async fn download_picture(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<Response, AppError> {
    let key = picture_key(&user_id);
    match state.storage.retrieve(&key).await? {
        Some(entry) => streamed_jpeg(entry),
        None => {
            tracing::debug!(key = %key, "头像不存在");
            Ok(StatusCode::NOT_FOUND.into_response())
        }
    }
}

#[utoipa::path(
    delete,
    path = "/pictures/{user_id}",
    summary = "删除头像",
    description = "删除 `<userId>.jpg`；对象不存在时同样返回成功。",
    params(("user_id" = String, Path, description = "用户 ID")),
    responses(
        (status = 200, description = "已删除"),
        (
            status = 500,
            description = "存储错误",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        )
    ),
    tag = "Pictures"
)]
pub async fn delete_picture(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let key = picture_key(&user_id);
    state.storage.delete(&key).await?;
    tracing::info!(key = %key, "头像已删除");
    Ok(StatusCode::OK)
}

/// 内容类型固定为 JPEG，与存储中记录的类型无关
fn streamed_jpeg(entry: ObjectEntry) -> Result<Response, AppError> {
    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, JPEG_CONTENT_TYPE)
        .header(header::CONTENT_DISPOSITION, attachment_disposition(&entry.key));
    if let Some(len) = entry.content_length {
        builder = builder.header(header::CONTENT_LENGTH, len);
    }
    builder
        .body(Body::from_stream(entry.stream))
        .map_err(|e| AppError::Internal(format!("构建下载响应失败: {e}")))
}

/// `attachment; filename="<ascii 回退>"; filename*=UTF-8''<编码>`
fn attachment_disposition(filename: &str) -> String {
    let fallback: String = filename
        .chars()
        .map(|c| {
            if (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "attachment; filename=\"{fallback}\"; filename*=UTF-8''{}",
        encode_path_segment(filename)
    )
}

#[cfg(test)]
mod tests {
    use super::attachment_disposition;

    #[test]
    fn disposition_for_plain_key() {
        assert_eq!(
            attachment_disposition("alice.jpg"),
            "attachment; filename=\"alice.jpg\"; filename*=UTF-8''alice.jpg"
        );
    }

    #[test]
    fn disposition_replaces_quotes_and_non_ascii_in_fallback() {
        let v = attachment_disposition("a\"b名.jpg");
        assert!(v.starts_with("attachment; filename=\"a_b_.jpg\""), "{v}");
        assert!(v.ends_with("filename*=UTF-8''a%22b%E5%90%8D.jpg"), "{v}");
    }
}
