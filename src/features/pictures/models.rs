use serde::Serialize;

/// 上传表单（multipart/form-data），仅用于 OpenAPI 文档
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadForm {
    /// 图片文件
    #[schema(value_type = String, format = Binary)]
    pub file_upload: Vec<u8>,
    /// 用户 ID，决定对象 key（`<userId>.jpg`）
    #[schema(example = "alice")]
    pub user_id: String,
}
