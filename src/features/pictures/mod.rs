pub mod handler;
pub mod models;

use percent_encoding::{AsciiSet, CONTROLS, utf8_percent_encode};

pub use handler::{
    PREFIX, create_pictures_router, delete_picture, download_picture, list_pictures,
    upload_picture,
};
pub use models::UploadForm;

/// 路径段中需要转义的字符（RFC 3986 path segment 之外的字符，以及 `/` 与 `%`）
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'[')
    .add(b'\\')
    .add(b']')
    .add(b'^')
    .add(b'`')
    .add(b'{')
    .add(b'|')
    .add(b'}');

/// 每个用户对应一个对象：`<userId>.jpg`
///
/// 不对 userId 做任何清洗；空串得到 `.jpg`。
pub fn picture_key(user_id: &str) -> String {
    format!("{user_id}.jpg")
}

/// 将 userId 编码为单个 URL 路径段
pub fn encode_path_segment(segment: &str) -> String {
    utf8_percent_encode(segment, PATH_SEGMENT).to_string()
}
