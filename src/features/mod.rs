/// 健康检查
pub mod health;
/// 头像图片（列举/上传/下载/删除）
pub mod pictures;
