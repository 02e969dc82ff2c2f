use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::pictures::handler::list_pictures,
        crate::features::pictures::handler::upload_picture,
        crate::features::pictures::handler::download_picture,
        crate::features::pictures::handler::delete_picture,
    ),
    components(schemas(
        crate::error::ProblemDetails,
        crate::features::health::HealthResponse,
        crate::features::pictures::UploadForm,
    )),
    tags(
        (name = "Pictures", description = "头像：列举、上传、下载与删除。对象 key 固定为 `<userId>.jpg`。"),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Profile Pictures API",
        version = env!("CARGO_PKG_VERSION"),
        description = "头像存储服务（Axum + utoipa）。业务接口挂载在 `config.api.prefix` 下（默认根路径），OpenAPI 的 paths 不包含该前缀。"
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::ApiDoc;
    use utoipa::OpenApi;

    #[test]
    fn openapi_lists_all_picture_routes() {
        let doc = ApiDoc::openapi();
        let paths = &doc.paths.paths;
        assert!(paths.contains_key("/pictures"));
        assert!(paths.contains_key("/pictures/{user_id}"));
        assert!(paths.contains_key("/health"));
    }
}
