use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Herald API",
        version = "0.1.0",
        description = "Recent local news discovered from allowlisted sites, filtered by topic, keyword and place."
    ),
    paths(
        crate::routes::news,
        crate::routes::topics,
        crate::routes::health,
    ),
    components(schemas(
        crate::dto::NewsItem,
        crate::dto::NewsResponse,
        crate::dto::TopicResponse,
        crate::dto::TopicListResponse,
        crate::dto::HealthResponse,
        crate::dto::ErrorResponse,
    )),
    tags(
        (name = "news", description = "Article discovery"),
        (name = "system", description = "Health and system status"),
    )
)]
pub struct ApiDoc;
