use super::handlers::{health, login, signup};
use utoipa::OpenApi;
use utoipa_axum::{router::OpenApiRouter, routes};

// Title, version, description, contact and license come from Cargo.toml.
#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "health", description = "Service liveness"),
        (name = "auth", description = "Username and password signup and login"),
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    )
)]
struct ApiDoc;

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Routes registered here are also documented. `OPTIONS /health` and the
/// static fallback are added on the plain router.
pub(crate) fn api_router() -> OpenApiRouter {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(health::health))
        .routes(routes!(signup::signup))
        .routes(routes!(login::login))
}
