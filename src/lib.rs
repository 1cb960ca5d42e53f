use std::sync::Arc;

use axum::{
    Router,
    extract::{FromRef, Request},
    http::HeaderName,
    middleware::{self, Next},
    response::Response,
};
use utoipa::{
    Modify, OpenApi,
    openapi::security::{Http, HttpAuthScheme, HttpBuilder, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod cqrs;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod memory;
pub mod models;
pub mod pagination;
pub mod repository;
pub mod views;

// Routers grouped by guard (public, authenticated, admin, testing).
pub mod routes;
use auth::{AdminAuth, AuthUser};
use routes::{admin, authenticated, public, testing};

// --- Public Re-exports ---

pub use auth::{AuthenticatorState, JwtAuthenticator};
pub use config::AppConfig;
pub use cqrs::{CommandBus, QueryBus};
pub use error::AppError;
pub use memory::InMemoryRepository;
pub use repository::{PostgresRepository, RepositoryState};

/// ApiDoc
///
/// OpenAPI document for every handler annotated with `#[utoipa::path]`. Served at
/// `/api-docs/openapi.json` when `IS_SWAGGER_ENABLED` is on.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::get_posts, handlers::get_post_by_id, handlers::update_post_like_status,
        handlers::get_comments_for_post, handlers::create_comment, handlers::get_comment_by_id,
        handlers::update_comment_like_status, handlers::create_blog,
        handlers::create_post_for_blog, handlers::delete_all_data
    ),
    components(
        schemas(
            models::LikeStatus, models::LikeInput, models::CreateCommentInput,
            models::CreateBlogInput, models::CreatePostInput, models::LikesInfo,
            models::ExtendedLikesInfo, models::NewestLike, models::CommentatorInfo,
            models::CommentView, models::PostView, models::BlogView,
            error::FieldError, error::ValidationErrorResponse, error::ErrorResponse,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Posts", description = "Posts, their comments and reactions"),
        (name = "Comments", description = "Single comments and reactions"),
        (name = "Blogs", description = "Super admin blog management"),
        (name = "Testing", description = "End-to-end test support")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            );
            components.add_security_scheme(
                "basic",
                SecurityScheme::Http(Http::new(HttpAuthScheme::Basic)),
            );
        }
    }
}

/// AppState
///
/// Everything a request needs, cloned cheaply into each handler. The buses are built once
/// from `repo` so that handlers and dispatchers always share the same store.
#[derive(Clone)]
pub struct AppState {
    /// Persistence: Postgres in production, in-memory in tests.
    pub repo: RepositoryState,
    /// Resolves bearer credentials into an `AuthUser`.
    pub auth: AuthenticatorState,
    pub commands: Arc<CommandBus>,
    pub queries: Arc<QueryBus>,
    pub config: AppConfig,
}

impl AppState {
    pub fn new(repo: RepositoryState, auth: AuthenticatorState, config: AppConfig) -> Self {
        Self {
            commands: Arc::new(cqrs::command_bus(repo.clone())),
            queries: Arc::new(cqrs::query_bus(repo.clone())),
            repo,
            auth,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for AuthenticatorState {
    fn from_ref(app_state: &AppState) -> AuthenticatorState {
        app_state.auth.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// auth_middleware
///
/// Guard for `authenticated_routes`. Extracting `AuthUser` rejects with 401 before the
/// handler runs when the bearer credential is missing or invalid.
async fn auth_middleware(_auth_user: AuthUser, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// admin_middleware
///
/// Guard for the `/sa` routes: HTTP Basic credentials must match the configured admin.
async fn admin_middleware(_admin: AdminAuth, request: Request, next: Next) -> Response {
    next.run(request).await
}

/// create_router
///
/// Assembles every route group with its guard, mounts the optional Swagger UI and testing
/// routes according to `config`, and wraps the result in the observability layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let mut base_router = Router::new()
        .merge(public::public_routes())
        .merge(
            authenticated::authenticated_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                auth_middleware,
            )),
        )
        .nest(
            "/sa",
            admin::admin_routes().route_layer(middleware::from_fn_with_state(
                state.clone(),
                admin_middleware,
            )),
        );

    if state.config.include_testing_module {
        tracing::warn!("testing module enabled: DELETE /testing/all-data is mounted");
        base_router = base_router.nest("/testing", testing::testing_routes());
    }

    let mut app = base_router.with_state(state.clone());

    if state.config.is_swagger_enabled {
        app = app.merge(
            SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()),
        );
    }

    app.layer(
        ServiceBuilder::new()
            .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
            .layer(
                TraceLayer::new_for_http()
                    .make_span_with(trace_span_logger)
                    .on_response(
                        DefaultOnResponse::new()
                            .level(Level::INFO)
                            .latency_unit(tower_http::LatencyUnit::Millis),
                    ),
            )
            .layer(PropagateRequestIdLayer::new(x_request_id)),
    )
    .layer(cors)
}

/// trace_span_logger
///
/// Span for each request, tagged with the `x-request-id` set by `SetRequestIdLayer` so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
