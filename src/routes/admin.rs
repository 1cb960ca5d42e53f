use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Super Admin Router Module
///
/// Nested under `/sa` and wrapped in `admin_middleware`, which checks HTTP Basic
/// credentials against `ADMIN_LOGIN`/`ADMIN_PASSWORD` before any handler runs.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // POST /sa/blogs
        .route("/blogs", post(handlers::create_blog))
        // POST /sa/blogs/{blogId}/posts
        // 404 when the blog does not exist; no orphan post is written.
        .route("/blogs/{blogId}/posts", post(handlers::create_post_for_blog))
}
