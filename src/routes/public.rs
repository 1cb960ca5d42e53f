use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints open to any client. Handlers take `OptionalAuth`, so a token that is missing,
/// expired or unknown degrades to an anonymous read instead of a 401.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for load balancers.
        .route("/health", get(|| async { "ok" }))
        // GET /posts?pageNumber=&pageSize=&sortBy=&sortDirection=
        .route("/posts", get(handlers::get_posts))
        .route("/posts/{postId}", get(handlers::get_post_by_id))
        // GET /posts/{postId}/comments
        // 404 when the post itself does not exist.
        .route("/posts/{postId}/comments", get(handlers::get_comments_for_post))
        .route("/comments/{commentId}", get(handlers::get_comment_by_id))
}
