use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{post, put},
};

/// Authenticated Router Module
///
/// Every route here sits behind `auth_middleware`, and each handler also takes `AuthUser`
/// to learn who is acting.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // PUT /posts/{postId}/like-status
        // Upserts the caller's reaction; "None" withdraws it.
        .route(
            "/posts/{postId}/like-status",
            put(handlers::update_post_like_status),
        )
        // POST /posts/{postId}/comments
        // The commentator login is snapshotted from the caller's account.
        .route("/posts/{postId}/comments", post(handlers::create_comment))
        .route(
            "/comments/{commentId}/like-status",
            put(handlers::update_comment_like_status),
        )
}
