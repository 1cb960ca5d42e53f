use axum::{
    Json,
    extract::State,
    http::StatusCode,
};

use crate::{
    AppState,
    auth::{AuthUser, OptionalAuth, Viewer},
    cqrs::{
        Command, CreateBlogCommand, CreateCommentCommand, CreatePostCommand,
        GetBlogByIdQuery, GetCommentByIdQuery, GetCommentsForPostQuery, GetPostByIdQuery,
        GetPostsQuery, Query, UpdateLikeStatusCommand,
    },
    error::{ErrorResponse, Result, ValidationErrorResponse},
    extract::{EntityId, ParsedQuery, ValidatedJson},
    models::{
        BlogView, CommentView, CreateBlogInput, CreateCommentInput, CreatePostInput, LikeInput,
        PostView, Subject,
    },
    pagination::{Paginated, PaginationParams},
};

// --- Posts ---

/// get_posts
///
/// [Public Route] One page of posts. Like aggregates are personalized when the request
/// carries a valid bearer token and anonymous otherwise.
#[utoipa::path(
    get,
    path = "/posts",
    tag = "Posts",
    params(PaginationParams),
    responses((status = 200, description = "Page of posts", body = Paginated<PostView>))
)]
pub async fn get_posts(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    ParsedQuery(params): ParsedQuery<PaginationParams>,
) -> Result<Json<Paginated<PostView>>> {
    let query = Query::GetPosts(GetPostsQuery {
        viewer,
        page: params.into_page_query(),
    });
    let page = state.queries.execute(query).await?.into_posts()?;
    Ok(Json(page))
}

/// get_post_by_id
///
/// [Public Route] A single post.
#[utoipa::path(
    get,
    path = "/posts/{postId}",
    tag = "Posts",
    params(("postId" = i64, Path, description = "Post ID")),
    responses(
        (status = 200, description = "Found", body = PostView),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_post_by_id(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    EntityId(post_id): EntityId,
) -> Result<Json<PostView>> {
    let query = Query::GetPostById(GetPostByIdQuery { viewer, post_id });
    let post = state.queries.execute(query).await?.into_post()?;
    Ok(Json(post))
}

/// update_post_like_status
///
/// [Authenticated Route] Sets the caller's reaction to a post. Repeating the same status
/// is a no-op.
#[utoipa::path(
    put,
    path = "/posts/{postId}/like-status",
    tag = "Posts",
    params(("postId" = i64, Path, description = "Post ID")),
    request_body = LikeInput,
    responses(
        (status = 204, description = "Like status updated"),
        (status = 400, description = "Invalid likeStatus", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "If post with specified postId does not exist", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn update_post_like_status(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(post_id): EntityId,
    ValidatedJson(input): ValidatedJson<LikeInput>,
) -> Result<StatusCode> {
    let command = Command::UpdateLikeStatus(UpdateLikeStatusCommand {
        user_id: user.id,
        subject: Subject::post(post_id),
        status: input.status(),
    });
    state.commands.execute(command).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Comments ---

/// get_comments_for_post
///
/// [Public Route] One page of a post's comments.
#[utoipa::path(
    get,
    path = "/posts/{postId}/comments",
    tag = "Posts",
    params(("postId" = i64, Path, description = "Post ID"), PaginationParams),
    responses(
        (status = 200, description = "Page of comments", body = Paginated<CommentView>),
        (status = 404, description = "If post with specified postId does not exist", body = ErrorResponse)
    )
)]
pub async fn get_comments_for_post(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    EntityId(post_id): EntityId,
    ParsedQuery(params): ParsedQuery<PaginationParams>,
) -> Result<Json<Paginated<CommentView>>> {
    let query = Query::GetCommentsForPost(GetCommentsForPostQuery {
        viewer,
        post_id,
        page: params.into_page_query(),
    });
    let page = state.queries.execute(query).await?.into_comments()?;
    Ok(Json(page))
}

/// create_comment
///
/// [Authenticated Route] Writes a comment on a post and returns it as the author sees it.
#[utoipa::path(
    post,
    path = "/posts/{postId}/comments",
    tag = "Posts",
    params(("postId" = i64, Path, description = "Post ID")),
    request_body = CreateCommentInput,
    responses(
        (status = 201, description = "Returns the newly created comment", body = CommentView),
        (status = 400, description = "Invalid content", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "If post with specified postId does not exist", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn create_comment(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(post_id): EntityId,
    ValidatedJson(input): ValidatedJson<CreateCommentInput>,
) -> Result<(StatusCode, Json<CommentView>)> {
    let command = Command::CreateComment(CreateCommentCommand {
        author_id: user.id,
        post_id,
        content: input.content.trim().to_string(),
    });
    let comment_id = state.commands.execute(command).await?.created_id()?;

    let query = Query::GetCommentById(GetCommentByIdQuery {
        viewer: user.viewer(),
        comment_id,
    });
    let comment = state.queries.execute(query).await?.into_comment()?;
    Ok((StatusCode::CREATED, Json(comment)))
}

/// get_comment_by_id
///
/// [Public Route] A single comment.
#[utoipa::path(
    get,
    path = "/comments/{commentId}",
    tag = "Comments",
    params(("commentId" = i64, Path, description = "Comment ID")),
    responses(
        (status = 200, description = "Found", body = CommentView),
        (status = 404, description = "Not Found", body = ErrorResponse)
    )
)]
pub async fn get_comment_by_id(
    OptionalAuth(viewer): OptionalAuth,
    State(state): State<AppState>,
    EntityId(comment_id): EntityId,
) -> Result<Json<CommentView>> {
    let query = Query::GetCommentById(GetCommentByIdQuery { viewer, comment_id });
    let comment = state.queries.execute(query).await?.into_comment()?;
    Ok(Json(comment))
}

/// update_comment_like_status
///
/// [Authenticated Route] Sets the caller's reaction to a comment.
#[utoipa::path(
    put,
    path = "/comments/{commentId}/like-status",
    tag = "Comments",
    params(("commentId" = i64, Path, description = "Comment ID")),
    request_body = LikeInput,
    responses(
        (status = 204, description = "Like status updated"),
        (status = 400, description = "Invalid likeStatus", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "If comment with specified id does not exist", body = ErrorResponse)
    ),
    security(("bearer" = []))
)]
pub async fn update_comment_like_status(
    user: AuthUser,
    State(state): State<AppState>,
    EntityId(comment_id): EntityId,
    ValidatedJson(input): ValidatedJson<LikeInput>,
) -> Result<StatusCode> {
    let command = Command::UpdateLikeStatus(UpdateLikeStatusCommand {
        user_id: user.id,
        subject: Subject::comment(comment_id),
        status: input.status(),
    });
    state.commands.execute(command).await?;
    Ok(StatusCode::NO_CONTENT)
}

// --- Super Admin ---

/// create_blog
///
/// [Admin Route] Creates a blog. Guarded by HTTP Basic credentials at the router level.
#[utoipa::path(
    post,
    path = "/sa/blogs",
    tag = "Blogs",
    request_body = CreateBlogInput,
    responses(
        (status = 201, description = "Returns the newly created blog", body = BlogView),
        (status = 400, description = "Invalid input", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse)
    ),
    security(("basic" = []))
)]
pub async fn create_blog(
    State(state): State<AppState>,
    ValidatedJson(input): ValidatedJson<CreateBlogInput>,
) -> Result<(StatusCode, Json<BlogView>)> {
    let command = Command::CreateBlog(CreateBlogCommand { input });
    let blog_id = state.commands.execute(command).await?.created_id()?;

    let blog = state
        .queries
        .execute(Query::GetBlogById(GetBlogByIdQuery { blog_id }))
        .await?
        .into_blog()?;
    Ok((StatusCode::CREATED, Json(blog)))
}

/// create_post_for_blog
///
/// [Admin Route] Creates a post inside an existing blog.
#[utoipa::path(
    post,
    path = "/sa/blogs/{blogId}/posts",
    tag = "Blogs",
    params(("blogId" = i64, Path, description = "Blog ID")),
    request_body = CreatePostInput,
    responses(
        (status = 201, description = "Returns the newly created post", body = PostView),
        (status = 400, description = "Invalid input", body = ValidationErrorResponse),
        (status = 401, description = "Unauthorized", body = ErrorResponse),
        (status = 404, description = "If blog with specified id does not exist", body = ErrorResponse)
    ),
    security(("basic" = []))
)]
pub async fn create_post_for_blog(
    State(state): State<AppState>,
    EntityId(blog_id): EntityId,
    ValidatedJson(input): ValidatedJson<CreatePostInput>,
) -> Result<(StatusCode, Json<PostView>)> {
    let command = Command::CreatePost(CreatePostCommand { blog_id, input });
    let post_id = state.commands.execute(command).await?.created_id()?;

    let query = Query::GetPostById(GetPostByIdQuery {
        viewer: Viewer::Anonymous,
        post_id,
    });
    let post = state.queries.execute(query).await?.into_post()?;
    Ok((StatusCode::CREATED, Json(post)))
}

// --- Testing ---

/// delete_all_data
///
/// [Testing Route] Wipes blogs, posts, comments and likes. Only mounted when
/// `INCLUDE_TESTING_MODULE` is enabled.
#[utoipa::path(
    delete,
    path = "/testing/all-data",
    tag = "Testing",
    responses((status = 204, description = "All data is deleted"))
)]
pub async fn delete_all_data(State(state): State<AppState>) -> Result<StatusCode> {
    state.repo.delete_all_data().await?;
    Ok(StatusCode::NO_CONTENT)
}
