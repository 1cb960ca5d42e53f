use std::collections::HashMap;

use async_trait::async_trait;

use super::{Handler, Query, QueryOutcome, misrouted};
use crate::{
    auth::Viewer,
    error::{AppError, Result},
    models::{Comment, CommentView, Like, Post, PostView, SubjectKind},
    pagination::Paginated,
    repository::{Repository, RepositoryState},
    views,
};

/// How many recent likes a post view lists.
pub const NEWEST_LIKES_LIMIT: i64 = 3;

/// The viewer's like rows on `ids`, keyed by subject id. Anonymous viewers have none.
async fn viewer_likes(
    repo: &dyn Repository,
    kind: SubjectKind,
    ids: &[i64],
    viewer: &Viewer,
) -> Result<HashMap<i64, Like>> {
    let Some(user_id) = viewer.user_id() else {
        return Ok(HashMap::new());
    };
    let likes = repo.get_user_likes(kind, ids, user_id).await?;
    Ok(likes.into_iter().map(|like| (like.subject_id, like)).collect())
}

/// Builds post views for a batch of posts: one query each for counts, the viewer's rows and
/// the newest likes, regardless of how many posts are in the batch.
pub async fn load_post_views(
    repo: &dyn Repository,
    posts: Vec<Post>,
    viewer: &Viewer,
) -> Result<Vec<PostView>> {
    let ids: Vec<i64> = posts.iter().map(|post| post.id).collect();
    let counts = repo.get_like_counts(SubjectKind::Post, &ids).await?;
    let mine = viewer_likes(repo, SubjectKind::Post, &ids, viewer).await?;
    let mut newest = repo.get_newest_likes(&ids, NEWEST_LIKES_LIMIT).await?;

    Ok(posts
        .into_iter()
        .map(|post| {
            let id = post.id;
            views::post_view(
                post,
                counts.get(&id).copied().unwrap_or_default(),
                viewer,
                mine.get(&id),
                newest.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}

/// Comment counterpart of [`load_post_views`].
pub async fn load_comment_views(
    repo: &dyn Repository,
    comments: Vec<Comment>,
    viewer: &Viewer,
) -> Result<Vec<CommentView>> {
    let ids: Vec<i64> = comments.iter().map(|comment| comment.id).collect();
    let counts = repo.get_like_counts(SubjectKind::Comment, &ids).await?;
    let mine = viewer_likes(repo, SubjectKind::Comment, &ids, viewer).await?;

    Ok(comments
        .into_iter()
        .map(|comment| {
            let id = comment.id;
            views::comment_view(
                comment,
                counts.get(&id).copied().unwrap_or_default(),
                viewer,
                mine.get(&id),
            )
        })
        .collect())
}

/// Pops the single view out of a one-element batch.
fn single<T>(views: Vec<T>, what: String) -> Result<T> {
    views
        .into_iter()
        .next()
        .ok_or_else(|| AppError::not_found(what))
}

pub struct GetPostsHandler {
    repo: RepositoryState,
}

impl GetPostsHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Query> for GetPostsHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let query = match query {
            Query::GetPosts(query) => query,
            other => return Err(misrouted("GetPostsHandler", &other)),
        };

        let (posts, total) = self.repo.get_posts(&query.page).await?;
        let items = load_post_views(self.repo.as_ref(), posts, &query.viewer).await?;
        Ok(QueryOutcome::Posts(Paginated::new(items, total, &query.page)))
    }
}

pub struct GetPostByIdHandler {
    repo: RepositoryState,
}

impl GetPostByIdHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Query> for GetPostByIdHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let query = match query {
            Query::GetPostById(query) => query,
            other => return Err(misrouted("GetPostByIdHandler", &other)),
        };

        let what = format!("post {}", query.post_id);
        let post = self
            .repo
            .get_post(query.post_id)
            .await?
            .ok_or_else(|| AppError::not_found(what.clone()))?;

        let views = load_post_views(self.repo.as_ref(), vec![post], &query.viewer).await?;
        Ok(QueryOutcome::Post(single(views, what)?))
    }
}

pub struct GetCommentsForPostHandler {
    repo: RepositoryState,
}

impl GetCommentsForPostHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Query> for GetCommentsForPostHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let query = match query {
            Query::GetCommentsForPost(query) => query,
            other => return Err(misrouted("GetCommentsForPostHandler", &other)),
        };

        // An unknown post is a 404, not an empty page.
        if self.repo.get_post(query.post_id).await?.is_none() {
            return Err(AppError::not_found(format!("post {}", query.post_id)));
        }

        let (comments, total) = self
            .repo
            .get_comments_for_post(query.post_id, &query.page)
            .await?;
        let items = load_comment_views(self.repo.as_ref(), comments, &query.viewer).await?;
        Ok(QueryOutcome::Comments(Paginated::new(items, total, &query.page)))
    }
}

pub struct GetCommentByIdHandler {
    repo: RepositoryState,
}

impl GetCommentByIdHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Query> for GetCommentByIdHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let query = match query {
            Query::GetCommentById(query) => query,
            other => return Err(misrouted("GetCommentByIdHandler", &other)),
        };

        let what = format!("comment {}", query.comment_id);
        let comment = self
            .repo
            .get_comment(query.comment_id)
            .await?
            .ok_or_else(|| AppError::not_found(what.clone()))?;

        let views = load_comment_views(self.repo.as_ref(), vec![comment], &query.viewer).await?;
        Ok(QueryOutcome::Comment(single(views, what)?))
    }
}

pub struct GetBlogByIdHandler {
    repo: RepositoryState,
}

impl GetBlogByIdHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Query> for GetBlogByIdHandler {
    async fn handle(&self, query: Query) -> Result<QueryOutcome> {
        let query = match query {
            Query::GetBlogById(query) => query,
            other => return Err(misrouted("GetBlogByIdHandler", &other)),
        };

        let blog = self
            .repo
            .get_blog(query.blog_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("blog {}", query.blog_id)))?;
        Ok(QueryOutcome::Blog(views::blog_view(blog)))
    }
}
