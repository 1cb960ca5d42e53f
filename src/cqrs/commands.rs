use async_trait::async_trait;

use super::{Command, CommandOutcome, Handler, misrouted};
use crate::{
    error::{AppError, Result},
    models::{NewComment, NewPost},
    repository::RepositoryState,
};

pub struct CreateBlogHandler {
    repo: RepositoryState,
}

impl CreateBlogHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Command> for CreateBlogHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let command = match command {
            Command::CreateBlog(command) => command,
            other => return Err(misrouted("CreateBlogHandler", &other)),
        };

        let blog = self.repo.create_blog(command.input).await?;
        tracing::info!(blog_id = blog.id, "blog created");
        Ok(CommandOutcome::Created(blog.id))
    }
}

pub struct CreatePostHandler {
    repo: RepositoryState,
}

impl CreatePostHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Command> for CreatePostHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let command = match command {
            Command::CreatePost(command) => command,
            other => return Err(misrouted("CreatePostHandler", &other)),
        };

        let blog_id = command.blog_id;
        let post = NewPost {
            blog_id,
            title: command.input.title,
            short_description: command.input.short_description,
            content: command.input.content,
        };

        let post_id = self
            .repo
            .create_post(post)
            .await?
            .ok_or_else(|| AppError::not_found(format!("blog {blog_id}")))?;

        tracing::info!(post_id, blog_id, "post created");
        Ok(CommandOutcome::Created(post_id))
    }
}

/// CreateCommentHandler
///
/// Writes a comment on an existing post. The author's current login is copied into the
/// comment as it is at this moment; later renames do not touch existing comments.
pub struct CreateCommentHandler {
    repo: RepositoryState,
}

impl CreateCommentHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Command> for CreateCommentHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let command = match command {
            Command::CreateComment(command) => command,
            other => return Err(misrouted("CreateCommentHandler", &other)),
        };

        let author = self
            .repo
            .get_user(command.author_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown author".to_string()))?;

        let post_id = command.post_id;
        let comment = NewComment {
            post_id,
            content: command.content,
            user_id: author.id,
            user_login: author.login,
        };

        let comment_id = self
            .repo
            .create_comment(comment)
            .await?
            .ok_or_else(|| AppError::not_found(format!("post {post_id}")))?;

        tracing::info!(comment_id, post_id, author_id = %author.id, "comment created");
        Ok(CommandOutcome::Created(comment_id))
    }
}

/// UpdateLikeStatusHandler
///
/// Records a user's reaction to a post or comment. The existence check and the write are a
/// single upsert, so repeated or concurrent calls never duplicate the user's row.
pub struct UpdateLikeStatusHandler {
    repo: RepositoryState,
}

impl UpdateLikeStatusHandler {
    pub fn new(repo: RepositoryState) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl Handler<Command> for UpdateLikeStatusHandler {
    async fn handle(&self, command: Command) -> Result<CommandOutcome> {
        let command = match command {
            Command::UpdateLikeStatus(command) => command,
            other => return Err(misrouted("UpdateLikeStatusHandler", &other)),
        };

        let found = self
            .repo
            .set_like_status(command.subject, command.user_id, command.status)
            .await?;
        if !found {
            return Err(AppError::not_found(command.subject.to_string()));
        }

        tracing::debug!(
            subject = %command.subject,
            user_id = %command.user_id,
            status = %command.status,
            "like status set"
        );
        Ok(CommandOutcome::Completed)
    }
}
