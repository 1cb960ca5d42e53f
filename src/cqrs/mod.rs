//! Command/query dispatch.
//!
//! Writes travel as a [`Command`], reads as a [`Query`]. Each is routed through a
//! [`Dispatcher`] that holds an explicit table from message kind to handler, filled once at
//! startup by [`command_bus`] and [`query_bus`].

use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    auth::Viewer,
    error::{AppError, Result},
    models::{
        BlogView, CommentView, CreateBlogInput, CreatePostInput, LikeStatus, PostView, Subject,
    },
    pagination::{CommentSortField, PageQuery, Paginated, PostSortField},
    repository::RepositoryState,
};

pub mod commands;
pub mod queries;

/// A message the dispatcher can route.
pub trait Message: fmt::Debug + Send + 'static {
    type Kind: Copy + Eq + Hash + fmt::Debug + Send + Sync + 'static;
    type Outcome: Send + 'static;

    fn kind(&self) -> Self::Kind;
}

#[async_trait]
pub trait Handler<M: Message>: Send + Sync {
    async fn handle(&self, message: M) -> Result<M::Outcome>;
}

/// Dispatcher
///
/// Routing table from message kind to the one handler registered for it.
pub struct Dispatcher<M: Message> {
    handlers: HashMap<M::Kind, Arc<dyn Handler<M>>>,
}

impl<M: Message> Default for Dispatcher<M> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<M: Message> Dispatcher<M> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `kind`, replacing any previous registration.
    pub fn register(mut self, kind: M::Kind, handler: impl Handler<M> + 'static) -> Self {
        self.handlers.insert(kind, Arc::new(handler));
        self
    }

    pub fn handles(&self, kind: M::Kind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub async fn execute(&self, message: M) -> Result<M::Outcome> {
        let kind = message.kind();
        let handler = self
            .handlers
            .get(&kind)
            .ok_or_else(|| AppError::Internal(format!("no handler registered for {kind:?}")))?;
        tracing::debug!(?kind, "dispatching");
        handler.handle(message).await
    }
}

/// Error for a handler that received a message of a kind it was not registered for.
pub(crate) fn misrouted(handler: &str, message: &impl fmt::Debug) -> AppError {
    AppError::Internal(format!("{handler} received {message:?}"))
}

// --- Commands ---

#[derive(Debug, Clone)]
pub struct CreateBlogCommand {
    pub input: CreateBlogInput,
}

#[derive(Debug, Clone)]
pub struct CreatePostCommand {
    pub blog_id: i64,
    pub input: CreatePostInput,
}

#[derive(Debug, Clone)]
pub struct CreateCommentCommand {
    pub author_id: Uuid,
    pub post_id: i64,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct UpdateLikeStatusCommand {
    pub user_id: Uuid,
    pub subject: Subject,
    pub status: LikeStatus,
}

#[derive(Debug, Clone)]
pub enum Command {
    CreateBlog(CreateBlogCommand),
    CreatePost(CreatePostCommand),
    CreateComment(CreateCommentCommand),
    UpdateLikeStatus(UpdateLikeStatusCommand),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    CreateBlog,
    CreatePost,
    CreateComment,
    UpdateLikeStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// A row was created; carries its id.
    Created(i64),
    Completed,
}

impl CommandOutcome {
    pub fn created_id(self) -> Result<i64> {
        match self {
            CommandOutcome::Created(id) => Ok(id),
            CommandOutcome::Completed => Err(AppError::Internal(
                "command completed without creating a row".to_string(),
            )),
        }
    }
}

impl Message for Command {
    type Kind = CommandKind;
    type Outcome = CommandOutcome;

    fn kind(&self) -> CommandKind {
        match self {
            Command::CreateBlog(_) => CommandKind::CreateBlog,
            Command::CreatePost(_) => CommandKind::CreatePost,
            Command::CreateComment(_) => CommandKind::CreateComment,
            Command::UpdateLikeStatus(_) => CommandKind::UpdateLikeStatus,
        }
    }
}

// --- Queries ---

#[derive(Debug, Clone)]
pub struct GetPostsQuery {
    pub viewer: Viewer,
    pub page: PageQuery<PostSortField>,
}

#[derive(Debug, Clone)]
pub struct GetPostByIdQuery {
    pub viewer: Viewer,
    pub post_id: i64,
}

#[derive(Debug, Clone)]
pub struct GetCommentsForPostQuery {
    pub viewer: Viewer,
    pub post_id: i64,
    pub page: PageQuery<CommentSortField>,
}

#[derive(Debug, Clone)]
pub struct GetCommentByIdQuery {
    pub viewer: Viewer,
    pub comment_id: i64,
}

#[derive(Debug, Clone)]
pub struct GetBlogByIdQuery {
    pub blog_id: i64,
}

#[derive(Debug, Clone)]
pub enum Query {
    GetPosts(GetPostsQuery),
    GetPostById(GetPostByIdQuery),
    GetCommentsForPost(GetCommentsForPostQuery),
    GetCommentById(GetCommentByIdQuery),
    GetBlogById(GetBlogByIdQuery),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    GetPosts,
    GetPostById,
    GetCommentsForPost,
    GetCommentById,
    GetBlogById,
}

#[derive(Debug, Clone)]
pub enum QueryOutcome {
    Posts(Paginated<PostView>),
    Post(PostView),
    Comments(Paginated<CommentView>),
    Comment(CommentView),
    Blog(BlogView),
}

impl Message for Query {
    type Kind = QueryKind;
    type Outcome = QueryOutcome;

    fn kind(&self) -> QueryKind {
        match self {
            Query::GetPosts(_) => QueryKind::GetPosts,
            Query::GetPostById(_) => QueryKind::GetPostById,
            Query::GetCommentsForPost(_) => QueryKind::GetCommentsForPost,
            Query::GetCommentById(_) => QueryKind::GetCommentById,
            Query::GetBlogById(_) => QueryKind::GetBlogById,
        }
    }
}

fn unexpected(outcome: &QueryOutcome, wanted: &str) -> AppError {
    let got = match outcome {
        QueryOutcome::Posts(_) => "posts",
        QueryOutcome::Post(_) => "post",
        QueryOutcome::Comments(_) => "comments",
        QueryOutcome::Comment(_) => "comment",
        QueryOutcome::Blog(_) => "blog",
    };
    AppError::Internal(format!("expected {wanted} outcome, got {got}"))
}

impl QueryOutcome {
    pub fn into_posts(self) -> Result<Paginated<PostView>> {
        match self {
            QueryOutcome::Posts(page) => Ok(page),
            other => Err(unexpected(&other, "posts")),
        }
    }

    pub fn into_post(self) -> Result<PostView> {
        match self {
            QueryOutcome::Post(post) => Ok(post),
            other => Err(unexpected(&other, "post")),
        }
    }

    pub fn into_comments(self) -> Result<Paginated<CommentView>> {
        match self {
            QueryOutcome::Comments(page) => Ok(page),
            other => Err(unexpected(&other, "comments")),
        }
    }

    pub fn into_comment(self) -> Result<CommentView> {
        match self {
            QueryOutcome::Comment(comment) => Ok(comment),
            other => Err(unexpected(&other, "comment")),
        }
    }

    pub fn into_blog(self) -> Result<BlogView> {
        match self {
            QueryOutcome::Blog(blog) => Ok(blog),
            other => Err(unexpected(&other, "blog")),
        }
    }
}

pub type CommandBus = Dispatcher<Command>;
pub type QueryBus = Dispatcher<Query>;

/// Registers every command handler against `repo`.
pub fn command_bus(repo: RepositoryState) -> CommandBus {
    CommandBus::new()
        .register(
            CommandKind::CreateBlog,
            commands::CreateBlogHandler::new(repo.clone()),
        )
        .register(
            CommandKind::CreatePost,
            commands::CreatePostHandler::new(repo.clone()),
        )
        .register(
            CommandKind::CreateComment,
            commands::CreateCommentHandler::new(repo.clone()),
        )
        .register(
            CommandKind::UpdateLikeStatus,
            commands::UpdateLikeStatusHandler::new(repo),
        )
}

/// Registers every query handler against `repo`.
pub fn query_bus(repo: RepositoryState) -> QueryBus {
    QueryBus::new()
        .register(QueryKind::GetPosts, queries::GetPostsHandler::new(repo.clone()))
        .register(
            QueryKind::GetPostById,
            queries::GetPostByIdHandler::new(repo.clone()),
        )
        .register(
            QueryKind::GetCommentsForPost,
            queries::GetCommentsForPostHandler::new(repo.clone()),
        )
        .register(
            QueryKind::GetCommentById,
            queries::GetCommentByIdHandler::new(repo.clone()),
        )
        .register(QueryKind::GetBlogById, queries::GetBlogByIdHandler::new(repo))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::InMemoryRepository;

    struct Echo;

    #[async_trait]
    impl Handler<Command> for Echo {
        async fn handle(&self, _message: Command) -> Result<CommandOutcome> {
            Ok(CommandOutcome::Created(99))
        }
    }

    fn like_command() -> Command {
        Command::UpdateLikeStatus(UpdateLikeStatusCommand {
            user_id: Uuid::from_u128(1),
            subject: Subject::post(1),
            status: LikeStatus::Like,
        })
    }

    #[tokio::test]
    async fn unregistered_kind_is_an_internal_error() {
        let bus = CommandBus::new();
        let result = bus.execute(like_command()).await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn dispatches_by_kind() {
        let bus = CommandBus::new().register(CommandKind::UpdateLikeStatus, Echo);
        assert!(bus.handles(CommandKind::UpdateLikeStatus));
        assert!(!bus.handles(CommandKind::CreateComment));
        assert_eq!(
            bus.execute(like_command()).await.unwrap(),
            CommandOutcome::Created(99)
        );
    }

    #[test]
    fn default_buses_cover_every_kind() {
        let repo: RepositoryState = std::sync::Arc::new(InMemoryRepository::new());
        let commands = command_bus(repo.clone());
        let queries = query_bus(repo);

        for kind in [
            CommandKind::CreateBlog,
            CommandKind::CreatePost,
            CommandKind::CreateComment,
            CommandKind::UpdateLikeStatus,
        ] {
            assert!(commands.handles(kind), "{kind:?} has no handler");
        }
        for kind in [
            QueryKind::GetPosts,
            QueryKind::GetPostById,
            QueryKind::GetCommentsForPost,
            QueryKind::GetCommentById,
            QueryKind::GetBlogById,
        ] {
            assert!(queries.handles(kind), "{kind:?} has no handler");
        }
    }

    #[test]
    fn outcome_accessors_reject_other_variants() {
        assert!(CommandOutcome::Completed.created_id().is_err());
        assert_eq!(CommandOutcome::Created(3).created_id().unwrap(), 3);
    }
}
