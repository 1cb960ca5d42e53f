use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// Mirror of an account provisioned by the external identity service (`users` table).
/// Only the fields the blogging core reads are kept.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct User {
    pub id: Uuid,
    pub login: String,
    pub email: String,
}

/// Blog
///
/// A blog owns posts. Created by the super admin.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Blog {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub website_url: String,
    pub is_membership: bool,
    pub created_at: DateTime<Utc>,
}

/// Post
///
/// A `posts` row joined with its blog's name. Immutable once created; only its like
/// aggregate changes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub blog_id: i64,
    pub blog_name: String,
    pub created_at: DateTime<Utc>,
}

/// Comment
///
/// A `comments` row. `user_login` is a snapshot of the author's login taken when the comment
/// was written and is never re-synced.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow, Default)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub content: String,
    pub user_id: Uuid,
    pub user_login: String,
    pub created_at: DateTime<Utc>,
}

/// LikeStatus
///
/// A user's reaction to a subject. `None` is stored too: clearing a reaction updates the
/// existing row instead of deleting it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema,
    sqlx::Type,
)]
#[sqlx(type_name = "like_status")]
#[ts(export)]
pub enum LikeStatus {
    #[default]
    None,
    Like,
    Dislike,
}

impl LikeStatus {
    pub const ALL: [LikeStatus; 3] = [LikeStatus::None, LikeStatus::Like, LikeStatus::Dislike];

    pub fn as_str(&self) -> &'static str {
        match self {
            LikeStatus::None => "None",
            LikeStatus::Like => "Like",
            LikeStatus::Dislike => "Dislike",
        }
    }
}

impl fmt::Display for LikeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LikeStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        LikeStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == value)
            .ok_or(())
    }
}

/// SubjectKind
///
/// The kind of entity a like row points at. Part of the like table's composite key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subject_type")]
pub enum SubjectKind {
    Post,
    Comment,
}

/// Subject
///
/// Something that can be liked: a post or a comment, addressed by its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subject {
    pub kind: SubjectKind,
    pub id: i64,
}

impl Subject {
    pub fn post(id: i64) -> Self {
        Self {
            kind: SubjectKind::Post,
            id,
        }
    }

    pub fn comment(id: i64) -> Self {
        Self {
            kind: SubjectKind::Comment,
            id,
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SubjectKind::Post => write!(f, "post {}", self.id),
            SubjectKind::Comment => write!(f, "comment {}", self.id),
        }
    }
}

/// Like
///
/// One row of the `likes` table. There is at most one row per (subject, user): the store's
/// primary key enforces it.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Like {
    pub subject_id: i64,
    pub subject_type: SubjectKind,
    pub user_id: Uuid,
    pub status: LikeStatus,
    pub updated_at: DateTime<Utc>,
}

/// LikeCounts
///
/// Number of `Like` and `Dislike` rows for one subject, computed at read time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LikeCounts {
    pub likes: i64,
    pub dislikes: i64,
}

/// Arguments for inserting a comment.
#[derive(Debug, Clone)]
pub struct NewComment {
    pub post_id: i64,
    pub content: String,
    pub user_id: Uuid,
    pub user_login: String,
}

/// Arguments for inserting a post.
#[derive(Debug, Clone)]
pub struct NewPost {
    pub blog_id: i64,
    pub title: String,
    pub short_description: String,
    pub content: String,
}

// --- Request Payloads (Input Schemas) ---

fn not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message("must not be blank".into()));
    }
    Ok(())
}

fn trimmed_comment_length(value: &str) -> Result<(), ValidationError> {
    let len = value.trim().chars().count();
    if !(20..=300).contains(&len) {
        return Err(ValidationError::new("length")
            .with_message("content must be between 20 and 300 characters".into()));
    }
    Ok(())
}

fn known_like_status(value: &str) -> Result<(), ValidationError> {
    value.parse::<LikeStatus>().map(|_| ()).map_err(|()| {
        ValidationError::new("like_status")
            .with_message("likeStatus must be one of None, Like, Dislike".into())
    })
}

fn https_url(value: &str) -> Result<(), ValidationError> {
    if !value.starts_with("https://") {
        return Err(ValidationError::new("url").with_message("websiteUrl must use https".into()));
    }
    Ok(())
}

/// CreateCommentInput
///
/// Body of `POST /posts/{postId}/comments`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateCommentInput {
    #[validate(custom(function = "trimmed_comment_length"))]
    #[schema(example = "A thoughtful remark about the post")]
    pub content: String,
}

/// LikeInput
///
/// Body of the `like-status` endpoints. The status is checked against the known variants
/// during validation so a typo is reported against the `likeStatus` field.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LikeInput {
    #[validate(custom(function = "known_like_status"))]
    #[schema(example = "Like")]
    pub like_status: String,
}

impl LikeInput {
    /// The parsed status. Only meaningful after validation succeeded.
    pub fn status(&self) -> LikeStatus {
        self.like_status.parse().unwrap_or_default()
    }
}

/// CreateBlogInput
///
/// Body of `POST /sa/blogs`.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreateBlogInput {
    #[validate(length(min = 1, max = 15), custom(function = "not_blank"))]
    pub name: String,
    #[validate(length(min = 1, max = 500), custom(function = "not_blank"))]
    pub description: String,
    #[validate(length(max = 100), url, custom(function = "https_url"))]
    pub website_url: String,
}

/// CreatePostInput
///
/// Body of `POST /sa/blogs/{blogId}/posts`; the blog comes from the path.
#[derive(Debug, Clone, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CreatePostInput {
    #[validate(length(min = 1, max = 30), custom(function = "not_blank"))]
    pub title: String,
    #[validate(length(min = 1, max = 100), custom(function = "not_blank"))]
    pub short_description: String,
    #[validate(length(min = 1, max = 1000), custom(function = "not_blank"))]
    pub content: String,
}

// --- View Models (Output Schemas) ---

/// LikesInfo
///
/// Like aggregate of a comment, personalized for the requesting viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct LikesInfo {
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub my_status: LikeStatus,
}

/// NewestLike
///
/// One of the most recent `Like` reactions on a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewestLike {
    #[ts(type = "string")]
    pub added_at: DateTime<Utc>,
    pub user_id: Uuid,
    pub login: String,
}

/// ExtendedLikesInfo
///
/// Like aggregate of a post: the comment aggregate plus the newest likes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExtendedLikesInfo {
    pub likes_count: i64,
    pub dislikes_count: i64,
    pub my_status: LikeStatus,
    pub newest_likes: Vec<NewestLike>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentatorInfo {
    pub user_id: Uuid,
    pub user_login: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub commentator_info: CommentatorInfo,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub likes_info: LikesInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PostView {
    pub id: i64,
    pub title: String,
    pub short_description: String,
    pub content: String,
    pub blog_id: i64,
    pub blog_name: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub likes_info: ExtendedLikesInfo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct BlogView {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub website_url: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub is_membership: bool,
}
