use std::cmp::Ordering;
use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        Blog, Comment, CreateBlogInput, Like, LikeCounts, LikeStatus, NewComment, NewPost,
        NewestLike, Post, Subject, SubjectKind, User,
    },
    pagination::{CommentSortField, PageQuery, PostSortField, SortDirection},
    repository::Repository,
};

type LikeKey = (SubjectKind, i64, Uuid);

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    blogs: Vec<Blog>,
    posts: Vec<PostRow>,
    comments: Vec<Comment>,
    // Keyed by the same triple the Postgres primary key covers, so one row per (subject, user).
    likes: HashMap<LikeKey, Like>,
    next_id: i64,
    // Monotonic timestamps keep "newest first" deterministic within one test.
    clock: Option<DateTime<Utc>>,
}

#[derive(Clone)]
struct PostRow {
    id: i64,
    title: String,
    short_description: String,
    content: String,
    blog_id: i64,
    created_at: DateTime<Utc>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn now(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.clock {
            Some(last) if now <= last => last + chrono::Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(stamp);
        stamp
    }

    fn join_post(&self, row: &PostRow) -> Post {
        let blog_name = self
            .blogs
            .iter()
            .find(|blog| blog.id == row.blog_id)
            .map(|blog| blog.name.clone())
            .unwrap_or_default();
        Post {
            id: row.id,
            title: row.title.clone(),
            short_description: row.short_description.clone(),
            content: row.content.clone(),
            blog_id: row.blog_id,
            blog_name,
            created_at: row.created_at,
        }
    }
}

fn directed(ordering: Ordering, direction: SortDirection) -> Ordering {
    match direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

fn compare_posts(a: &Post, b: &Post, field: PostSortField) -> Ordering {
    match field {
        PostSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        PostSortField::Title => a.title.cmp(&b.title),
        PostSortField::ShortDescription => a.short_description.cmp(&b.short_description),
        PostSortField::Content => a.content.cmp(&b.content),
        PostSortField::BlogId => a.blog_id.cmp(&b.blog_id),
        PostSortField::BlogName => a.blog_name.cmp(&b.blog_name),
        PostSortField::Id => Ordering::Equal,
    }
    .then(a.id.cmp(&b.id))
}

fn compare_comments(a: &Comment, b: &Comment, field: CommentSortField) -> Ordering {
    match field {
        CommentSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        CommentSortField::Content => a.content.cmp(&b.content),
        CommentSortField::UserLogin => a.user_login.cmp(&b.user_login),
        CommentSortField::Id => Ordering::Equal,
    }
    .then(a.id.cmp(&b.id))
}

fn page_slice<T, F>(mut items: Vec<T>, page: &PageQuery<F>) -> Vec<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(0);
    if offset >= items.len() {
        return Vec::new();
    }
    items.drain(offset..).take(limit).collect()
}

/// InMemoryRepository
///
/// A `Repository` kept entirely in process memory. Every operation takes the single table
/// lock for its whole duration, which gives it the same atomicity the Postgres statements
/// have. Used by the test-suite and handy for running the API without a database.
#[derive(Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Users are provisioned by the identity service; this seeds one directly.
    pub async fn insert_user(&self, user: User) {
        self.tables.write().await.users.insert(user.id, user);
    }

    /// Number of stored like rows for a subject, whatever their status.
    pub async fn like_rows(&self, subject: Subject) -> usize {
        self.tables
            .read()
            .await
            .likes
            .keys()
            .filter(|(kind, id, _)| *kind == subject.kind && *id == subject.id)
            .count()
    }

    pub async fn comment_count(&self) -> usize {
        self.tables.read().await.comments.len()
    }
}

#[async_trait]
impl Repository for InMemoryRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn create_blog(&self, input: CreateBlogInput) -> Result<Blog> {
        let mut tables = self.tables.write().await;
        let blog = Blog {
            id: tables.next_id(),
            name: input.name,
            description: input.description,
            website_url: input.website_url,
            is_membership: false,
            created_at: tables.now(),
        };
        tables.blogs.push(blog.clone());
        Ok(blog)
    }

    async fn get_blog(&self, id: i64) -> Result<Option<Blog>> {
        let tables = self.tables.read().await;
        Ok(tables.blogs.iter().find(|blog| blog.id == id).cloned())
    }

    async fn create_post(&self, post: NewPost) -> Result<Option<i64>> {
        let mut tables = self.tables.write().await;
        if !tables.blogs.iter().any(|blog| blog.id == post.blog_id) {
            return Ok(None);
        }
        let row = PostRow {
            id: tables.next_id(),
            title: post.title,
            short_description: post.short_description,
            content: post.content,
            blog_id: post.blog_id,
            created_at: tables.now(),
        };
        let id = row.id;
        tables.posts.push(row);
        Ok(Some(id))
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let tables = self.tables.read().await;
        Ok(tables
            .posts
            .iter()
            .find(|row| row.id == id)
            .map(|row| tables.join_post(row)))
    }

    async fn get_posts(&self, page: &PageQuery<PostSortField>) -> Result<(Vec<Post>, i64)> {
        let tables = self.tables.read().await;
        let mut posts: Vec<Post> = tables.posts.iter().map(|row| tables.join_post(row)).collect();
        posts.sort_by(|a, b| directed(compare_posts(a, b, page.sort_by), page.sort_direction));

        let total = posts.len() as i64;
        Ok((page_slice(posts, page), total))
    }

    async fn create_comment(&self, comment: NewComment) -> Result<Option<i64>> {
        let mut tables = self.tables.write().await;
        if !tables.posts.iter().any(|post| post.id == comment.post_id) {
            return Ok(None);
        }
        let stored = Comment {
            id: tables.next_id(),
            post_id: comment.post_id,
            content: comment.content,
            user_id: comment.user_id,
            user_login: comment.user_login,
            created_at: tables.now(),
        };
        let id = stored.id;
        tables.comments.push(stored);
        Ok(Some(id))
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let tables = self.tables.read().await;
        Ok(tables.comments.iter().find(|comment| comment.id == id).cloned())
    }

    async fn get_comments_for_post(
        &self,
        post_id: i64,
        page: &PageQuery<CommentSortField>,
    ) -> Result<(Vec<Comment>, i64)> {
        let tables = self.tables.read().await;
        let mut comments: Vec<Comment> = tables
            .comments
            .iter()
            .filter(|comment| comment.post_id == post_id)
            .cloned()
            .collect();
        comments.sort_by(|a, b| directed(compare_comments(a, b, page.sort_by), page.sort_direction));

        let total = comments.len() as i64;
        Ok((page_slice(comments, page), total))
    }

    async fn set_like_status(
        &self,
        subject: Subject,
        user_id: Uuid,
        status: LikeStatus,
    ) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let found = match subject.kind {
            SubjectKind::Post => tables.posts.iter().any(|post| post.id == subject.id),
            SubjectKind::Comment => tables.comments.iter().any(|c| c.id == subject.id),
        };
        if !found {
            return Ok(false);
        }

        let key = (subject.kind, subject.id, user_id);
        let current = tables.likes.get(&key).map(|like| like.status);

        match current {
            Some(existing) if existing == status => {}
            None if status == LikeStatus::None => {}
            _ => {
                let updated_at = tables.now();
                tables.likes.insert(
                    key,
                    Like {
                        subject_id: subject.id,
                        subject_type: subject.kind,
                        user_id,
                        status,
                        updated_at,
                    },
                );
            }
        }
        Ok(true)
    }

    async fn get_like_counts(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, LikeCounts>> {
        let tables = self.tables.read().await;
        let mut counts: HashMap<i64, LikeCounts> = HashMap::new();
        for like in tables.likes.values() {
            if like.subject_type != kind || !ids.contains(&like.subject_id) {
                continue;
            }
            let entry = counts.entry(like.subject_id).or_default();
            match like.status {
                LikeStatus::Like => entry.likes += 1,
                LikeStatus::Dislike => entry.dislikes += 1,
                LikeStatus::None => {}
            }
        }
        Ok(counts)
    }

    async fn get_user_likes(
        &self,
        kind: SubjectKind,
        ids: &[i64],
        user_id: Uuid,
    ) -> Result<Vec<Like>> {
        let tables = self.tables.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| tables.likes.get(&(kind, *id, user_id)).cloned())
            .collect())
    }

    async fn get_newest_likes(
        &self,
        post_ids: &[i64],
        limit: i64,
    ) -> Result<HashMap<i64, Vec<NewestLike>>> {
        let tables = self.tables.read().await;
        let limit = usize::try_from(limit).unwrap_or(0);
        let mut newest: HashMap<i64, Vec<NewestLike>> = HashMap::new();

        for post_id in post_ids {
            let mut likes: Vec<&Like> = tables
                .likes
                .values()
                .filter(|like| {
                    like.subject_type == SubjectKind::Post
                        && like.subject_id == *post_id
                        && like.status == LikeStatus::Like
                })
                .collect();
            likes.sort_by(|a, b| {
                b.updated_at
                    .cmp(&a.updated_at)
                    .then(a.user_id.cmp(&b.user_id))
            });

            let entries: Vec<NewestLike> = likes
                .into_iter()
                .filter_map(|like| {
                    // Same inner join as Postgres: likes by unknown users are skipped.
                    tables.users.get(&like.user_id).map(|user| NewestLike {
                        added_at: like.updated_at,
                        user_id: like.user_id,
                        login: user.login.clone(),
                    })
                })
                .take(limit)
                .collect();

            if !entries.is_empty() {
                newest.insert(*post_id, entries);
            }
        }
        Ok(newest)
    }

    async fn delete_all_data(&self) -> Result<()> {
        let mut tables = self.tables.write().await;
        tables.blogs.clear();
        tables.posts.clear();
        tables.comments.clear();
        tables.likes.clear();
        tables.next_id = 0;
        Ok(())
    }
}
