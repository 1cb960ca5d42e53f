use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use crate::{
    error::Result,
    models::{
        Blog, Comment, CreateBlogInput, Like, LikeCounts, LikeStatus, NewComment, NewPost,
        NewestLike, Post, Subject, SubjectKind, User,
    },
    pagination::{CommentSortField, PageQuery, PostSortField, SortField},
};

/// Repository Trait
///
/// Abstract contract for every persistence operation of the blogging core. Commands and
/// queries only talk to this trait, so they run unchanged against Postgres or the in-memory
/// store used by the tests.
///
/// Failures of the store surface as `AppError::Database` and are never swallowed here.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Identity ---
    async fn get_user(&self, id: Uuid) -> Result<Option<User>>;

    // --- Blogs & Posts ---
    async fn create_blog(&self, input: CreateBlogInput) -> Result<Blog>;
    async fn get_blog(&self, id: i64) -> Result<Option<Blog>>;
    /// Returns `None` (and writes nothing) when the blog does not exist.
    async fn create_post(&self, post: NewPost) -> Result<Option<i64>>;
    async fn get_post(&self, id: i64) -> Result<Option<Post>>;
    /// One page of posts plus the total number of posts.
    async fn get_posts(&self, page: &PageQuery<PostSortField>) -> Result<(Vec<Post>, i64)>;

    // --- Comments ---
    /// Returns `None` (and writes nothing) when the post does not exist.
    async fn create_comment(&self, comment: NewComment) -> Result<Option<i64>>;
    async fn get_comment(&self, id: i64) -> Result<Option<Comment>>;
    async fn get_comments_for_post(
        &self,
        post_id: i64,
        page: &PageQuery<CommentSortField>,
    ) -> Result<(Vec<Comment>, i64)>;

    // --- Likes ---
    /// Atomic upsert keyed on (subject, user). Setting `None` without an existing row
    /// writes nothing; setting the current status again changes nothing. Returns `false`
    /// (and writes nothing) when the subject does not exist; the check and the write are
    /// one statement.
    async fn set_like_status(
        &self,
        subject: Subject,
        user_id: Uuid,
        status: LikeStatus,
    ) -> Result<bool>;
    /// Like/dislike counts per subject id. Subjects without reactions may be absent.
    async fn get_like_counts(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, LikeCounts>>;
    /// The like rows `user_id` holds on the given subjects.
    async fn get_user_likes(
        &self,
        kind: SubjectKind,
        ids: &[i64],
        user_id: Uuid,
    ) -> Result<Vec<Like>>;
    /// Up to `limit` most recent `Like` reactions per post, newest first.
    async fn get_newest_likes(
        &self,
        post_ids: &[i64],
        limit: i64,
    ) -> Result<HashMap<i64, Vec<NewestLike>>>;

    // --- Testing ---
    async fn delete_all_data(&self) -> Result<()>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const POST_COLUMNS: &str = r#"
    SELECT p.id, p.title, p.short_description, p.content, p.blog_id,
           b.name AS blog_name, p.created_at
    FROM posts p
    JOIN blogs b ON b.id = p.blog_id
"#;

const COMMENT_COLUMNS: &str = r#"
    SELECT c.id, c.post_id, c.content, c.user_id, c.user_login, c.created_at
    FROM comments c
"#;

#[derive(FromRow)]
struct LikeCountsRow {
    subject_id: i64,
    likes_count: i64,
    dislikes_count: i64,
}

#[derive(FromRow)]
struct NewestLikeRow {
    subject_id: i64,
    user_id: Uuid,
    login: String,
    added_at: DateTime<Utc>,
}

/// Appends `ORDER BY <column> <dir>, <id> <dir> LIMIT .. OFFSET ..`. The column comes from
/// the `SortField` whitelist; only limit and offset are bound.
fn push_page<F: SortField>(
    builder: &mut QueryBuilder<'_, Postgres>,
    page: &PageQuery<F>,
    id_column: &str,
) {
    let direction = page.sort_direction.as_sql();
    builder.push(format!(
        " ORDER BY {} {direction}, {id_column} {direction} LIMIT ",
        page.sort_by.column()
    ));
    builder.push_bind(page.limit());
    builder.push(" OFFSET ");
    builder.push_bind(page.offset());
}

#[async_trait]
impl Repository for PostgresRepository {
    async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT id, login, email FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn create_blog(&self, input: CreateBlogInput) -> Result<Blog> {
        let blog = sqlx::query_as::<_, Blog>(
            r#"
            INSERT INTO blogs (name, description, website_url, is_membership)
            VALUES ($1, $2, $3, false)
            RETURNING id, name, description, website_url, is_membership, created_at
            "#,
        )
        .bind(input.name)
        .bind(input.description)
        .bind(input.website_url)
        .fetch_one(&self.pool)
        .await?;
        Ok(blog)
    }

    async fn get_blog(&self, id: i64) -> Result<Option<Blog>> {
        let blog = sqlx::query_as::<_, Blog>(
            "SELECT id, name, description, website_url, is_membership, created_at FROM blogs WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(blog)
    }

    /// create_post
    ///
    /// The blog check and the insert are one statement: a missing blog inserts zero rows.
    async fn create_post(&self, post: NewPost) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO posts (title, short_description, content, blog_id)
            SELECT $1, $2, $3, b.id FROM blogs b WHERE b.id = $4
            RETURNING id
            "#,
        )
        .bind(post.title)
        .bind(post.short_description)
        .bind(post.content)
        .bind(post.blog_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_post(&self, id: i64) -> Result<Option<Post>> {
        let post = sqlx::query_as::<_, Post>(&format!("{POST_COLUMNS} WHERE p.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(post)
    }

    async fn get_posts(&self, page: &PageQuery<PostSortField>) -> Result<(Vec<Post>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(POST_COLUMNS);
        push_page(&mut builder, page, "p.id");

        let posts = builder.build_query_as::<Post>().fetch_all(&self.pool).await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM posts")
            .fetch_one(&self.pool)
            .await?;
        Ok((posts, total))
    }

    /// create_comment
    ///
    /// Inserts only if the post exists, in a single statement, so an unknown post can never
    /// leave an orphan comment behind.
    async fn create_comment(&self, comment: NewComment) -> Result<Option<i64>> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"
            INSERT INTO comments (post_id, content, user_id, user_login)
            SELECT p.id, $2, $3, $4 FROM posts p WHERE p.id = $1
            RETURNING id
            "#,
        )
        .bind(comment.post_id)
        .bind(comment.content)
        .bind(comment.user_id)
        .bind(comment.user_login)
        .fetch_optional(&self.pool)
        .await?;
        Ok(id)
    }

    async fn get_comment(&self, id: i64) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>(&format!("{COMMENT_COLUMNS} WHERE c.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn get_comments_for_post(
        &self,
        post_id: i64,
        page: &PageQuery<CommentSortField>,
    ) -> Result<(Vec<Comment>, i64)> {
        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(COMMENT_COLUMNS);
        builder.push(" WHERE c.post_id = ");
        builder.push_bind(post_id);
        push_page(&mut builder, page, "c.id");

        let comments = builder.build_query_as::<Comment>().fetch_all(&self.pool).await?;
        let total = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM comments WHERE post_id = $1")
            .bind(post_id)
            .fetch_one(&self.pool)
            .await?;
        Ok((comments, total))
    }

    /// set_like_status
    ///
    /// `INSERT .. ON CONFLICT DO UPDATE` on the (subject_id, subject_type, user_id) primary
    /// key: concurrent first reactions from one user collapse into a single row, last write
    /// wins. The `WHERE` on the update leaves the row (and its timestamp) untouched when the
    /// status does not change. The subject lookup rides in the same statement, so a wipe
    /// cannot slip in between the check and the write.
    async fn set_like_status(
        &self,
        subject: Subject,
        user_id: Uuid,
        status: LikeStatus,
    ) -> Result<bool> {
        let table = match subject.kind {
            SubjectKind::Post => "posts",
            SubjectKind::Comment => "comments",
        };
        let write = if status == LikeStatus::None {
            // Clearing never creates a row.
            r#"
            UPDATE likes SET status = $4, updated_at = NOW()
            WHERE subject_id = $1 AND subject_type = $2 AND user_id = $3
              AND status IS DISTINCT FROM $4
              AND (SELECT found FROM subject)
            "#
        } else {
            r#"
            INSERT INTO likes (subject_id, subject_type, user_id, status, updated_at)
            SELECT $1, $2, $3, $4, NOW() FROM subject WHERE found
            ON CONFLICT (subject_id, subject_type, user_id)
            DO UPDATE SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
            WHERE likes.status IS DISTINCT FROM EXCLUDED.status
            "#
        };
        let sql = format!(
            "WITH subject AS (SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1) AS found), \
             written AS ({write} RETURNING 1) \
             SELECT found FROM subject"
        );

        let found = sqlx::query_scalar::<_, bool>(&sql)
            .bind(subject.id)
            .bind(subject.kind)
            .bind(user_id)
            .bind(status)
            .fetch_one(&self.pool)
            .await?;
        Ok(found)
    }

    async fn get_like_counts(
        &self,
        kind: SubjectKind,
        ids: &[i64],
    ) -> Result<HashMap<i64, LikeCounts>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, LikeCountsRow>(
            r#"
            SELECT subject_id,
                   COUNT(*) FILTER (WHERE status = 'Like') AS likes_count,
                   COUNT(*) FILTER (WHERE status = 'Dislike') AS dislikes_count
            FROM likes
            WHERE subject_type = $1 AND subject_id = ANY($2)
            GROUP BY subject_id
            "#,
        )
        .bind(kind)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                (
                    row.subject_id,
                    LikeCounts {
                        likes: row.likes_count,
                        dislikes: row.dislikes_count,
                    },
                )
            })
            .collect())
    }

    async fn get_user_likes(
        &self,
        kind: SubjectKind,
        ids: &[i64],
        user_id: Uuid,
    ) -> Result<Vec<Like>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }

        let likes = sqlx::query_as::<_, Like>(
            r#"
            SELECT subject_id, subject_type, user_id, status, updated_at
            FROM likes
            WHERE subject_type = $1 AND user_id = $2 AND subject_id = ANY($3)
            "#,
        )
        .bind(kind)
        .bind(user_id)
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;
        Ok(likes)
    }

    async fn get_newest_likes(
        &self,
        post_ids: &[i64],
        limit: i64,
    ) -> Result<HashMap<i64, Vec<NewestLike>>> {
        if post_ids.is_empty() || limit <= 0 {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, NewestLikeRow>(
            r#"
            SELECT subject_id, user_id, login, added_at
            FROM (
                SELECT l.subject_id, l.user_id, u.login, l.updated_at AS added_at,
                       ROW_NUMBER() OVER (
                           PARTITION BY l.subject_id
                           ORDER BY l.updated_at DESC, l.user_id
                       ) AS rn
                FROM likes l
                JOIN users u ON u.id = l.user_id
                WHERE l.subject_type = 'Post' AND l.status = 'Like' AND l.subject_id = ANY($1)
            ) ranked
            WHERE rn <= $2
            ORDER BY subject_id, added_at DESC, user_id
            "#,
        )
        .bind(post_ids)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut newest: HashMap<i64, Vec<NewestLike>> = HashMap::new();
        for row in rows {
            newest.entry(row.subject_id).or_default().push(NewestLike {
                added_at: row.added_at,
                user_id: row.user_id,
                login: row.login,
            });
        }
        Ok(newest)
    }

    async fn delete_all_data(&self) -> Result<()> {
        sqlx::query("TRUNCATE likes, comments, posts, blogs RESTART IDENTITY CASCADE")
            .execute(&self.pool)
            .await?;
        tracing::warn!("all blogging data deleted");
        Ok(())
    }
}
