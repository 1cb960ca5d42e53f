//! Paging and sorting shared by every list query.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// A whitelisted sort key. Unknown names from the query string fall back to the default,
/// so user input never reaches SQL verbatim.
pub trait SortField: Copy + Default + Send + Sync + std::fmt::Debug {
    fn parse(name: &str) -> Option<Self>;
    /// Qualified column the Postgres repository orders by.
    fn column(&self) -> &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PostSortField {
    #[default]
    CreatedAt,
    Title,
    ShortDescription,
    Content,
    BlogId,
    BlogName,
    Id,
}

impl SortField for PostSortField {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "createdAt" => PostSortField::CreatedAt,
            "title" => PostSortField::Title,
            "shortDescription" => PostSortField::ShortDescription,
            "content" => PostSortField::Content,
            "blogId" => PostSortField::BlogId,
            "blogName" => PostSortField::BlogName,
            "id" => PostSortField::Id,
            _ => return None,
        })
    }

    fn column(&self) -> &'static str {
        match self {
            PostSortField::CreatedAt => "p.created_at",
            PostSortField::Title => "p.title",
            PostSortField::ShortDescription => "p.short_description",
            PostSortField::Content => "p.content",
            PostSortField::BlogId => "p.blog_id",
            PostSortField::BlogName => "b.name",
            PostSortField::Id => "p.id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CommentSortField {
    #[default]
    CreatedAt,
    Content,
    UserLogin,
    Id,
}

impl SortField for CommentSortField {
    fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "createdAt" => CommentSortField::CreatedAt,
            "content" => CommentSortField::Content,
            "userLogin" => CommentSortField::UserLogin,
            "id" => CommentSortField::Id,
            _ => return None,
        })
    }

    fn column(&self) -> &'static str {
        match self {
            CommentSortField::CreatedAt => "c.created_at",
            CommentSortField::Content => "c.content",
            CommentSortField::UserLogin => "c.user_login",
            CommentSortField::Id => "c.id",
        }
    }
}

/// PaginationParams
///
/// Raw paging options as they arrive in the query string. Normalized by `into_page_query`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct PaginationParams {
    /// 1-based page index. Defaults to 1.
    pub page_number: Option<i64>,
    /// Items per page. Defaults to 10, at most 100.
    pub page_size: Option<i64>,
    /// Field to order by. Defaults to `createdAt`.
    pub sort_by: Option<String>,
    /// `asc` or `desc`. Defaults to `desc`.
    pub sort_direction: Option<SortDirection>,
}

impl PaginationParams {
    pub fn into_page_query<F: SortField>(self) -> PageQuery<F> {
        let page_number = self.page_number.filter(|n| *n >= 1).unwrap_or(1);
        let page_size = self
            .page_size
            .filter(|n| *n >= 1)
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .min(MAX_PAGE_SIZE);
        let sort_by = self
            .sort_by
            .as_deref()
            .and_then(F::parse)
            .unwrap_or_default();

        PageQuery {
            page_number,
            page_size,
            sort_by,
            sort_direction: self.sort_direction.unwrap_or_default(),
        }
    }
}

/// PageQuery
///
/// Normalized paging request handed to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery<F> {
    pub page_number: i64,
    pub page_size: i64,
    pub sort_by: F,
    pub sort_direction: SortDirection,
}

impl<F: SortField> Default for PageQuery<F> {
    fn default() -> Self {
        PaginationParams::default().into_page_query()
    }
}

impl<F> PageQuery<F> {
    /// Saturates instead of overflowing; a huge page number is simply past the end.
    pub fn offset(&self) -> i64 {
        self.page_number
            .saturating_sub(1)
            .saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }
}

/// Paginated
///
/// One page of view models plus the totals a client needs to render a pager.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Paginated<T> {
    pub pages_count: i64,
    pub page: i64,
    pub page_size: i64,
    pub total_count: i64,
    pub items: Vec<T>,
}

impl<T> Paginated<T> {
    pub fn new<F>(items: Vec<T>, total_count: i64, query: &PageQuery<F>) -> Self {
        Self {
            pages_count: pages_count(total_count, query.page_size),
            page: query.page_number,
            page_size: query.page_size,
            total_count,
            items,
        }
    }
}

pub fn pages_count(total_count: i64, page_size: i64) -> i64 {
    if page_size <= 0 {
        return 0;
    }
    (total_count + page_size - 1) / page_size
}
