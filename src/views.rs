//! View assembly: persisted entities plus viewer-specific like state in, response shapes out.
//! Everything here is pure; the query handlers load the inputs in batches.

use crate::auth::Viewer;
use crate::models::{
    Blog, BlogView, Comment, CommentView, CommentatorInfo, ExtendedLikesInfo, Like, LikeCounts,
    LikeStatus, LikesInfo, NewestLike, Post, PostView,
};

/// The viewer's own status on a subject. Anonymous viewers, viewers without a row, and rows
/// that belong to someone else all yield `None`.
pub fn my_status(viewer: &Viewer, my_like: Option<&Like>) -> LikeStatus {
    match (viewer.user_id(), my_like) {
        (Some(viewer_id), Some(like)) if like.user_id == viewer_id => like.status,
        _ => LikeStatus::None,
    }
}

pub fn likes_info(counts: LikeCounts, viewer: &Viewer, my_like: Option<&Like>) -> LikesInfo {
    LikesInfo {
        likes_count: counts.likes,
        dislikes_count: counts.dislikes,
        my_status: my_status(viewer, my_like),
    }
}

pub fn comment_view(
    comment: Comment,
    counts: LikeCounts,
    viewer: &Viewer,
    my_like: Option<&Like>,
) -> CommentView {
    CommentView {
        id: comment.id,
        content: comment.content,
        commentator_info: CommentatorInfo {
            user_id: comment.user_id,
            user_login: comment.user_login,
        },
        created_at: comment.created_at,
        likes_info: likes_info(counts, viewer, my_like),
    }
}

pub fn post_view(
    post: Post,
    counts: LikeCounts,
    viewer: &Viewer,
    my_like: Option<&Like>,
    newest_likes: Vec<NewestLike>,
) -> PostView {
    PostView {
        id: post.id,
        title: post.title,
        short_description: post.short_description,
        content: post.content,
        blog_id: post.blog_id,
        blog_name: post.blog_name,
        created_at: post.created_at,
        likes_info: ExtendedLikesInfo {
            likes_count: counts.likes,
            dislikes_count: counts.dislikes,
            my_status: my_status(viewer, my_like),
            newest_likes,
        },
    }
}

pub fn blog_view(blog: Blog) -> BlogView {
    BlogView {
        id: blog.id,
        name: blog.name,
        description: blog.description,
        website_url: blog.website_url,
        created_at: blog.created_at,
        is_membership: blog.is_membership,
    }
}
