use blog_platform::models::{
    CommentView, CommentatorInfo, CreateBlogInput, CreateCommentInput, CreatePostInput,
    ExtendedLikesInfo, LikeInput, LikeStatus, LikesInfo, NewestLike, PostView,
};
use chrono::{TimeZone, Utc};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

// --- Serialization ---

#[test]
fn test_post_view_json_is_camel_case() {
    let created = Utc.with_ymd_and_hms(2025, 3, 1, 12, 0, 0).unwrap();
    let user_id = Uuid::from_u128(7);
    let view = PostView {
        id: 5,
        title: "Ownership".to_string(),
        short_description: "Borrowing".to_string(),
        content: "Lifetimes".to_string(),
        blog_id: 2,
        blog_name: "Rustaceans".to_string(),
        created_at: created,
        likes_info: ExtendedLikesInfo {
            likes_count: 1,
            dislikes_count: 0,
            my_status: LikeStatus::Like,
            newest_likes: vec![NewestLike {
                added_at: created,
                user_id,
                login: "alice".to_string(),
            }],
        },
    };

    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(value["shortDescription"], "Borrowing");
    assert_eq!(value["blogId"], 2);
    assert_eq!(value["blogName"], "Rustaceans");
    assert_eq!(value["likesInfo"]["likesCount"], 1);
    assert_eq!(value["likesInfo"]["dislikesCount"], 0);
    assert_eq!(value["likesInfo"]["myStatus"], "Like");
    assert_eq!(value["likesInfo"]["newestLikes"][0]["userId"], user_id.to_string());
    assert!(value["likesInfo"]["newestLikes"][0]["addedAt"].is_string());
    assert!(value.get("short_description").is_none());
}

#[test]
fn test_comment_view_json_shape() {
    let view = CommentView {
        id: 9,
        content: "A comment long enough to be valid".to_string(),
        commentator_info: CommentatorInfo {
            user_id: Uuid::from_u128(1),
            user_login: "bob".to_string(),
        },
        created_at: Utc::now(),
        likes_info: LikesInfo {
            likes_count: 0,
            dislikes_count: 2,
            my_status: LikeStatus::None,
        },
    };

    let value = serde_json::to_value(&view).unwrap();
    assert_eq!(value["commentatorInfo"]["userLogin"], "bob");
    assert_eq!(value["likesInfo"]["dislikesCount"], 2);
    assert_eq!(value["likesInfo"]["myStatus"], "None");
    assert!(value["likesInfo"].get("newestLikes").is_none());
}

#[test]
fn test_like_status_wire_names() {
    for status in LikeStatus::ALL {
        let encoded = serde_json::to_value(status).unwrap();
        assert_eq!(encoded, json!(status.as_str()));
        assert_eq!(status.as_str().parse::<LikeStatus>(), Ok(status));
    }
    assert!("like".parse::<LikeStatus>().is_err());
    assert_eq!(LikeStatus::default(), LikeStatus::None);
}

// --- Validation ---

#[test]
fn test_like_input_validation() {
    let input: LikeInput = serde_json::from_value(json!({"likeStatus": "Dislike"})).unwrap();
    assert!(input.validate().is_ok());
    assert_eq!(input.status(), LikeStatus::Dislike);

    for bad in ["", "like", "Love", " Like"] {
        let input = LikeInput {
            like_status: bad.to_string(),
        };
        assert!(input.validate().is_err(), "{bad:?} should be rejected");
    }
}

#[test]
fn test_comment_length_is_measured_after_trim() {
    let ok = CreateCommentInput {
        content: "x".repeat(20),
    };
    assert!(ok.validate().is_ok());

    let max = CreateCommentInput {
        content: "x".repeat(300),
    };
    assert!(max.validate().is_ok());

    let padded = CreateCommentInput {
        content: format!("   {}   ", "x".repeat(19)),
    };
    assert!(padded.validate().is_err());

    let long = CreateCommentInput {
        content: "x".repeat(301),
    };
    assert!(long.validate().is_err());
}

#[test]
fn test_blog_input_validation() {
    let valid = CreateBlogInput {
        name: "Rustaceans".to_string(),
        description: "All about Rust".to_string(),
        website_url: "https://rust.example.com".to_string(),
    };
    assert!(valid.validate().is_ok());

    let long_name = CreateBlogInput {
        name: "a".repeat(16),
        ..valid.clone()
    };
    assert!(long_name.validate().is_err());

    let blank_name = CreateBlogInput {
        name: "   ".to_string(),
        ..valid.clone()
    };
    assert!(blank_name.validate().is_err());

    let plain_http = CreateBlogInput {
        website_url: "http://rust.example.com".to_string(),
        ..valid.clone()
    };
    assert!(plain_http.validate().is_err());

    let not_a_url = CreateBlogInput {
        website_url: "https://".to_string(),
        ..valid
    };
    assert!(not_a_url.validate().is_err());
}

#[test]
fn test_post_input_validation() {
    let valid = CreatePostInput {
        title: "Ownership".to_string(),
        short_description: "Borrowing".to_string(),
        content: "Lifetimes".to_string(),
    };
    assert!(valid.validate().is_ok());

    let long_title = CreatePostInput {
        title: "t".repeat(31),
        ..valid.clone()
    };
    assert!(long_title.validate().is_err());

    let blank_content = CreatePostInput {
        content: " ".to_string(),
        ..valid
    };
    assert!(blank_content.validate().is_err());
}

#[test]
fn test_inputs_deserialize_from_camel_case() {
    let post: CreatePostInput = serde_json::from_value(json!({
        "title": "T",
        "shortDescription": "S",
        "content": "C"
    }))
    .unwrap();
    assert_eq!(post.short_description, "S");

    let blog: CreateBlogInput = serde_json::from_value(json!({
        "name": "N",
        "description": "D",
        "websiteUrl": "https://n.example.com"
    }))
    .unwrap();
    assert_eq!(blog.website_url, "https://n.example.com");
}
