use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode, header},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use blog_platform::{
    AppConfig, AppState, InMemoryRepository, create_router,
    auth::{AuthenticatorState, Claims, JwtAuthenticator},
    models::User,
    repository::RepositoryState,
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::{Value, json};
use std::{
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tokio::net::TcpListener;
use tower::ServiceExt;
use uuid::Uuid;

const ALICE: Uuid = Uuid::from_u128(0xA11CE);
const COMMENT: &str = "A comment that easily clears twenty characters";

// --- Test Harness ---

async fn build_app(config: AppConfig) -> Router {
    let memory = InMemoryRepository::new();
    memory
        .insert_user(User {
            id: ALICE,
            login: "alice".to_string(),
            email: "alice@example.com".to_string(),
        })
        .await;

    let repo = Arc::new(memory) as RepositoryState;
    let auth = Arc::new(JwtAuthenticator::new(repo.clone(), &config)) as AuthenticatorState;
    create_router(AppState::new(repo, auth, config))
}

async fn test_app() -> Router {
    build_app(AppConfig::default()).await
}

fn bearer(config: &AppConfig, sub: Uuid) -> String {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs() as usize;
    let claims = Claims {
        sub,
        iat: now,
        exp: now + 3600,
    };
    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .unwrap();
    format!("Bearer {token}")
}

fn admin_basic(config: &AppConfig) -> String {
    let credentials = format!("{}:{}", config.admin_login, config.admin_password);
    format!("Basic {}", STANDARD.encode(credentials))
}

fn json_request(method: &str, uri: &str, auth: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(auth) = auth {
        builder = builder.header(header::AUTHORIZATION, auth);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, body)
}

/// Creates a blog and one post through the admin routes; returns the post id.
async fn seed_post(app: &Router) -> i64 {
    let config = AppConfig::default();
    let (status, blog) = send(
        app,
        json_request(
            "POST",
            "/sa/blogs",
            Some(&admin_basic(&config)),
            json!({"name": "Rustaceans", "description": "All about Rust", "websiteUrl": "https://rust.example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, post) = send(
        app,
        json_request(
            "POST",
            &format!("/sa/blogs/{}/posts", blog["id"]),
            Some(&admin_basic(&config)),
            json!({"title": "Ownership", "shortDescription": "Borrowing", "content": "Lifetimes"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    post["id"].as_i64().unwrap()
}

// --- Tests ---

#[tokio::test]
async fn test_health_check() {
    let app = test_app().await;

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let address = format!("http://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let response = reqwest::Client::new()
        .get(format!("{}/health", address))
        .send()
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn test_post_lifecycle_with_bearer_token() {
    let app = test_app().await;
    let config = AppConfig::default();
    let post_id = seed_post(&app).await;
    let token = bearer(&config, ALICE);

    let (status, _) = send(
        &app,
        json_request(
            "PUT",
            &format!("/posts/{post_id}/like-status"),
            Some(&token),
            json!({"likeStatus": "Like"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let mut request = get(&format!("/posts/{post_id}"));
    request
        .headers_mut()
        .insert(header::AUTHORIZATION, token.parse().unwrap());
    let (status, post) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(post["blogName"], "Rustaceans");
    assert_eq!(post["likesInfo"]["likesCount"], 1);
    assert_eq!(post["likesInfo"]["myStatus"], "Like");
    assert_eq!(post["likesInfo"]["newestLikes"][0]["login"], "alice");

    let (_, anonymous) = send(&app, get(&format!("/posts/{post_id}"))).await;
    assert_eq!(anonymous["likesInfo"]["myStatus"], "None");

    let (status, comment) = send(
        &app,
        json_request(
            "POST",
            &format!("/posts/{post_id}/comments"),
            Some(&token),
            json!({"content": COMMENT}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(comment["commentatorInfo"]["userLogin"], "alice");
    assert_eq!(comment["likesInfo"]["myStatus"], "None");

    let (status, page) = send(&app, get(&format!("/posts/{post_id}/comments?pageSize=5"))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["totalCount"], 1);
    assert_eq!(page["pageSize"], 5);
    assert_eq!(page["pagesCount"], 1);
}

#[tokio::test]
async fn test_writes_require_authentication() {
    let app = test_app().await;
    let post_id = seed_post(&app).await;

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/posts/{post_id}/like-status"),
            None,
            json!({"likeStatus": "Like"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "unauthorized");

    let (status, _) = send(
        &app,
        json_request(
            "POST",
            &format!("/posts/{post_id}/comments"),
            Some("Bearer not-a-jwt"),
            json!({"content": COMMENT}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_dev_header_authenticates_in_testing_env() {
    let app = test_app().await;
    let post_id = seed_post(&app).await;

    let request = Request::builder()
        .method("PUT")
        .uri(format!("/posts/{post_id}/like-status"))
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-user-id", ALICE.to_string())
        .body(Body::from(json!({"likeStatus": "Dislike"}).to_string()))
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_validation_errors_use_errors_messages_shape() {
    let app = test_app().await;
    let config = AppConfig::default();
    let post_id = seed_post(&app).await;
    let token = bearer(&config, ALICE);

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/posts/{post_id}/like-status"),
            Some(&token),
            json!({"likeStatus": "Love"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorsMessages"][0]["field"], "likeStatus");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            &format!("/posts/{post_id}/comments"),
            Some(&token),
            json!({"content": "   too short          "}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errorsMessages"][0]["field"], "content");

    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/sa/blogs",
            Some(&admin_basic(&config)),
            json!({"name": "", "description": "ok", "websiteUrl": "http://insecure.example.com"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let fields: Vec<&str> = body["errorsMessages"]
        .as_array()
        .unwrap()
        .iter()
        .filter_map(|error| error["field"].as_str())
        .collect();
    assert!(fields.contains(&"name"));
    assert!(fields.contains(&"websiteUrl"));
}

#[tokio::test]
async fn test_malformed_json_is_bad_request() {
    let app = test_app().await;
    let config = AppConfig::default();

    let request = Request::builder()
        .method("POST")
        .uri("/sa/blogs")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, admin_basic(&config))
        .body(Body::from("{not json"))
        .unwrap();
    let (status, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["errorsMessages"].is_array());
}

#[tokio::test]
async fn test_bad_query_params_use_errors_messages_shape() {
    let app = test_app().await;

    for uri in ["/posts?pageSize=abc", "/posts?sortDirection=ASC"] {
        let (status, body) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert_eq!(body["errorsMessages"][0]["field"], "query", "{uri}");
    }

    let (status, page) = send(&app, get("/posts?pageNumber=9223372036854775807&pageSize=100")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["items"].as_array().map(Vec::len), Some(0));
}

#[tokio::test]
async fn test_unknown_and_malformed_ids_are_not_found() {
    let app = test_app().await;

    for uri in ["/posts/999", "/posts/abc", "/comments/42", "/posts/999/comments"] {
        let (status, _) = send(&app, get(uri)).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
}

#[tokio::test]
async fn test_admin_routes_require_basic_credentials() {
    let app = test_app().await;
    let body = json!({"name": "Blog", "description": "d", "websiteUrl": "https://b.example.com"});

    let (status, _) = send(&app, json_request("POST", "/sa/blogs", None, body.clone())).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let wrong = format!("Basic {}", STANDARD.encode("admin:wrong"));
    let (status, _) = send(&app, json_request("POST", "/sa/blogs", Some(&wrong), body)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_testing_module_wipes_data() {
    let app = test_app().await;
    let post_id = seed_post(&app).await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/testing/all-data")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = send(&app, get(&format!("/posts/{post_id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, page) = send(&app, get("/posts")).await;
    assert_eq!(page["totalCount"], 0);
}

#[tokio::test]
async fn test_optional_surfaces_follow_config() {
    let app = build_app(AppConfig {
        include_testing_module: false,
        is_swagger_enabled: false,
        ..AppConfig::default()
    })
    .await;

    let request = Request::builder()
        .method("DELETE")
        .uri("/testing/all-data")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&test_app().await, get("/api-docs/openapi.json")).await;
    assert_eq!(status, StatusCode::OK);
}
