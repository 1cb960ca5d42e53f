use std::convert::Infallible;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use base64::{Engine, engine::general_purpose::STANDARD};
use jsonwebtoken::{DecodingKey, Validation, decode, errors::ErrorKind};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::{AppError, Result},
    repository::RepositoryState,
};

/// Claims
///
/// Payload of the bearer tokens issued by the identity service.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (sub): the UUID of the user, primary key of the `users` table.
    pub sub: Uuid,
    /// Expiration Time (exp): tokens past this instant are rejected.
    pub exp: usize,
    /// Issued At (iat).
    pub iat: usize,
}

/// Viewer
///
/// The identity a read executes on behalf of. `Anonymous` is the sentinel used when no
/// valid credential was supplied on an optional-auth endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Viewer {
    #[default]
    Anonymous,
    User(Uuid),
}

impl Viewer {
    pub fn user_id(&self) -> Option<Uuid> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }
}

/// AuthUser
///
/// The resolved identity of an authenticated request. Extracting it fails with
/// `Unauthorized` when the credential is missing or invalid, which makes it the guard for
/// every write endpoint.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub login: String,
}

impl AuthUser {
    pub fn viewer(&self) -> Viewer {
        Viewer::User(self.id)
    }
}

/// Authenticator
///
/// Turns request headers into an `AuthUser`. Held in application state behind a trait
/// object so the JWT implementation can be swapped, e.g. for a fixed identity in tests.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser>;
}

pub type AuthenticatorState = Arc<dyn Authenticator>;

/// JwtAuthenticator
///
/// Validates HS256 bearer tokens and confirms the subject still exists in the store.
/// In local environments the `x-user-id` header naming an existing user is accepted
/// as well.
pub struct JwtAuthenticator {
    repo: RepositoryState,
    decoding_key: DecodingKey,
    env: Env,
}

impl JwtAuthenticator {
    pub fn new(repo: RepositoryState, config: &AppConfig) -> Self {
        Self {
            repo,
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            env: config.env,
        }
    }

    async fn local_bypass(&self, headers: &HeaderMap) -> Result<Option<AuthUser>> {
        let Some(user_id) = headers
            .get("x-user-id")
            .and_then(|value| value.to_str().ok())
            .and_then(|raw| Uuid::parse_str(raw).ok())
        else {
            return Ok(None);
        };

        Ok(self.repo.get_user(user_id).await?.map(|user| AuthUser {
            id: user.id,
            login: user.login,
        }))
    }
}

/// Strips the `Bearer ` scheme from the Authorization header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

#[async_trait]
impl Authenticator for JwtAuthenticator {
    async fn authenticate(&self, headers: &HeaderMap) -> Result<AuthUser> {
        if self.env.is_local() {
            if let Some(user) = self.local_bypass(headers).await? {
                return Ok(user);
            }
        }

        let token = bearer_token(headers)
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let mut validation = Validation::default();
        validation.validate_exp = true;

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            let reason = match e.kind() {
                ErrorKind::ExpiredSignature => "token expired",
                _ => "invalid token",
            };
            tracing::debug!("rejected bearer token: {:?}", e);
            AppError::Unauthorized(reason.to_string())
        })?;

        // A valid signature is not enough: the account may have been removed since issue.
        let user = self
            .repo
            .get_user(token_data.claims.sub)
            .await?
            .ok_or_else(|| AppError::Unauthorized("unknown user".to_string()))?;

        Ok(AuthUser {
            id: user.id,
            login: user.login,
        })
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    AuthenticatorState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let authenticator = AuthenticatorState::from_ref(state);
        authenticator.authenticate(&parts.headers).await
    }
}

/// OptionalAuth
///
/// Identity for read endpoints: the user when a valid credential is present, otherwise
/// `Viewer::Anonymous`. Never rejects the request.
#[derive(Debug, Clone, Copy)]
pub struct OptionalAuth(pub Viewer);

impl<S> FromRequestParts<S> for OptionalAuth
where
    S: Send + Sync,
    AuthenticatorState: FromRef<S>,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let authenticator = AuthenticatorState::from_ref(state);
        match authenticator.authenticate(&parts.headers).await {
            Ok(user) => Ok(OptionalAuth(user.viewer())),
            Err(AppError::Unauthorized(_)) => Ok(OptionalAuth(Viewer::Anonymous)),
            Err(e) => {
                tracing::warn!("identity lookup failed, serving anonymously: {}", e);
                Ok(OptionalAuth(Viewer::Anonymous))
            }
        }
    }
}

/// AdminAuth
///
/// HTTP Basic guard for the `/sa` routes, checked against `ADMIN_LOGIN`/`ADMIN_PASSWORD`.
#[derive(Debug, Clone, Copy)]
pub struct AdminAuth;

impl AdminAuth {
    pub fn verify(headers: &HeaderMap, config: &AppConfig) -> Result<Self> {
        let encoded = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Basic "))
            .ok_or_else(|| AppError::Unauthorized("missing basic credentials".to_string()))?;

        let decoded = STANDARD
            .decode(encoded.trim())
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| AppError::Unauthorized("malformed basic credentials".to_string()))?;

        match decoded.split_once(':') {
            Some((login, password))
                if login == config.admin_login && password == config.admin_password =>
            {
                Ok(AdminAuth)
            }
            _ => Err(AppError::Unauthorized("invalid admin credentials".to_string())),
        }
    }
}

impl<S> FromRequestParts<S> for AdminAuth
where
    S: Send + Sync,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let config = AppConfig::from_ref(state);
        AdminAuth::verify(&parts.headers, &config)
    }
}
