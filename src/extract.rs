//! Request extractors shared by the HTTP handlers.

use axum::{
    Json,
    extract::{FromRequest, FromRequestParts, Path, Query, Request},
    http::request::Parts,
};
use serde::de::DeserializeOwned;
use validator::Validate;

use crate::error::{AppError, FieldError, Result};

/// EntityId
///
/// A numeric id taken from the route's single path parameter. Anything that is not an
/// integer cannot name an existing row, so it is reported as `NotFound`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityId(pub i64);

impl<S> FromRequestParts<S> for EntityId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| AppError::not_found(rejection.body_text()))?;

        raw.trim()
            .parse::<i64>()
            .map(EntityId)
            .map_err(|_| AppError::not_found(format!("id {raw}")))
    }
}

/// ValidatedJson
///
/// JSON body that has passed its `validator` rules. Malformed JSON and rule violations both
/// come back as a 400 with `errorsMessages`.
#[derive(Debug, Clone)]
pub struct ValidatedJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidatedJson<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Validate,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                AppError::Validation(vec![FieldError::new("body", rejection.body_text())])
            })?;
        value.validate()?;
        Ok(ValidatedJson(value))
    }
}

/// ParsedQuery
///
/// Query-string options. A value of the wrong type is a 400 with `errorsMessages`, same as
/// a bad body.
#[derive(Debug, Clone)]
pub struct ParsedQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ParsedQuery<T>
where
    S: Send + Sync,
    T: DeserializeOwned,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                AppError::Validation(vec![FieldError::new("query", rejection.body_text())])
            })?;
        Ok(ParsedQuery(value))
    }
}
