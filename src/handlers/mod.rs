pub mod applications;
pub mod auth;
pub mod jobs;

use axum::{
    async_trait,
    extract::{FromRequest, FromRequestParts, Query, Request},
    http::request::Parts,
    Json,
};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::utils::errors::AppError;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Raw JSON request body. Missing content type, bad syntax and oversized
/// bodies are answered through [`AppError`] like every other failure.
pub struct JsonBody(pub Value);

#[async_trait]
impl<S> FromRequest<S> for JsonBody
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<Value>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// Query string extractor whose rejections are [`AppError`]s.
pub struct QueryParams<T>(pub T);

#[async_trait]
impl<T, S> FromRequestParts<S> for QueryParams<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// Bodies arrive as raw JSON and are typed here, so field type mismatches
/// answer 400 in the common error format too.
fn parse_body<T: DeserializeOwned>(body: Value) -> Result<T, AppError> {
    serde_json::from_value(body).map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))
}

/// Ids are opaque to clients; a malformed one simply names nothing.
fn parse_id(raw: &str) -> Option<Uuid> {
    raw.parse().ok()
}
