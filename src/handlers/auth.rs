use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Json,
};
use bcrypt::{hash, verify};
use chrono::Duration;
use serde_json::{json, Value};
use validator::Validate;

use super::{parse_body, JsonBody};
use crate::{
    middleware::auth::AuthUser,
    models::user::{LoginRequest, NewUser, RegisterRequest, TokenResponse, User, UserResponse, UserRole},
    store::StoreError,
    utils::{
        errors::AppError,
        jwt::create_jwt,
        logger::{event_meta, LOGGER},
    },
    AppState,
};

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn issue_token(state: &AppState, user: &User) -> Result<String, AppError> {
    create_jwt(user, &state.jwt_secret, Duration::days(state.jwt_expiry_days))
        .map_err(|e| AppError::InternalServerError(format!("Failed to create token: {}", e)))
}

fn invalid_credentials() -> AppError {
    AppError::BadRequest("Invalid credentials".to_string())
}

async fn register_as(
    state: &AppState,
    body: Value,
    role: UserRole,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let mut payload: RegisterRequest = parse_body(body)?;
    payload.name = payload.name.trim().to_string();
    payload.email = normalize_email(&payload.email);
    payload.validate()?;

    if state.store.find_user_by_email(&payload.email, None).await?.is_some() {
        return Err(AppError::BadRequest("User already exists".to_string()));
    }

    let password_hash = hash(&payload.password, state.bcrypt_cost)
        .map_err(|e| AppError::InternalServerError(format!("Failed to hash password: {}", e)))?;

    let user = state
        .store
        .insert_user(NewUser {
            name: payload.name,
            email: payload.email,
            password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            StoreError::Conflict(_) => AppError::BadRequest("User already exists".to_string()),
            other => other.into(),
        })?;

    LOGGER.log_business_event(
        "user_registered",
        Some(user.id),
        event_meta([("role", json!(role.as_str()))]),
    );

    let token = issue_token(state, &user)?;
    Ok((StatusCode::CREATED, Json(TokenResponse { token })))
}

async fn login_as(state: &AppState, body: Value, role: UserRole) -> Result<Json<TokenResponse>, AppError> {
    let payload: LoginRequest = parse_body(body)?;
    payload.validate()?;

    let user = state
        .store
        .find_user_by_email(&normalize_email(&payload.email), Some(role))
        .await?
        .ok_or_else(invalid_credentials)?;

    let is_valid = verify(&payload.password, &user.password_hash)
        .map_err(|e| AppError::InternalServerError(format!("Failed to verify password: {}", e)))?;
    if !is_valid {
        return Err(invalid_credentials());
    }

    let token = issue_token(state, &user)?;
    Ok(Json(TokenResponse { token }))
}

pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    register_as(&state, body, UserRole::Candidate).await
}

pub async fn register_admin(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    register_as(&state, body, UserRole::Admin).await
}

pub async fn login(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<TokenResponse>, AppError> {
    login_as(&state, body, UserRole::Candidate).await
}

pub async fn login_admin(
    State(state): State<AppState>,
    JsonBody(body): JsonBody,
) -> Result<Json<TokenResponse>, AppError> {
    login_as(&state, body, UserRole::Admin).await
}

pub async fn me(
    State(state): State<AppState>,
    Extension(auth_user): Extension<AuthUser>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state
        .store
        .find_user(auth_user.id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;
    Ok(Json(UserResponse::from(user)))
}
