use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{
    models::user::UserRole,
    utils::{errors::AppError, jwt::verify_jwt},
    AppState,
};

/// The caller, as loaded from the store after the token checked out.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: UserRole,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        matches!(self.role, UserRole::Admin)
    }

    pub fn is_candidate(&self) -> bool {
        matches!(self.role, UserRole::Candidate)
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers).ok_or_else(AppError::unauthenticated)?;
    let claims = verify_jwt(token, &state.jwt_secret).map_err(|e| {
        tracing::debug!("rejected token: {}", e);
        AppError::unauthenticated()
    })?;

    // accounts removed after the token was issued no longer authenticate
    let user = state
        .store
        .find_user(claims.id)
        .await?
        .ok_or_else(AppError::unauthenticated)?;

    Ok(AuthUser {
        id: user.id,
        role: user.role,
    })
}

pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(&state, request.headers()).await?;
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}

pub async fn admin_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_user = authenticate(&state, request.headers()).await?;
    if !auth_user.is_admin() {
        return Err(AppError::Forbidden(
            "Access denied: Admin rights required".to_string(),
        ));
    }
    request.extensions_mut().insert(auth_user);
    Ok(next.run(request).await)
}
