//! Registration and token login.
//!
//! Register, log in with username and password, receive an opaque
//! token, and present it as `Authorization: Token <value>` on mutating
//! requests.

use actix_web::{http::header, web, HttpRequest, HttpResponse};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use gt_core::error::AppError;
use gt_core::models::User;
use gt_core::traits::UserStore;

use crate::error::{unavailable, ApiError};
use crate::handlers::AppState;

const MIN_PASSWORD_CHARS: usize = 8;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub auth_token: String,
}

pub async fn register(
    data: web::Data<AppState>,
    payload: web::Json<RegisterRequest>,
) -> Result<HttpResponse, ApiError> {
    let username = payload.username.trim();
    if username.is_empty() {
        return Err(AppError::ValidationError("username must not be empty".into()).into());
    }
    if payload.password.chars().count() < MIN_PASSWORD_CHARS {
        return Err(AppError::ValidationError(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_CHARS
        ))
        .into());
    }

    if data
        .users
        .find_by_username(username)
        .await
        .map_err(unavailable)?
        .is_some()
    {
        return Err(AppError::Conflict(format!("username {} is taken", username)).into());
    }

    let hash = data
        .auth
        .hash_password(&payload.password)
        .map_err(|e| AppError::Internal(e.to_string()))?;
    let user = User {
        id: Uuid::now_v7(),
        username: username.to_string(),
        email: payload.email.trim().to_string(),
        created_at: Utc::now(),
    };
    data.users
        .create_user(&user, &hash)
        .await
        .map_err(unavailable)?;

    Ok(HttpResponse::Created().json(&user))
}

pub async fn login(
    data: web::Data<AppState>,
    payload: web::Json<LoginRequest>,
) -> Result<HttpResponse, ApiError> {
    let found = data
        .users
        .find_by_username(payload.username.trim())
        .await
        .map_err(unavailable)?;

    // One message for both unknown user and wrong password, so the
    // endpoint cannot be used to probe for usernames.
    let (user, hash) = found.ok_or_else(|| AppError::Unauthorized("invalid credentials".into()))?;
    if !data.auth.verify_password(&payload.password, &hash) {
        return Err(AppError::Unauthorized("invalid credentials".into()).into());
    }

    let token = data.auth.generate_token(&user.username);
    data.users
        .store_token(user.id, &token)
        .await
        .map_err(unavailable)?;

    Ok(HttpResponse::Ok().json(TokenResponse { auth_token: token }))
}

/// Resolves the `Authorization: Token <value>` header to a user.
pub async fn require_user(req: &HttpRequest, users: &dyn UserStore) -> Result<User, AppError> {
    let header_value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or_else(|| AppError::Unauthorized("missing Authorization header".into()))?;
    let value = header_value
        .to_str()
        .map_err(|_| AppError::Unauthorized("malformed Authorization header".into()))?;
    let token = value
        .strip_prefix("Token ")
        .ok_or_else(|| AppError::Unauthorized("expected `Token <value>` scheme".into()))?;

    users
        .find_by_token(token.trim())
        .await
        .map_err(unavailable)?
        .ok_or_else(|| AppError::Unauthorized("invalid or expired token".into()))
}
