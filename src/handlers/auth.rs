use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::db::queries;
use crate::errors::AppError;
use crate::models::{Role, User};
use crate::services::auth as auth_service;
use crate::state::AppState;

/// Resolves the bearer token in `headers` to a user row.
pub fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<User, AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    let token = auth.strip_prefix("Bearer ").ok_or(AppError::Unauthorized)?;

    let claims = auth_service::verify_token(&state.config.jwt_secret, token)?;

    let db = state.db.lock().unwrap();
    queries::get_user_by_id(&db, claims.sub)?.ok_or(AppError::Unauthorized)
}

pub fn require_admin(user: &User) -> Result<(), AppError> {
    if user.role != Role::Admin {
        return Err(AppError::Forbidden("admin access required".to_string()));
    }
    Ok(())
}

pub fn require_driver(user: &User) -> Result<(), AppError> {
    if user.role != Role::Driver {
        return Err(AppError::Forbidden("driver access required".to_string()));
    }
    Ok(())
}

// POST /auth/register
#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: Role,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>), AppError> {
    if body.name.trim().is_empty() {
        return Err(AppError::InvalidArgument("name must not be empty".to_string()));
    }
    if !body.email.contains('@') {
        return Err(AppError::InvalidArgument("invalid email address".to_string()));
    }
    if body.password.len() < 6 || body.password.len() > 64 {
        return Err(AppError::InvalidArgument(
            "password must be 6-64 characters".to_string(),
        ));
    }

    let password_hash = auth_service::hash_password(&body.password)?;

    let db = state.db.lock().unwrap();
    if queries::get_user_by_email(&db, &body.email)?.is_some() {
        return Err(AppError::Conflict("email already registered".to_string()));
    }
    queries::create_user(&db, &body.name, &body.email, &password_hash, body.role)?;

    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({"message": "registered successfully"})),
    ))
}

// POST /auth/login
#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub role: Role,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginRequest>,
) -> Result<Json<TokenResponse>, AppError> {
    let user = {
        let db = state.db.lock().unwrap();
        queries::get_user_by_email(&db, &body.email)?
    };

    let user = user
        .filter(|u| auth_service::verify_password(&body.password, &u.password_hash))
        .ok_or(AppError::Unauthorized)?;

    let token = auth_service::issue_token(
        &state.config.jwt_secret,
        state.config.token_ttl_hours,
        &user,
    )?;

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer",
        role: user.role,
    }))
}
