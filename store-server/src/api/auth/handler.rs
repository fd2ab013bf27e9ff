//! Authentication Handlers
//!
//! Registration, login and current-principal lookup.

use std::time::Duration;

use axum::{Json, extract::State};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::db::models::{User, UserRole};
use crate::db::repository::UserRepository;
use crate::utils::time::now_ms;
use crate::utils::validation::{
    MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, validate_birth_date, validate_email, validate_password,
    validate_required_text,
};
use crate::utils::{ApiResponse, AppError, AppResult, ErrorCode};

use shared::client::{LoginRequest, LoginResponse, RegisterRequest, UserInfo};

/// Fixed delay for authentication to prevent timing attacks
const AUTH_FIXED_DELAY_MS: u64 = 500;

fn user_info(user: &User) -> UserInfo {
    UserInfo {
        id: user.id_string(),
        username: user.username.clone(),
        full_name: user.full_name.clone(),
        email: user.email.clone(),
        role: user.role.as_str().to_string(),
    }
}

/// POST /api/auth/register - create a new buyer account
pub async fn register(
    State(state): State<ServerState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<Json<ApiResponse<UserInfo>>> {
    validate_required_text(&req.username, "username", MAX_SHORT_TEXT_LEN)?;
    validate_required_text(&req.full_name, "full name", MAX_NAME_LEN)?;
    validate_required_text(&req.phone_number, "phone number", MAX_SHORT_TEXT_LEN)?;
    validate_email(&req.email)?;
    validate_password(&req.password)?;
    validate_birth_date(&req.birth_date)?;

    let repo = UserRepository::new(state.get_db());

    let taken = repo
        .username_or_email_taken(&req.username, &req.email)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
    if taken {
        return Err(AppError::with_message(
            ErrorCode::AlreadyExists,
            "Username or email already exists",
        ));
    }

    let hash_pass = User::hash_password(&req.password)
        .map_err(|e| AppError::internal(format!("Password hashing failed: {e}")))?;

    let user = User {
        id: None,
        username: req.username,
        email: req.email,
        full_name: req.full_name,
        phone_number: req.phone_number,
        birth_date: req.birth_date,
        hash_pass,
        role: UserRole::User,
        created_at: now_ms(),
    };

    let created = repo
        .create(user)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    tracing::info!(
        user_id = %created.id_string(),
        username = %created.username,
        "User registered"
    );

    Ok(Json(ApiResponse::success_with_message(
        "User created successfully",
        user_info(&created),
    )))
}

/// POST /api/auth/login - verify credentials and issue a JWT
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    let repo = UserRepository::new(state.get_db());
    let user = repo
        .find_by_username(&req.username)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    // Fixed delay before inspecting the lookup result, to keep response
    // timing independent of whether the username exists
    tokio::time::sleep(Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    // Unified error message to prevent username enumeration
    let user = match user {
        Some(user) => {
            let password_valid = user
                .verify_password(&req.password)
                .map_err(|e| AppError::internal(format!("Password verification failed: {e}")))?;
            if !password_valid {
                tracing::warn!(username = %req.username, "Login failed - invalid credentials");
                return Err(AppError::invalid_credentials());
            }
            user
        }
        None => {
            tracing::warn!(username = %req.username, "Login failed - user not found");
            return Err(AppError::invalid_credentials());
        }
    };

    let user_id = user.id_string();
    let token = state
        .get_jwt_service()
        .generate_token(&user_id, &user.username, user.role.as_str())
        .map_err(|e| AppError::internal(format!("Failed to generate token: {e}")))?;

    tracing::info!(
        user_id = %user_id,
        username = %user.username,
        role = user.role.as_str(),
        "User logged in"
    );

    Ok(Json(LoginResponse {
        token,
        user: user_info(&user),
    }))
}

/// GET /api/auth/me - the authenticated principal's profile
pub async fn me(
    State(state): State<ServerState>,
    user: CurrentUser,
) -> AppResult<Json<UserInfo>> {
    let repo = UserRepository::new(state.get_db());
    let record = repo
        .find_by_id(&user.id)
        .await
        .map_err(|e| AppError::database(e.to_string()))?
        .ok_or_else(|| AppError::new(ErrorCode::UserNotFound))?;

    Ok(Json(user_info(&record)))
}
