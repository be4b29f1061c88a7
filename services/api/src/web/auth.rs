//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, logout and the
//! current-user lookup.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::IntoResponse,
    Extension, Json,
};
use chrono::{Duration, Utc};
use educare_core::domain::{Caller, Role};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, OnceLock};
use tracing::{error, info};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::web::dto::{ApiResponse, RoleDto, UserResponse};
use crate::web::middleware::{session_id_from_headers, SESSION_COOKIE};
use crate::web::rest::{failure, port_error, ApiFailure};
use crate::web::state::AppState;

const MIN_PASSWORD_LEN: usize = 8;

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    /// Defaults to STUDENT. Admin accounts cannot be self-registered.
    pub role: Option<RoleDto>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct AuthResponse {
    pub user_id: i64,
    pub email: String,
    pub role: RoleDto,
    /// Same value as the session cookie, for clients that send a Bearer header.
    pub token: String,
}

//=========================================================================================
// Input Checks
//=========================================================================================

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email pattern is valid")
    })
}

fn validate_registration(req: &RegisterRequest) -> Result<Role, ApiFailure> {
    if req.name.trim().is_empty() {
        return Err(failure(StatusCode::BAD_REQUEST, "Name is required"));
    }
    if !email_pattern().is_match(req.email.trim()) {
        return Err(failure(StatusCode::BAD_REQUEST, "Invalid email address"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(failure(
            StatusCode::BAD_REQUEST,
            format!("Password must be at least {} characters", MIN_PASSWORD_LEN),
        ));
    }
    match req.role.map(Role::from).unwrap_or(Role::Student) {
        Role::Admin => Err(failure(
            StatusCode::FORBIDDEN,
            "Admin accounts cannot be self-registered",
        )),
        role => Ok(role),
    }
}

fn session_cookie(session_id: &str, max_age: Duration) -> String {
    format!(
        "{}={}; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age={}",
        SESSION_COOKIE,
        session_id,
        max_age.num_seconds()
    )
}

/// Creates a fresh auth session and returns its id and cookie.
async fn open_session(
    state: &AppState,
    user_id: i64,
) -> Result<(String, String), ApiFailure> {
    let auth_session_id = Uuid::new_v4().to_string();
    let ttl = Duration::days(state.config.session_ttl_days);

    state
        .db
        .create_auth_session(&auth_session_id, user_id, Utc::now() + ttl)
        .await
        .map_err(|e| {
            error!("Failed to create auth session: {:?}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to create session")
        })?;

    let cookie = session_cookie(&auth_session_id, ttl);
    Ok((auth_session_id, cookie))
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /api/auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User created successfully", body = ApiResponse<AuthResponse>),
        (status = 400, description = "Invalid request"),
        (status = 403, description = "Role cannot be self-assigned"),
        (status = 409, description = "Email already registered")
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let role = validate_registration(&req)?;

    // 1. Hash the password
    let salt = SaltString::generate(&mut OsRng);
    let password_hash = Argon2::default()
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|e| {
            error!("Failed to hash password: {:?}", e);
            failure(StatusCode::INTERNAL_SERVER_ERROR, "Failed to hash password")
        })?
        .to_string();

    // 2. Create user in database
    let user = state
        .db
        .create_user(req.name.trim(), req.email.trim(), &password_hash, role)
        .await
        .map_err(|e| port_error("create user", e))?;
    info!("Registered user {} as {}", user.id, user.role);

    // 3. Log the new user in
    let (token, cookie) = open_session(&state, user.id).await?;

    let response = AuthResponse {
        user_id: user.id,
        email: user.email,
        role: user.role.into(),
        token,
    };
    Ok((
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::ok("User registered", response)),
    ))
}

/// POST /api/auth/login - Login with existing account
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = ApiResponse<AuthResponse>),
        (status = 401, description = "Invalid credentials"),
        (status = 500, description = "Internal server error")
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiFailure> {
    let invalid = || failure(StatusCode::UNAUTHORIZED, "Invalid email or password");

    // 1. Get user by email
    let user_creds = state
        .db
        .get_user_by_email(req.email.trim())
        .await
        .map_err(|e| {
            info!("Login failed for {}: {}", req.email, e);
            invalid()
        })?;

    // 2. Verify password
    let parsed_hash = PasswordHash::new(&user_creds.hashed_password).map_err(|e| {
        error!("Failed to parse password hash: {:?}", e);
        failure(StatusCode::INTERNAL_SERVER_ERROR, "Authentication error")
    })?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Err(invalid());
    }

    // 3. Open a session
    let (token, cookie) = open_session(&state, user_creds.user_id).await?;

    let response = AuthResponse {
        user_id: user_creds.user_id,
        email: user_creds.email,
        role: user_creds.role.into(),
        token,
    };
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::ok("Login successful", response)),
    ))
}

/// POST /api/auth/logout - Logout and invalidate session
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses(
        (status = 200, description = "Logout successful"),
        (status = 401, description = "No active session")
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiFailure> {
    let auth_session_id = session_id_from_headers(&headers)
        .ok_or(failure(StatusCode::UNAUTHORIZED, "No session found"))?;

    state
        .db
        .delete_auth_session(&auth_session_id)
        .await
        .map_err(|e| port_error("logout", e))?;

    let cookie = session_cookie("", Duration::zero());
    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, cookie)],
        Json(ApiResponse::done("Logged out")),
    ))
}

/// GET /api/auth/me - Profile of the authenticated caller
#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserResponse>),
        (status = 401, description = "Not logged in")
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<UserResponse>>, ApiFailure> {
    let user = state
        .db
        .get_user_by_id(caller.user_id)
        .await
        .map_err(|e| port_error("load current user", e))?;
    Ok(Json(ApiResponse::ok("Current user", user.into())))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str, role: Option<RoleDto>) -> RegisterRequest {
        RegisterRequest {
            name: "Sam".to_string(),
            email: email.to_string(),
            password: password.to_string(),
            role,
        }
    }

    #[test]
    fn registration_defaults_to_student() {
        let role = validate_registration(&request("sam@example.com", "hunter22", None)).unwrap();
        assert_eq!(role, Role::Student);
    }

    #[test]
    fn registration_rejects_bad_input() {
        let bad_email = validate_registration(&request("not-an-email", "hunter22", None));
        assert_eq!(bad_email.unwrap_err().0, StatusCode::BAD_REQUEST);

        let short_password = validate_registration(&request("sam@example.com", "short", None));
        assert_eq!(short_password.unwrap_err().0, StatusCode::BAD_REQUEST);

        let admin = validate_registration(&request("sam@example.com", "hunter22", Some(RoleDto::Admin)));
        assert_eq!(admin.unwrap_err().0, StatusCode::FORBIDDEN);
    }

    #[test]
    fn logout_cookie_expires_immediately() {
        assert_eq!(
            session_cookie("", Duration::zero()),
            "session=; HttpOnly; Secure; SameSite=Lax; Path=/; Max-Age=0"
        );
    }
}
