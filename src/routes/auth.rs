use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::auth::ProfileUpdate;
use crate::db::models::{Id, User};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::state::AppState;

// --- Views ---

/// The resident user without the password hash.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: Id,
    pub name: Option<String>,
    pub username: String,
    pub is_admin: bool,
}

impl From<User> for SessionUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            username: user.username,
            is_admin: user.is_admin,
        }
    }
}

// --- Requests ---

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub username: String,
    pub password: String,
    pub confirm_password: Option<String>,
}

#[derive(Deserialize)]
pub struct PasswordChangeRequest {
    pub current: String,
    pub new: String,
    pub confirm: String,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/session", get(current_session).delete(delete_account))
        .route("/api/session/login", post(login))
        .route("/api/session/register", post(register))
        .route("/api/session/logout", post(logout))
        .route("/api/session/profile", put(update_profile))
        .route("/api/session/password", put(change_password))
}

// --- Handlers ---

async fn current_session(MaybeUser(user): MaybeUser) -> Json<Option<SessionUser>> {
    Json(user.map(SessionUser::from))
}

async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<SessionUser>> {
    let user = state.sessions.login(&req.username, &req.password).await?;
    Ok(Json(user.into()))
}

async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<SessionUser>)> {
    if let Some(confirm) = req.confirm_password.as_deref() {
        if confirm != req.password {
            return Err(AppError::Validation("Passwords do not match".into()));
        }
    }

    let user = state
        .sessions
        .register(&req.name, &req.username, &req.password)
        .await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

async fn logout(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.sessions.logout().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn update_profile(
    State(state): State<AppState>,
    Json(update): Json<ProfileUpdate>,
) -> AppResult<Json<SessionUser>> {
    let user = state.sessions.update_profile(update).await?;
    Ok(Json(user.into()))
}

async fn change_password(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(req): Json<PasswordChangeRequest>,
) -> AppResult<Json<SessionUser>> {
    if req.new != req.confirm {
        return Err(AppError::Validation("New passwords do not match".into()));
    }

    let user = state.sessions.change_password(&req.current, &req.new).await?;
    Ok(Json(user.into()))
}

async fn delete_account(State(state): State<AppState>) -> AppResult<StatusCode> {
    state.sessions.delete_account().await?;
    Ok(StatusCode::NO_CONTENT)
}
