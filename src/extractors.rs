use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::db::models::User;
use crate::error::AppError;
use crate::state::AppState;

/// The resident user. Returns 401 if nobody is signed in.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        state
            .sessions
            .current()
            .await
            .map(CurrentUser)
            .ok_or(AppError::Unauthorized)
    }
}

impl CurrentUser {
    /// Authors may change their own content; the admin may change anything.
    pub fn can_modify(&self, author_id: i64) -> bool {
        self.0.is_admin || self.0.id == author_id
    }
}

/// Resident user holding the admin flag. 401 when signed out, 403 otherwise.
#[derive(Debug, Clone)]
pub struct AdminUser(pub User);

impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let CurrentUser(user) = CurrentUser::from_request_parts(parts, state).await?;
        if user.is_admin {
            Ok(AdminUser(user))
        } else {
            Err(AppError::Forbidden)
        }
    }
}

/// Optional user extractor - returns None instead of 401 when signed out.
pub struct MaybeUser(pub Option<User>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(
        _parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(state.sessions.current().await))
    }
}
