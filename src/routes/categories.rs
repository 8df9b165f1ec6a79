use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::Deserialize;

use crate::db::models::{Category, Id};
use crate::error::AppResult;
use crate::extractors::AdminUser;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CategoryForm {
    pub name: String,
}

#[derive(Deserialize)]
pub struct ReorderForm {
    pub order: i64,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/categories", get(list_categories).post(create_category))
        .route(
            "/api/categories/{id}",
            put(rename_category).delete(delete_category),
        )
        .route("/api/categories/{id}/reorder", post(reorder_category))
}

async fn list_categories(State(state): State<AppState>) -> Json<Vec<Category>> {
    Json(state.categories.list().await)
}

async fn create_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Json(form): Json<CategoryForm>,
) -> AppResult<(StatusCode, Json<Category>)> {
    let category = state.categories.create(&form.name).await?;
    Ok((StatusCode::CREATED, Json(category)))
}

async fn rename_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Id>,
    Json(form): Json<CategoryForm>,
) -> AppResult<Json<Category>> {
    Ok(Json(state.categories.update(id, &form.name).await?))
}

async fn delete_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Id>,
) -> AppResult<Json<Vec<Category>>> {
    state.categories.delete(id).await?;
    Ok(Json(state.categories.list().await))
}

async fn reorder_category(
    State(state): State<AppState>,
    _admin: AdminUser,
    Path(id): Path<Id>,
    Json(form): Json<ReorderForm>,
) -> AppResult<Json<Vec<Category>>> {
    state.categories.reorder(id, form.order).await?;
    Ok(Json(state.categories.list().await))
}
