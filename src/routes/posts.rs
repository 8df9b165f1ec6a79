use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::board::{board_page, BoardPage, BoardQuery, NewComment, NewPost, PostUpdate};
use crate::db::models::{Comment, Id, Post};
use crate::error::{AppError, AppResult};
use crate::extractors::{CurrentUser, MaybeUser};
use crate::state::AppState;

// --- Forms ---

#[derive(Deserialize)]
pub struct CreatePostForm {
    pub category: Option<String>,
    pub title: String,
    pub content: String,
}

#[derive(Deserialize)]
pub struct CommentForm {
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct LikeState {
    pub likes: u32,
    pub liked: bool,
}

// --- Router ---

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/posts", get(list_posts).post(create_post))
        .route(
            "/api/posts/{id}",
            get(get_post).put(update_post).delete(delete_post),
        )
        .route("/api/posts/{id}/like", post(toggle_like))
        .route("/api/posts/{id}/liked", get(has_liked))
        .route("/api/posts/{id}/comments", post(add_comment))
        .route(
            "/api/posts/{id}/comments/{comment_id}",
            put(update_comment).delete(delete_comment),
        )
        .route("/api/users/{id}/posts", get(posts_by_author))
}

// --- Handlers ---

async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<BoardQuery>,
) -> Json<BoardPage> {
    let posts = state.posts.all().await;
    Json(board_page(posts, &query, state.config.board.posts_per_page))
}

async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(form): Json<CreatePostForm>,
) -> AppResult<(StatusCode, Json<Post>)> {
    let post = state
        .posts
        .create(NewPost {
            category: form.category,
            title: form.title,
            content: form.content,
            author: user.username,
            author_id: user.id,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<Id>) -> AppResult<Json<Post>> {
    state
        .posts
        .get(id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))
}

async fn update_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Id>,
    Json(update): Json<PostUpdate>,
) -> AppResult<Json<Post>> {
    authorize_post(&state, &user, id).await?;
    Ok(Json(state.posts.update(id, update).await?))
}

async fn delete_post(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<Id>,
) -> AppResult<StatusCode> {
    authorize_post(&state, &user, id).await?;
    state.posts.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_like(
    State(state): State<AppState>,
    MaybeUser(user): MaybeUser,
    Path(id): Path<Id>,
) -> AppResult<Json<LikeState>> {
    let user_id = user.map(|u| u.id);
    let post = state.posts.toggle_like(id, user_id).await?;
    Ok(Json(LikeState {
        likes: post.likes,
        liked: user_id.is_some_and(|uid| post.is_liked_by(uid)),
    }))
}

async fn has_liked(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
) -> AppResult<Json<LikeState>> {
    let post = state
        .posts
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;
    Ok(Json(LikeState {
        likes: post.likes,
        liked: state.posts.has_liked(id, user.id).await,
    }))
}

async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Id>,
    Json(form): Json<CommentForm>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = state
        .posts
        .add_comment(
            id,
            NewComment {
                author: user.username,
                author_id: user.id,
                content: form.content,
            },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn update_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, comment_id)): Path<(Id, Id)>,
    Json(form): Json<CommentForm>,
) -> AppResult<Json<Comment>> {
    authorize_comment(&state, &user, id, comment_id).await?;
    Ok(Json(
        state
            .posts
            .update_comment(id, comment_id, &form.content)
            .await?,
    ))
}

async fn delete_comment(
    State(state): State<AppState>,
    user: CurrentUser,
    Path((id, comment_id)): Path<(Id, Id)>,
) -> AppResult<StatusCode> {
    authorize_comment(&state, &user, id, comment_id).await?;
    state.posts.delete_comment(id, comment_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn posts_by_author(State(state): State<AppState>, Path(id): Path<Id>) -> Json<Vec<Post>> {
    Json(state.posts.posts_by_author(id).await)
}

// --- Helpers ---

async fn authorize_post(state: &AppState, user: &CurrentUser, id: Id) -> AppResult<()> {
    let post = state
        .posts
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;

    if !user.can_modify(post.author_id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}

async fn authorize_comment(
    state: &AppState,
    user: &CurrentUser,
    id: Id,
    comment_id: Id,
) -> AppResult<()> {
    let post = state
        .posts
        .get(id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("Post {} not found", id)))?;
    let comment = post
        .comments
        .iter()
        .find(|c| c.id == comment_id)
        .ok_or_else(|| {
            AppError::NotFound(format!("Comment {} not found on post {}", comment_id, id))
        })?;

    if !user.can_modify(comment.author_id) {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
