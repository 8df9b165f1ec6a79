pub mod auth;
pub mod categories;
pub mod posts;
pub mod search;

use axum::Router;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// The full JSON API.
pub fn app(state: AppState) -> Router {
    Router::new()
        .merge(auth::router())
        .merge(categories::router())
        .merge(posts::router())
        .merge(search::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
