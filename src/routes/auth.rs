use axum::routing::{get, post};
use axum::Router;

use crate::auth::handlers;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/v1/user/register", post(handlers::register))
        .route("/api/v1/user/login", post(handlers::login))
        .route("/api/v1/user/logout", get(handlers::logout))
}
