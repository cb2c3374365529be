pub mod health;
pub mod parse;

use axum::Router;

/// All API routes, without middleware.
pub fn router() -> Router {
    Router::new().merge(health::router()).merge(parse::router())
}
