use axum::{
    response::Redirect,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::StockService;

mod catalog;
mod categories;
pub mod error;
mod items;
mod pages;

pub use error::{ApiError, ApiResult};

pub type AppState = Arc<StockService>;

/// Routes served under `/stock`.
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(items::list))
        .route("/add", post(items::create))
        .route("/import", post(items::import))
        .route("/scan", get(pages::scan))
        .route("/set_language/:lang", get(pages::set_language))
        .route("/translations", get(pages::translations))
        .route("/ws", get(pages::events))
        .route("/items/:code", get(items::detail))
        .route("/items/:code/edit", post(items::edit))
        .route("/items/:code/delete", post(items::delete))
        .route("/items/:code/qr", get(items::qr))
        .route("/categories", get(categories::list))
        .route("/categories/add", post(categories::create))
        .route("/categories/:id/edit", post(categories::edit))
        .route("/categories/:id/delete", post(categories::delete))
        .route("/catalog", get(catalog::list))
        .route("/catalog/:code", get(catalog::detail))
        .route(
            "/catalog/:code/add_to_inventory",
            post(catalog::add_to_inventory),
        )
}

pub fn router(service: AppState) -> Router {
    Router::new()
        .route("/", get(|| async { Redirect::to("/stock") }))
        .nest("/stock", stock_routes())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}
