pub mod books;
pub mod error;
pub mod loans;
pub mod users;

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::routing::{get, post};
use tower_http::trace::TraceLayer;

use crate::application::books::BookService;
use crate::application::loans::LoanService;
use crate::application::users::UserService;

/// Shared handler state: the three application services.
pub struct AppState {
    pub books: BookService,
    pub loans: LoanService,
    pub users: UserService,
}

/// Builds the application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/books", post(books::create).get(books::list))
        .route(
            "/api/books/{id}",
            get(books::get_by_id)
                .put(books::update)
                .delete(books::delete),
        )
        .route("/api/loans", post(loans::borrow).get(loans::list_active))
        .route("/api/loans/{id}", get(loans::get_by_id))
        .route("/api/loans/{id}/return", post(loans::return_loan))
        .route("/api/users", post(users::register).get(users::list))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}
