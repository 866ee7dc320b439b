//! Catalog endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use crate::application::books::BookDraft;
use crate::domain::book::Book;
use crate::domain::ports::BookFilter;
use crate::error::LibraryError;

#[derive(Deserialize)]
pub struct BookRequest {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
}

impl From<BookRequest> for BookDraft {
    fn from(req: BookRequest) -> Self {
        Self {
            title: req.title,
            author: req.author,
            isbn: req.isbn,
            publication_year: req.publication_year,
        }
    }
}

#[derive(Deserialize)]
pub struct ListParams {
    pub available: Option<bool>,
    pub author: Option<String>,
}

#[derive(Serialize)]
pub struct CreatedResponse {
    pub id: Uuid,
}

#[derive(Serialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
    pub is_available: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.into(),
            title: book.title,
            author: book.author,
            isbn: book.isbn,
            publication_year: book.publication_year,
            is_available: book.is_available,
        }
    }
}

/// POST /api/books
pub async fn create(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BookRequest>,
) -> Result<(StatusCode, Json<CreatedResponse>), ApiError> {
    let id = state.books.create(req.into()).await?;
    Ok((StatusCode::CREATED, Json(CreatedResponse { id: id.into() })))
}

/// PUT /api/books/{id}
pub async fn update(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<BookRequest>,
) -> Result<StatusCode, ApiError> {
    state.books.update(id.into(), req.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// DELETE /api/books/{id} — fails while the book is on loan.
pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.books.delete(id.into()).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/books?available=&author=
pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListParams>,
) -> Result<Json<Vec<BookResponse>>, ApiError> {
    let books = state
        .books
        .list(BookFilter {
            available: params.available,
            author: params.author,
        })
        .await?;
    Ok(Json(books.into_iter().map(BookResponse::from).collect()))
}

/// GET /api/books/{id}
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<BookResponse>, ApiError> {
    let book = state
        .books
        .get(id.into())
        .await?
        .ok_or_else(|| LibraryError::not_found("book"))?;
    Ok(Json(book.into()))
}
