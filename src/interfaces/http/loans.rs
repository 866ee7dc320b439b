//! Loan endpoints: borrow, return, active list, single lookup.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::AppState;
use super::error::ApiError;
use crate::domain::loan::Loan;
use crate::error::LibraryError;

#[derive(Deserialize)]
pub struct BorrowRequest {
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub now: DateTime<Utc>,
}

#[derive(Deserialize)]
pub struct ReturnRequest {
    pub loan_id: Uuid,
    pub now: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct BorrowResponse {
    pub loan_id: Uuid,
}

#[derive(Serialize)]
pub struct LoanResponse {
    pub id: Uuid,
    pub book_id: Uuid,
    pub user_id: Uuid,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl From<Loan> for LoanResponse {
    fn from(loan: Loan) -> Self {
        Self {
            id: loan.id.into(),
            book_id: loan.book_id.into(),
            user_id: loan.user_id.into(),
            loan_date: loan.loan_date,
            return_date: loan.return_date,
        }
    }
}

/// POST /api/loans — borrow a book.
pub async fn borrow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BorrowRequest>,
) -> Result<(StatusCode, Json<BorrowResponse>), ApiError> {
    let loan_id = state
        .loans
        .borrow(req.user_id.into(), req.book_id.into(), req.now)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(BorrowResponse {
            loan_id: loan_id.into(),
        }),
    ))
}

/// POST /api/loans/{id}/return — settle a loan.
pub async fn return_loan(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReturnRequest>,
) -> Result<StatusCode, ApiError> {
    if id != req.loan_id {
        return Err(LibraryError::invalid("loan_id", "route id and body loan_id mismatch").into());
    }
    state.loans.return_loan(req.loan_id.into(), req.now).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/loans — all active loans.
pub async fn list_active(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<LoanResponse>>, ApiError> {
    let loans = state.loans.list_active().await?;
    Ok(Json(loans.into_iter().map(LoanResponse::from).collect()))
}

/// GET /api/loans/{id}
pub async fn get_by_id(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<LoanResponse>, ApiError> {
    let loan = state
        .loans
        .get(id.into())
        .await?
        .ok_or_else(|| LibraryError::not_found("loan"))?;
    Ok(Json(loan.into()))
}
