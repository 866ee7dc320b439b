use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{BookId, LoanId, UserId};

/// A lending record.
///
/// Active while `return_date` is unset. Loans reference their book and user
/// by id, are created only by the lifecycle engine, and are never deleted:
/// the loan history is append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub book_id: BookId,
    pub user_id: UserId,
    pub loan_date: DateTime<Utc>,
    pub return_date: Option<DateTime<Utc>>,
}

impl Loan {
    pub fn new(book_id: BookId, user_id: UserId, loan_date: DateTime<Utc>) -> Self {
        Self {
            id: LoanId::new(),
            book_id,
            user_id,
            loan_date,
            return_date: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.return_date.is_none()
    }
}
