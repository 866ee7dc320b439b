use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::ids::{BookId, LoanId, UserId};
use crate::domain::lifecycle::LoanLifecycle;
use crate::domain::loan::Loan;
use crate::domain::ports::{BookStoreRef, LendingStoreRef, LoanStoreRef};
use crate::error::{LibraryError, Result};

const DEFAULT_STORE_DEADLINE: Duration = Duration::from_secs(5);

/// Orchestrates the loan lifecycle: store reads, engine decision, one atomic
/// commit.
///
/// No write is issued before a decision is complete, and the single commit
/// applies a decision in full or not at all: there is no window in which the
/// book is written but its loan is not. Store calls are bounded by a
/// deadline; a timeout surfaces as a transient `Storage` failure, distinct
/// from the validation classes.
pub struct LoanService {
    books: BookStoreRef,
    loans: LoanStoreRef,
    lending: LendingStoreRef,
    lifecycle: LoanLifecycle,
    store_deadline: Duration,
}

impl LoanService {
    pub fn new(
        books: BookStoreRef,
        loans: LoanStoreRef,
        lending: LendingStoreRef,
        lifecycle: LoanLifecycle,
    ) -> Self {
        Self {
            books,
            loans,
            lending,
            lifecycle,
            store_deadline: DEFAULT_STORE_DEADLINE,
        }
    }

    pub fn with_store_deadline(mut self, deadline: Duration) -> Self {
        self.store_deadline = deadline;
        self
    }

    /// Borrows `book_id` for `user_id`, returning the new loan's id.
    #[tracing::instrument(skip(self))]
    pub async fn borrow(
        &self,
        user_id: UserId,
        book_id: BookId,
        now: DateTime<Utc>,
    ) -> Result<LoanId> {
        let book = self
            .bounded(self.books.get(book_id))
            .await?
            .ok_or_else(|| LibraryError::not_found("book"))?;

        let (book, loan) = self.lifecycle.borrow(&book, user_id, now)?;
        let loan_id = loan.id;
        self.bounded(self.lending.commit(&book, &loan)).await?;

        tracing::info!(%loan_id, "book borrowed");
        Ok(loan_id)
    }

    /// Settles the loan `loan_id` at `now`.
    #[tracing::instrument(skip(self))]
    pub async fn return_loan(&self, loan_id: LoanId, now: DateTime<Utc>) -> Result<()> {
        let loan = self
            .bounded(self.loans.get(loan_id))
            .await?
            .ok_or_else(|| LibraryError::not_found("loan"))?;

        // A loan pointing at a missing book means the stores disagree.
        let book = self
            .bounded(self.books.get(loan.book_id))
            .await?
            .ok_or_else(|| LibraryError::not_found("book"))?;

        let (book, loan) = self.lifecycle.return_loan(&book, &loan, now)?;
        self.bounded(self.lending.commit(&book, &loan)).await?;

        tracing::info!(%loan_id, "book returned");
        Ok(())
    }

    pub async fn list_active(&self) -> Result<Vec<Loan>> {
        self.bounded(self.loans.list_active()).await
    }

    pub async fn get(&self, id: LoanId) -> Result<Option<Loan>> {
        self.bounded(self.loans.get(id)).await
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T>>) -> Result<T> {
        match tokio::time::timeout(self.store_deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(LibraryError::Storage(Box::new(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "store call exceeded deadline",
            )))),
        }
    }
}
