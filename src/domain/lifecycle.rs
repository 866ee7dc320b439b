use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use super::book::Book;
use super::clock::Clock;
use super::ids::UserId;
use super::loan::Loan;
use crate::error::{LibraryError, Result};

/// Default skew tolerance applied to caller-supplied timestamps.
pub const DEFAULT_TOLERANCE_SECS: i64 = 1;

/// The loan lifecycle engine.
///
/// Pure decision logic: given current entity values it either rejects the
/// operation or produces the post-state as fresh values. It never touches a
/// store and never mutates its arguments; persisting an outcome is entirely
/// the orchestration layer's job.
///
/// Checks run in a fixed order and all of them complete before any output is
/// built, so failures are deterministic and nothing is ever half-applied.
pub struct LoanLifecycle {
    clock: Arc<dyn Clock>,
    tolerance: Duration,
}

impl LoanLifecycle {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_tolerance(clock, Duration::seconds(DEFAULT_TOLERANCE_SECS))
    }

    /// Overrides the skew tolerance. The tolerance absorbs clock drift and
    /// transport latency between the caller's clock and ours.
    pub fn with_tolerance(clock: Arc<dyn Clock>, tolerance: Duration) -> Self {
        Self { clock, tolerance }
    }

    /// Decides a borrow of `book` by `user_id` at the caller-supplied `now`.
    ///
    /// `now` must lie within the tolerance window around our own clock
    /// reading; stale or future-dated client timestamps are rejected. On
    /// success the returned book is flagged unavailable and the returned
    /// loan is the new active record for it.
    pub fn borrow(&self, book: &Book, user_id: UserId, now: DateTime<Utc>) -> Result<(Book, Loan)> {
        if user_id.is_nil() {
            return Err(LibraryError::invalid("user_id", "user id cannot be empty"));
        }
        if now == DateTime::UNIX_EPOCH {
            return Err(LibraryError::invalid("now", "timestamp is unset"));
        }

        let server_now = self.clock.now();
        if now > server_now + self.tolerance {
            return Err(LibraryError::invalid(
                "now",
                "timestamp cannot be in the future",
            ));
        }
        if now < server_now - self.tolerance {
            return Err(LibraryError::invalid(
                "now",
                "timestamp cannot be in the past",
            ));
        }

        if !book.is_available {
            return Err(LibraryError::conflict("book not available"));
        }

        let mut updated = book.clone();
        updated.is_available = false;
        let loan = Loan::new(book.id, user_id, now);
        Ok((updated, loan))
    }

    /// Decides the return of `loan` against `book` at `now`.
    ///
    /// A second return of the same loan is an error, not a no-op. The
    /// availability cross-check defends against a flag that has drifted from
    /// the loan record, and the book-id cross-check prevents settling a loan
    /// against the wrong book. Returns may be arbitrarily late, but never
    /// earlier than the loan's own start (within tolerance).
    pub fn return_loan(&self, book: &Book, loan: &Loan, now: DateTime<Utc>) -> Result<(Book, Loan)> {
        if now == DateTime::UNIX_EPOCH {
            return Err(LibraryError::invalid("now", "timestamp is unset"));
        }
        if now > self.clock.now() + self.tolerance {
            return Err(LibraryError::invalid(
                "now",
                "timestamp cannot be in the future",
            ));
        }
        if loan.return_date.is_some() {
            return Err(LibraryError::conflict("loan already returned"));
        }
        if book.is_available {
            return Err(LibraryError::conflict("book is not on loan"));
        }
        if loan.book_id != book.id {
            return Err(LibraryError::invalid(
                "loan",
                "loan does not belong to this book",
            ));
        }
        if now < loan.loan_date - self.tolerance {
            return Err(LibraryError::invalid(
                "now",
                "timestamp cannot predate the loan",
            ));
        }

        let mut updated_book = book.clone();
        updated_book.is_available = true;
        let mut updated_loan = loan.clone();
        updated_loan.return_date = Some(now);
        Ok((updated_book, updated_loan))
    }
}
