use std::sync::Arc;

use async_trait::async_trait;

use super::book::Book;
use super::ids::{BookId, LoanId, UserId};
use super::loan::Loan;
use super::user::User;
use crate::error::Result;

/// Catalog listing filters. `author` matches as a case-insensitive
/// substring.
#[derive(Debug, Clone, Default)]
pub struct BookFilter {
    pub available: Option<bool>,
    pub author: Option<String>,
}

#[async_trait]
pub trait BookStore: Send + Sync {
    async fn get(&self, id: BookId) -> Result<Option<Book>>;
    async fn add(&self, book: Book) -> Result<BookId>;
    async fn update(&self, book: Book) -> Result<()>;
    async fn delete(&self, id: BookId) -> Result<()>;
    async fn list(&self, filter: BookFilter) -> Result<Vec<Book>>;
}

#[async_trait]
pub trait LoanStore: Send + Sync {
    async fn get(&self, id: LoanId) -> Result<Option<Loan>>;
    async fn list_active(&self) -> Result<Vec<Loan>>;
    async fn has_active_loan_for_book(&self, book_id: BookId) -> Result<bool>;
}

/// Atomic persistence of one lifecycle decision.
///
/// The updated book and its created/updated loan land together or not at
/// all. Implementations re-validate the stored pre-state under their own
/// serialization, so the write, not the earlier read, arbitrates between
/// concurrent callers: the first valid commit wins and the loser receives
/// the conflict that now applies.
#[async_trait]
pub trait LendingStore: Send + Sync {
    async fn commit(&self, book: &Book, loan: &Loan) -> Result<()>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, id: UserId) -> Result<Option<User>>;
    /// Lookup by normalized email.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>>;
    async fn add(&self, user: User) -> Result<UserId>;
    async fn list(&self) -> Result<Vec<User>>;
}

pub type BookStoreRef = Arc<dyn BookStore>;
pub type LoanStoreRef = Arc<dyn LoanStore>;
pub type LendingStoreRef = Arc<dyn LendingStore>;
pub type UserStoreRef = Arc<dyn UserStore>;
