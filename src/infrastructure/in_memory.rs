use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::book::Book;
use crate::domain::ids::{BookId, LoanId, UserId};
use crate::domain::loan::Loan;
use crate::domain::ports::{BookFilter, BookStore, LendingStore, LoanStore, UserStore};
use crate::domain::user::User;
use crate::error::{LibraryError, Result};

#[derive(Default)]
struct State {
    books: HashMap<BookId, Book>,
    loans: HashMap<LoanId, Loan>,
    users: HashMap<UserId, User>,
}

/// A thread-safe in-memory store backing all four ports.
///
/// One `RwLock` guards the whole state, so `commit` validates and writes
/// under a single write lock: concurrent lifecycle decisions serialize here
/// instead of racing between read and write. `Clone` shares the state.
///
/// Ideal for tests and small deployments where persistence is not required.
#[derive(Default, Clone)]
pub struct InMemoryLibrary {
    state: Arc<RwLock<State>>,
}

impl InMemoryLibrary {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BookStore for InMemoryLibrary {
    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        let state = self.state.read().await;
        Ok(state.books.get(&id).cloned())
    }

    async fn add(&self, book: Book) -> Result<BookId> {
        let mut state = self.state.write().await;
        let id = book.id;
        state.books.insert(id, book);
        Ok(id)
    }

    async fn update(&self, book: Book) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.books.contains_key(&book.id) {
            return Err(LibraryError::not_found("book"));
        }
        state.books.insert(book.id, book);
        Ok(())
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        let mut state = self.state.write().await;
        state.books.remove(&id);
        Ok(())
    }

    async fn list(&self, filter: BookFilter) -> Result<Vec<Book>> {
        let state = self.state.read().await;
        let author = filter.author.as_deref().map(str::to_lowercase);
        Ok(state
            .books
            .values()
            .filter(|b| filter.available.is_none_or(|wanted| b.is_available == wanted))
            .filter(|b| {
                author
                    .as_deref()
                    .is_none_or(|a| b.author.to_lowercase().contains(a))
            })
            .cloned()
            .collect())
    }
}

#[async_trait]
impl LoanStore for InMemoryLibrary {
    async fn get(&self, id: LoanId) -> Result<Option<Loan>> {
        let state = self.state.read().await;
        Ok(state.loans.get(&id).cloned())
    }

    async fn list_active(&self) -> Result<Vec<Loan>> {
        let state = self.state.read().await;
        Ok(state
            .loans
            .values()
            .filter(|l| l.is_active())
            .cloned()
            .collect())
    }

    async fn has_active_loan_for_book(&self, book_id: BookId) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .loans
            .values()
            .any(|l| l.book_id == book_id && l.is_active()))
    }
}

#[async_trait]
impl LendingStore for InMemoryLibrary {
    async fn commit(&self, book: &Book, loan: &Loan) -> Result<()> {
        let mut state = self.state.write().await;

        let stored_book = state
            .books
            .get(&book.id)
            .ok_or_else(|| LibraryError::not_found("book"))?;

        if loan.is_active() {
            // Borrow: the book must still be available. The winner of two
            // concurrent decisions is whoever takes this lock first.
            if !stored_book.is_available {
                return Err(LibraryError::conflict("book not available"));
            }
        } else {
            // Return: the stored loan must still be open.
            match state.loans.get(&loan.id) {
                Some(stored) if !stored.is_active() => {
                    return Err(LibraryError::conflict("loan already returned"));
                }
                Some(_) => {}
                None => return Err(LibraryError::not_found("loan")),
            }
        }

        state.books.insert(book.id, book.clone());
        state.loans.insert(loan.id, loan.clone());
        Ok(())
    }
}

#[async_trait]
impl UserStore for InMemoryLibrary {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.get(&id).cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn add(&self, user: User) -> Result<UserId> {
        let mut state = self.state.write().await;
        let id = user.id;
        state.users.insert(id, user);
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;

    fn book() -> Book {
        Book::new("Dune", "Frank Herbert", "978-0441013593", 1965)
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn book_store_round_trip() {
        let store = InMemoryLibrary::new();
        let book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();

        assert_eq!(BookStore::get(&store, id).await.unwrap(), Some(book));
        assert!(BookStore::get(&store, BookId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_of_missing_book_is_not_found() {
        let store = InMemoryLibrary::new();
        let err = store.update(book()).await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { entity: "book" }));
    }

    #[tokio::test]
    async fn list_applies_both_filters() {
        let store = InMemoryLibrary::new();
        BookStore::add(&store, book()).await.unwrap();
        let mut borrowed = Book::new("Emma", "Jane Austen", "978-0141439587", 1815);
        borrowed.is_available = false;
        BookStore::add(&store, borrowed).await.unwrap();

        let available = BookStore::list(
            &store,
            BookFilter {
                available: Some(true),
                author: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(available.len(), 1);

        let austen = BookStore::list(
            &store,
            BookFilter {
                available: None,
                author: Some("AUSTEN".into()),
            },
        )
        .await
        .unwrap();
        assert_eq!(austen.len(), 1);
        assert_eq!(austen[0].author, "Jane Austen");
    }

    #[tokio::test]
    async fn commit_lands_book_and_loan_together() {
        let store = InMemoryLibrary::new();
        let mut book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();

        book.is_available = false;
        let loan = Loan::new(id, UserId::new(), now());
        store.commit(&book, &loan).await.unwrap();

        assert!(!BookStore::get(&store, id).await.unwrap().unwrap().is_available);
        assert!(LoanStore::get(&store, loan.id).await.unwrap().is_some());
        assert!(store.has_active_loan_for_book(id).await.unwrap());
    }

    #[tokio::test]
    async fn commit_rejects_borrow_of_book_taken_meanwhile() {
        let store = InMemoryLibrary::new();
        let mut book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();

        book.is_available = false;
        let first = Loan::new(id, UserId::new(), now());
        store.commit(&book, &first).await.unwrap();

        // A second decision made against the stale available snapshot.
        let second = Loan::new(id, UserId::new(), now());
        let err = store.commit(&book, &second).await.unwrap_err();
        assert!(matches!(err, LibraryError::Conflict(_)));

        let active = store.list_active().await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, first.id);
    }

    #[tokio::test]
    async fn commit_rejects_return_of_loan_settled_meanwhile() {
        let store = InMemoryLibrary::new();
        let mut book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();

        book.is_available = false;
        let open = Loan::new(id, UserId::new(), now());
        store.commit(&book, &open).await.unwrap();

        let mut settled = open.clone();
        settled.return_date = Some(now());
        book.is_available = true;
        store.commit(&book, &settled).await.unwrap();

        // The same settlement decided against the stale open snapshot.
        let err = store.commit(&book, &settled).await.unwrap_err();
        match err {
            LibraryError::Conflict(msg) => assert!(msg.contains("already returned")),
            other => panic!("expected Conflict, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn active_loans_exclude_settled_ones() {
        let store = InMemoryLibrary::new();
        let mut book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();

        book.is_available = false;
        let loan = Loan::new(id, UserId::new(), now());
        store.commit(&book, &loan).await.unwrap();
        assert_eq!(store.list_active().await.unwrap().len(), 1);

        let mut settled = loan.clone();
        settled.return_date = Some(now());
        book.is_available = true;
        store.commit(&book, &settled).await.unwrap();

        assert!(store.list_active().await.unwrap().is_empty());
        assert!(!store.has_active_loan_for_book(id).await.unwrap());
        // History is kept, not deleted.
        assert!(LoanStore::get(&store, loan.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn user_lookup_by_normalized_email() {
        let store = InMemoryLibrary::new();
        let user = User {
            id: UserId::new(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            registered_at: now(),
        };
        UserStore::add(&store, user.clone()).await.unwrap();

        let found = store.get_by_email("ada@example.com").await.unwrap();
        assert_eq!(found, Some(user));
        assert!(store.get_by_email("none@example.com").await.unwrap().is_none());
    }
}
