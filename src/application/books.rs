use std::sync::Arc;

use chrono::Datelike;

use crate::domain::book::Book;
use crate::domain::clock::Clock;
use crate::domain::ids::BookId;
use crate::domain::ports::{BookFilter, BookStoreRef, LoanStoreRef};
use crate::error::{LibraryError, Result};

/// Movable type puts a floor under plausible publication years.
const FIRST_PRINTED_YEAR: i32 = 1450;

/// Catalog input for create and update, validated before it touches a store.
#[derive(Debug, Clone)]
pub struct BookDraft {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
}

/// Manages the book catalog.
///
/// Deletion consults loan state: a book with an active loan cannot be
/// removed, which enforces the availability invariant from the deletion
/// side.
pub struct BookService {
    books: BookStoreRef,
    loans: LoanStoreRef,
    clock: Arc<dyn Clock>,
}

impl BookService {
    pub fn new(books: BookStoreRef, loans: LoanStoreRef, clock: Arc<dyn Clock>) -> Self {
        Self {
            books,
            loans,
            clock,
        }
    }

    pub async fn create(&self, draft: BookDraft) -> Result<BookId> {
        let draft = self.validate(draft)?;
        let book = Book::new(
            draft.title,
            draft.author,
            draft.isbn,
            draft.publication_year,
        );
        self.books.add(book).await
    }

    /// Rewrites the descriptive fields of an existing book. The availability
    /// flag is owned by the lifecycle engine and stays untouched.
    pub async fn update(&self, id: BookId, draft: BookDraft) -> Result<()> {
        let draft = self.validate(draft)?;
        let mut book = self
            .books
            .get(id)
            .await?
            .ok_or_else(|| LibraryError::not_found("book"))?;

        book.title = draft.title;
        book.author = draft.author;
        book.isbn = draft.isbn;
        book.publication_year = draft.publication_year;
        self.books.update(book).await
    }

    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: BookId) -> Result<()> {
        let book = self
            .books
            .get(id)
            .await?
            .ok_or_else(|| LibraryError::not_found("book"))?;

        if self.loans.has_active_loan_for_book(book.id).await? {
            return Err(LibraryError::conflict(
                "cannot delete a book that is currently on loan",
            ));
        }

        self.books.delete(id).await
    }

    pub async fn list(&self, filter: BookFilter) -> Result<Vec<Book>> {
        self.books.list(filter).await
    }

    pub async fn get(&self, id: BookId) -> Result<Option<Book>> {
        self.books.get(id).await
    }

    fn validate(&self, draft: BookDraft) -> Result<BookDraft> {
        let title = draft.title.trim();
        if title.is_empty() {
            return Err(LibraryError::invalid("title", "title is required"));
        }
        let author = draft.author.trim();
        if author.is_empty() {
            return Err(LibraryError::invalid("author", "author is required"));
        }
        let isbn = draft.isbn.trim();
        if isbn.is_empty() {
            return Err(LibraryError::invalid("isbn", "isbn is required"));
        }
        let current_year = self.clock.now().year();
        if !(FIRST_PRINTED_YEAR..=current_year).contains(&draft.publication_year) {
            return Err(LibraryError::invalid(
                "publication_year",
                "publication year is out of range",
            ));
        }

        Ok(BookDraft {
            title: title.to_string(),
            author: author.to_string(),
            isbn: isbn.to_string(),
            publication_year: draft.publication_year,
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::domain::clock::FixedClock;
    use crate::domain::ids::UserId;
    use crate::domain::lifecycle::LoanLifecycle;
    use crate::domain::ports::{LendingStore, LoanStore};
    use crate::infrastructure::in_memory::InMemoryLibrary;

    fn service() -> (BookService, InMemoryLibrary) {
        let library = InMemoryLibrary::new();
        let clock = Arc::new(FixedClock(Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap()));
        let service = BookService::new(
            Arc::new(library.clone()),
            Arc::new(library.clone()),
            clock,
        );
        (service, library)
    }

    fn draft() -> BookDraft {
        BookDraft {
            title: "The Left Hand of Darkness".into(),
            author: "Ursula K. Le Guin".into(),
            isbn: "978-0441478125".into(),
            publication_year: 1969,
        }
    }

    #[tokio::test]
    async fn create_trims_and_stores_an_available_book() {
        let (service, _) = service();
        let id = service
            .create(BookDraft {
                title: "  Dune  ".into(),
                ..draft()
            })
            .await
            .unwrap();

        let book = service.get(id).await.unwrap().unwrap();
        assert_eq!(book.title, "Dune");
        assert!(book.is_available);
    }

    #[tokio::test]
    async fn create_rejects_blank_fields() {
        let (service, _) = service();

        let err = service
            .create(BookDraft {
                title: "   ".into(),
                ..draft()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LibraryError::InvalidArgument { field: "title", .. }
        ));

        let err = service
            .create(BookDraft {
                author: String::new(),
                ..draft()
            })
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LibraryError::InvalidArgument { field: "author", .. }
        ));
    }

    #[tokio::test]
    async fn create_rejects_out_of_range_year() {
        let (service, _) = service();

        for year in [1449, 2025] {
            let err = service
                .create(BookDraft {
                    publication_year: year,
                    ..draft()
                })
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                LibraryError::InvalidArgument {
                    field: "publication_year",
                    ..
                }
            ));
        }
    }

    #[tokio::test]
    async fn update_rewrites_descriptive_fields_only() {
        let (service, _) = service();
        let id = service.create(draft()).await.unwrap();

        service
            .update(
                id,
                BookDraft {
                    title: "The Dispossessed".into(),
                    ..draft()
                },
            )
            .await
            .unwrap();

        let book = service.get(id).await.unwrap().unwrap();
        assert_eq!(book.title, "The Dispossessed");
        assert!(book.is_available);
    }

    #[tokio::test]
    async fn update_of_unknown_book_is_not_found() {
        let (service, _) = service();
        let err = service.update(BookId::new(), draft()).await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { entity: "book" }));
    }

    #[tokio::test]
    async fn delete_succeeds_without_active_loan() {
        let (service, _) = service();
        let id = service.create(draft()).await.unwrap();

        service.delete(id).await.unwrap();
        assert!(service.get(id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_is_blocked_by_active_loan() {
        let (service, library) = service();
        let id = service.create(draft()).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        let lifecycle = LoanLifecycle::new(Arc::new(FixedClock(now)));
        let book = service.get(id).await.unwrap().unwrap();
        let (book, loan) = lifecycle.borrow(&book, UserId::new(), now).unwrap();
        library.commit(&book, &loan).await.unwrap();

        let err = service.delete(id).await.unwrap_err();
        assert!(matches!(err, LibraryError::Conflict(_)));

        // Both records are untouched by the failed deletion.
        assert!(service.get(id).await.unwrap().is_some());
        assert!(library.has_active_loan_for_book(id).await.unwrap());
    }

    #[tokio::test]
    async fn delete_of_unknown_book_is_not_found() {
        let (service, _) = service();
        let err = service.delete(BookId::new()).await.unwrap_err();
        assert!(matches!(err, LibraryError::NotFound { entity: "book" }));
    }

    #[tokio::test]
    async fn list_filters_by_availability_and_author_substring() {
        let (service, library) = service();
        let le_guin = service.create(draft()).await.unwrap();
        service
            .create(BookDraft {
                title: "Dune".into(),
                author: "Frank Herbert".into(),
                isbn: "978-0441013593".into(),
                publication_year: 1965,
            })
            .await
            .unwrap();

        let now = Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap();
        let lifecycle = LoanLifecycle::new(Arc::new(FixedClock(now)));
        let book = service.get(le_guin).await.unwrap().unwrap();
        let (book, loan) = lifecycle.borrow(&book, UserId::new(), now).unwrap();
        library.commit(&book, &loan).await.unwrap();

        let available = service
            .list(BookFilter {
                available: Some(true),
                author: None,
            })
            .await
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].author, "Frank Herbert");

        // Substring match is case-insensitive.
        let by_author = service
            .list(BookFilter {
                available: None,
                author: Some("le guin".into()),
            })
            .await
            .unwrap();
        assert_eq!(by_author.len(), 1);
        assert_eq!(by_author[0].id, le_guin);
    }
}
