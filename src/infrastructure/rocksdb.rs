use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options, WriteBatch};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::book::Book;
use crate::domain::ids::{BookId, LoanId, UserId};
use crate::domain::loan::Loan;
use crate::domain::ports::{BookFilter, BookStore, LendingStore, LoanStore, UserStore};
use crate::domain::user::User;
use crate::error::{LibraryError, Result};

/// Column family for book records.
pub const CF_BOOKS: &str = "books";
/// Column family for loan history.
pub const CF_LOANS: &str = "loans";
/// Column family for registered users.
pub const CF_USERS: &str = "users";

/// A persistent store over RocksDB column families, one per entity, with
/// JSON values keyed by the entity's UUID bytes.
///
/// `commit` serializes through a mutex and lands the book/loan pair in a
/// single `WriteBatch`, so a lifecycle decision is applied in full or not at
/// all. `Clone` shares the underlying `Arc<DB>`.
#[derive(Clone)]
pub struct RocksDbLibrary {
    db: Arc<DB>,
    commit_lock: Arc<Mutex<()>>,
}

impl RocksDbLibrary {
    /// Opens or creates a RocksDB instance at `path`, ensuring the required
    /// column families exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cfs = [CF_BOOKS, CF_LOANS, CF_USERS]
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()));
        let db = DB::open_cf_descriptors(&opts, path, cfs)?;

        Ok(Self {
            db: Arc::new(db),
            commit_lock: Arc::new(Mutex::new(())),
        })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily> {
        self.db.cf_handle(name).ok_or_else(|| {
            LibraryError::Storage(Box::new(std::io::Error::other(format!(
                "{name} column family not found"
            ))))
        })
    }

    fn read<T: DeserializeOwned>(&self, cf_name: &str, key: Uuid) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        match self.db.get_cf(cf, key.as_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn write<T: Serialize>(&self, cf_name: &str, key: Uuid, value: &T) -> Result<()> {
        let cf = self.cf(cf_name)?;
        self.db.put_cf(cf, key.as_bytes(), serde_json::to_vec(value)?)?;
        Ok(())
    }

    fn scan<T: DeserializeOwned>(&self, cf_name: &str) -> Result<Vec<T>> {
        let cf = self.cf(cf_name)?;
        let mut records = Vec::new();
        for item in self.db.iterator_cf(cf, rocksdb::IteratorMode::Start) {
            let (_key, value) = item?;
            records.push(serde_json::from_slice(&value)?);
        }
        Ok(records)
    }
}

#[async_trait]
impl BookStore for RocksDbLibrary {
    async fn get(&self, id: BookId) -> Result<Option<Book>> {
        self.read(CF_BOOKS, id.as_uuid())
    }

    async fn add(&self, book: Book) -> Result<BookId> {
        let id = book.id;
        self.write(CF_BOOKS, id.as_uuid(), &book)?;
        Ok(id)
    }

    async fn update(&self, book: Book) -> Result<()> {
        if self.read::<Book>(CF_BOOKS, book.id.as_uuid())?.is_none() {
            return Err(LibraryError::not_found("book"));
        }
        self.write(CF_BOOKS, book.id.as_uuid(), &book)
    }

    async fn delete(&self, id: BookId) -> Result<()> {
        let cf = self.cf(CF_BOOKS)?;
        self.db.delete_cf(cf, id.as_uuid().as_bytes())?;
        Ok(())
    }

    async fn list(&self, filter: BookFilter) -> Result<Vec<Book>> {
        let author = filter.author.as_deref().map(str::to_lowercase);
        let books = self
            .scan::<Book>(CF_BOOKS)?
            .into_iter()
            .filter(|b| filter.available.is_none_or(|wanted| b.is_available == wanted))
            .filter(|b| {
                author
                    .as_deref()
                    .is_none_or(|a| b.author.to_lowercase().contains(a))
            })
            .collect();
        Ok(books)
    }
}

#[async_trait]
impl LoanStore for RocksDbLibrary {
    async fn get(&self, id: LoanId) -> Result<Option<Loan>> {
        self.read(CF_LOANS, id.as_uuid())
    }

    async fn list_active(&self) -> Result<Vec<Loan>> {
        Ok(self
            .scan::<Loan>(CF_LOANS)?
            .into_iter()
            .filter(Loan::is_active)
            .collect())
    }

    async fn has_active_loan_for_book(&self, book_id: BookId) -> Result<bool> {
        Ok(self
            .scan::<Loan>(CF_LOANS)?
            .iter()
            .any(|l| l.book_id == book_id && l.is_active()))
    }
}

#[async_trait]
impl LendingStore for RocksDbLibrary {
    async fn commit(&self, book: &Book, loan: &Loan) -> Result<()> {
        let _guard = self.commit_lock.lock().await;

        let stored_book = self
            .read::<Book>(CF_BOOKS, book.id.as_uuid())?
            .ok_or_else(|| LibraryError::not_found("book"))?;

        if loan.is_active() {
            if !stored_book.is_available {
                return Err(LibraryError::conflict("book not available"));
            }
        } else {
            match self.read::<Loan>(CF_LOANS, loan.id.as_uuid())? {
                Some(stored) if !stored.is_active() => {
                    return Err(LibraryError::conflict("loan already returned"));
                }
                Some(_) => {}
                None => return Err(LibraryError::not_found("loan")),
            }
        }

        let mut batch = WriteBatch::default();
        batch.put_cf(
            self.cf(CF_BOOKS)?,
            book.id.as_uuid().as_bytes(),
            serde_json::to_vec(book)?,
        );
        batch.put_cf(
            self.cf(CF_LOANS)?,
            loan.id.as_uuid().as_bytes(),
            serde_json::to_vec(loan)?,
        );
        self.db.write(batch)?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for RocksDbLibrary {
    async fn get(&self, id: UserId) -> Result<Option<User>> {
        self.read(CF_USERS, id.as_uuid())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(self
            .scan::<User>(CF_USERS)?
            .into_iter()
            .find(|u| u.email == email))
    }

    async fn add(&self, user: User) -> Result<UserId> {
        let id = user.id;
        self.write(CF_USERS, id.as_uuid(), &user)?;
        Ok(id)
    }

    async fn list(&self) -> Result<Vec<User>> {
        self.scan(CF_USERS)
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    use super::*;

    fn book() -> Book {
        Book::new("Dune", "Frank Herbert", "978-0441013593", 1965)
    }

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 12, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn open_creates_column_families() {
        let dir = tempdir().unwrap();
        let store = RocksDbLibrary::open(dir.path()).expect("failed to open RocksDB");

        assert!(store.db.cf_handle(CF_BOOKS).is_some());
        assert!(store.db.cf_handle(CF_LOANS).is_some());
        assert!(store.db.cf_handle(CF_USERS).is_some());
    }

    #[tokio::test]
    async fn book_round_trip_and_filtered_list() {
        let dir = tempdir().unwrap();
        let store = RocksDbLibrary::open(dir.path()).unwrap();

        let book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();
        assert_eq!(BookStore::get(&store, id).await.unwrap(), Some(book));

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
        assert_eq!(available[0].author, "Frank Herbert");
    }

    #[tokio::test]
    async fn commit_lands_both_records_atomically() {
        let dir = tempdir().unwrap();
        let store = RocksDbLibrary::open(dir.path()).unwrap();

        let mut book = book();
        let id = BookStore::add(&store, book.clone()).await.unwrap();

        book.is_available = false;
        let loan = Loan::new(id, UserId::new(), now());
        store.commit(&book, &loan).await.unwrap();

        assert!(!BookStore::get(&store, id).await.unwrap().unwrap().is_available);
        assert!(store.has_active_loan_for_book(id).await.unwrap());

        // Stale borrow decision loses against the stored state.
        let second = Loan::new(id, UserId::new(), now());
        let err = store.commit(&book, &second).await.unwrap_err();
        assert!(matches!(err, LibraryError::Conflict(_)));
    }

    #[tokio::test]
    async fn state_survives_reopen() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("library_db");

        let id = {
            let store = RocksDbLibrary::open(&db_path).unwrap();
            let mut book = book();
            let id = BookStore::add(&store, book.clone()).await.unwrap();
            book.is_available = false;
            store
                .commit(&book, &Loan::new(id, UserId::new(), now()))
                .await
                .unwrap();
            id
        };

        let store = RocksDbLibrary::open(&db_path).unwrap();
        let book = BookStore::get(&store, id).await.unwrap().unwrap();
        assert!(!book.is_available);
        assert_eq!(store.list_active().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn user_round_trip_by_email() {
        let dir = tempdir().unwrap();
        let store = RocksDbLibrary::open(dir.path()).unwrap();

        let user = User {
            id: UserId::new(),
            name: "Ada Lovelace".into(),
            email: "ada@example.com".into(),
            registered_at: now(),
        };
        UserStore::add(&store, user.clone()).await.unwrap();

        assert_eq!(store.get_by_email("ada@example.com").await.unwrap(), Some(user));
        assert!(store.get_by_email("none@example.com").await.unwrap().is_none());
    }
}
