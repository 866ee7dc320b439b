use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use circulate::application::books::{BookDraft, BookService};
use circulate::application::loans::LoanService;
use circulate::application::users::UserService;
use circulate::domain::clock::SystemClock;
use circulate::domain::lifecycle::LoanLifecycle;
use circulate::domain::ports::{
    BookStore, BookStoreRef, LendingStore, LendingStoreRef, LoanStore, LoanStoreRef, UserStore,
    UserStoreRef,
};
use circulate::infrastructure::in_memory::InMemoryLibrary;
use circulate::interfaces::csv::catalog_reader::CatalogReader;
use circulate::interfaces::http::{self, AppState};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Listen port
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// Path to persistent database (optional). If provided, uses RocksDB.
    #[cfg(feature = "storage-rocksdb")]
    #[arg(long)]
    db_path: Option<PathBuf>,

    /// Catalog CSV to load at startup (title,author,isbn,publication_year)
    #[arg(long)]
    seed: Option<PathBuf>,
}

struct Stores {
    books: BookStoreRef,
    loans: LoanStoreRef,
    lending: LendingStoreRef,
    users: UserStoreRef,
}

impl Stores {
    fn from_library<S>(library: S) -> Self
    where
        S: BookStore + LoanStore + LendingStore + UserStore + Clone + 'static,
    {
        Self {
            books: Arc::new(library.clone()),
            loans: Arc::new(library.clone()),
            lending: Arc::new(library.clone()),
            users: Arc::new(library),
        }
    }
}

#[cfg(feature = "storage-rocksdb")]
fn build_stores(cli: &Cli) -> Result<Stores> {
    use circulate::infrastructure::rocksdb::RocksDbLibrary;

    if let Some(db_path) = &cli.db_path {
        let store = RocksDbLibrary::open(db_path).into_diagnostic()?;
        tracing::info!(path = %db_path.display(), "using RocksDB storage");
        return Ok(Stores::from_library(store));
    }
    Ok(Stores::from_library(InMemoryLibrary::new()))
}

#[cfg(not(feature = "storage-rocksdb"))]
fn build_stores(_cli: &Cli) -> Result<Stores> {
    Ok(Stores::from_library(InMemoryLibrary::new()))
}

async fn seed_catalog(books: &BookService, path: &Path) -> Result<()> {
    let file = File::open(path).into_diagnostic()?;
    let mut count = 0usize;
    for record in CatalogReader::new(file).records() {
        let record = record.into_diagnostic()?;
        books
            .create(BookDraft {
                title: record.title,
                author: record.author,
                isbn: record.isbn,
                publication_year: record.publication_year,
            })
            .await
            .into_diagnostic()?;
        count += 1;
    }
    tracing::info!(count, path = %path.display(), "seeded catalog");
    Ok(())
}

/// Waits for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        () = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    let stores = build_stores(&cli)?;

    let clock = Arc::new(SystemClock);
    let lifecycle = LoanLifecycle::new(clock.clone());
    let state = Arc::new(AppState {
        books: BookService::new(stores.books.clone(), stores.loans.clone(), clock.clone()),
        loans: LoanService::new(stores.books, stores.loans, stores.lending, lifecycle),
        users: UserService::new(stores.users, clock),
    });

    if let Some(path) = &cli.seed {
        seed_catalog(&state.books, path).await?;
    }

    let app = http::router(state);

    let addr = format!("{}:{}", cli.host, cli.port);
    tracing::info!(%addr, "starting circulation server");
    let listener = tokio::net::TcpListener::bind(&addr).await.into_diagnostic()?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .into_diagnostic()?;

    tracing::info!("server shut down");
    Ok(())
}
