use std::io::Read;

use serde::Deserialize;

use crate::error::{LibraryError, Result};

/// One row of a catalog seed file.
#[derive(Debug, Deserialize)]
pub struct CatalogRecord {
    pub title: String,
    pub author: String,
    pub isbn: String,
    pub publication_year: i32,
}

/// Reads catalog seed rows from a CSV source.
///
/// Wraps `csv::Reader` with whitespace trimming and flexible record lengths,
/// yielding rows lazily so large seed files stream instead of loading whole.
pub struct CatalogReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> CatalogReader<R> {
    /// Creates a reader over any `Read` source (e.g. File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    pub fn records(self) -> impl Iterator<Item = Result<CatalogRecord>> {
        self.reader
            .into_deserialize()
            .map(|result| result.map_err(LibraryError::from))
    }
}
