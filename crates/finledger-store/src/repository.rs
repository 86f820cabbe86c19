//! Ledger persistence.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use finledger_core::Ledger;
use thiserror::Error;

/// Errors that can occur while loading or saving a ledger.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// IO error reading or writing a file.
    #[error("failed to access {path}: {source}")]
    Io {
        /// The path that failed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The file is not a valid ledger.
    #[error("invalid ledger in {path}: {source}")]
    Json {
        /// The offending file.
        path: PathBuf,
        /// The underlying decode or encode error.
        #[source]
        source: serde_json::Error,
    },
}

/// Durable storage for a [`Ledger`].
pub trait LedgerRepository {
    /// Load the ledger.
    fn load(&self) -> Result<Ledger, RepositoryError>;

    /// Replace the stored ledger.
    fn save(&self, ledger: &Ledger) -> Result<(), RepositoryError>;
}

/// A ledger stored as a single JSON document.
///
/// Saving writes a sibling temporary file and renames it over the target,
/// so readers never see a partially written ledger.
#[derive(Debug, Clone)]
pub struct JsonFileRepository {
    path: PathBuf,
}

impl JsonFileRepository {
    /// A repository backed by the file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> RepositoryError {
        RepositoryError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl LedgerRepository for JsonFileRepository {
    fn load(&self) -> Result<Ledger, RepositoryError> {
        let file = File::open(&self.path).map_err(|e| self.io_error(e))?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| RepositoryError::Json {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, ledger: &Ledger) -> Result<(), RepositoryError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let file = File::create(&tmp).map_err(|e| self.io_error(e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, ledger).map_err(|source| {
            RepositoryError::Json {
                path: tmp.clone(),
                source,
            }
        })?;
        writer
            .flush()
            .and_then(|()| writer.get_ref().sync_all())
            .map_err(|e| self.io_error(e))?;
        drop(writer);

        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;
        tracing::debug!(
            "Saved {} entries to {}",
            ledger.entries.len(),
            self.path.display()
        );
        Ok(())
    }
}
