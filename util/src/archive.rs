//! CSV archiving of records into the session's archive directory.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::session::Session;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
///
/// Headers are taken from the field names of the first serialised record, so
/// records must be flat structs.
pub struct Archiver {
    path: PathBuf,
    writer: Writer<File>,
    num_records: usize,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create archive file {0:?}: {1}")]
    CannotCreate(PathBuf, std::io::Error),

    #[error("Cannot write record {1} to archive {0:?}: {2}")]
    CannotWrite(PathBuf, usize, csv::Error),

    #[error("Cannot flush archive {0:?}: {1}")]
    CannotFlush(PathBuf, std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver from a path relative to the session's archive
    /// root. An existing file is truncated.
    pub fn from_path<P: AsRef<Path>>(session: &Session, path: P) -> Result<Self, ArchiveError> {
        Self::create(session.arch_root.join(path))
    }

    /// Create a new archiver writing to the given absolute path.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        let file = File::create(&path).map_err(|e| ArchiveError::CannotCreate(path.clone(), e))?;

        let writer = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self {
            path,
            writer,
            num_records: 0,
        })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: T) -> Result<(), ArchiveError> {
        self.writer
            .serialize(record)
            .map_err(|e| ArchiveError::CannotWrite(self.path.clone(), self.num_records, e))?;
        self.num_records += 1;

        Ok(())
    }

    /// Serialise every record from the iterator then flush the file.
    pub fn serialise_all<T, I>(&mut self, records: I) -> Result<usize, ArchiveError>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for record in records {
            self.serialise(record)?;
        }

        self.flush()?;

        Ok(self.num_records)
    }

    /// Flush the writer to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.writer
            .flush()
            .map_err(|e| ArchiveError::CannotFlush(self.path.clone(), e))
    }

    /// Number of records written so far
    pub fn num_records(&self) -> usize {
        self.num_records
    }
}
