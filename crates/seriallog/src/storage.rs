//! Storage layer for seriallog.
//!
//! This module provides the CSV output sink: a freshly created
//! (truncated) file that receives one header row at startup and one row
//! per accepted record, flushed to the underlying file after every row so
//! nothing is buffered across loop iterations.

use std::fs::File;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::record::Record;

/// Append-only CSV sink for accepted records.
///
/// Created once per session; any pre-existing file at the path is
/// truncated. The header row is written during creation, so a sink that
/// exists always holds a well-formed file. Dropping the sink flushes and
/// closes the file.
pub struct CsvSink {
    path: PathBuf,
    writer: csv::Writer<File>,
    rows_written: u64,
}

impl std::fmt::Debug for CsvSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CsvSink")
            .field("path", &self.path)
            .field("rows_written", &self.rows_written)
            .finish_non_exhaustive()
    }
}

impl CsvSink {
    /// Create (truncating) the output file and write the header row.
    ///
    /// # Errors
    ///
    /// Returns [`Error::OutputCreate`] if the file cannot be created, or
    /// a write error if the header cannot be written.
    pub fn create(path: impl AsRef<Path>, header: &[String], delimiter: u8) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        debug!("creating output file {}", path.display());
        let file = File::create(&path).map_err(|source| Error::OutputCreate {
            path: path.clone(),
            source,
        })?;

        let mut writer = csv::WriterBuilder::new()
            .delimiter(delimiter)
            .from_writer(file);
        writer.write_record(header)?;
        writer.flush()?;

        info!("output file {} created, header written", path.display());
        Ok(Self {
            path,
            writer,
            rows_written: 0,
        })
    }

    /// Append one record as a row and flush it to the file.
    ///
    /// The flush happens before this method returns, so an accepted row
    /// is durable before the next line is read.
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written or flushed.
    pub fn append(&mut self, record: &Record) -> Result<()> {
        self.writer.write_record(record.fields())?;
        self.writer.flush()?;
        self.rows_written += 1;
        Ok(())
    }

    /// The path of the output file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The number of data rows written so far (excluding the header).
    #[must_use]
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }
}
