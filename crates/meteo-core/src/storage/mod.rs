//! CSV sample log
//!
//! Each saved snapshot becomes one line of a plain CSV file that starts with
//! [`CSV_HEADER`]. The backing store sits behind [`DataLog`]; the device keeps
//! it on an SD card, the host station in a regular file and tests in a
//! [`MemoryLog`].

pub mod history;
pub mod record;

use alloc::string::String;
use core::fmt;

use log::{debug, info};
use thiserror_no_std::Error;

use crate::sensors::SensorSnapshot;

pub use history::{HistoryRow, sample_history};
pub use record::RecordWriter;

pub const CSV_HEADER: &str = "Timestamp,Temperature,Humidity,Pressure,Altitude,Light,UV";

/// Line-oriented append-only text store.
pub trait DataLog {
    type Error: fmt::Debug + fmt::Display;

    /// Append `line` followed by a newline.
    fn append_line(&mut self, line: &str) -> Result<(), Self::Error>;

    /// The whole log, lines separated by `\n`.
    fn read_all(&mut self) -> Result<String, Self::Error>;

    fn is_empty(&mut self) -> Result<bool, Self::Error>;
}

impl<T: DataLog + ?Sized> DataLog for &mut T {
    type Error = T::Error;

    fn append_line(&mut self, line: &str) -> Result<(), Self::Error> {
        (**self).append_line(line)
    }

    fn read_all(&mut self) -> Result<String, Self::Error> {
        (**self).read_all()
    }

    fn is_empty(&mut self) -> Result<bool, Self::Error> {
        (**self).is_empty()
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("log is full ({capacity} bytes)")]
    Full { capacity: usize },
}

/// Log kept in RAM, optionally bounded in bytes.
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    contents: String,
    capacity: Option<usize>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            contents: String::new(),
            capacity: Some(capacity),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.contents
    }
}

impl DataLog for MemoryLog {
    type Error = StorageError;

    fn append_line(&mut self, line: &str) -> Result<(), StorageError> {
        if let Some(capacity) = self.capacity {
            if self.contents.len() + line.len() + 1 > capacity {
                return Err(StorageError::Full { capacity });
            }
        }
        self.contents.push_str(line);
        self.contents.push('\n');
        Ok(())
    }

    fn read_all(&mut self) -> Result<String, StorageError> {
        Ok(self.contents.clone())
    }

    fn is_empty(&mut self) -> Result<bool, StorageError> {
        Ok(self.contents.is_empty())
    }
}

/// Failure while appending a sample, either formatting or the store itself.
#[derive(Error, Debug)]
pub enum AppendError<E: fmt::Debug + fmt::Display> {
    #[error("could not format row")]
    Format,
    #[error("log write failed: {0}")]
    Log(E),
}

/// Append one snapshot row, writing the header first into an empty log.
pub fn append_sample<L: DataLog>(
    log: &mut L,
    timestamp: &str,
    snapshot: &SensorSnapshot,
) -> Result<(), AppendError<L::Error>> {
    if log.is_empty().map_err(AppendError::Log)? {
        info!("Creating sample log");
        log.append_line(CSV_HEADER).map_err(AppendError::Log)?;
    }

    let mut row = String::new();
    snapshot
        .write_csv_row(&mut row, timestamp)
        .map_err(|_| AppendError::Format)?;
    log.append_line(&row).map_err(AppendError::Log)?;
    debug!("Saved sample: {}", row);
    Ok(())
}
