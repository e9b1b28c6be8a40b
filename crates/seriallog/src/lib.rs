//! `seriallog` - A serial port data logger
//!
//! This library provides the core functionality for reading line-delimited
//! text records from a serial endpoint and persisting them as rows in a
//! CSV file, one flushed row per accepted line, until the operator stops
//! the session.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod acquisition;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod record;
pub mod serial;
pub mod storage;

pub use acquisition::{LoopExit, Session, SessionStats, StopHandle};
pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
pub use record::Record;
pub use serial::{LineSource, SerialEndpoint};
pub use storage::CsvSink;
