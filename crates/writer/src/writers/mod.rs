//! Reference writer implementations
//!
//! Contains LogWriter and FileWriter.

mod file;
mod log;

pub use self::file::{FileWriter, FileWriterConfig};
pub use self::log::LogWriter;
