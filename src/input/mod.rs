pub mod event_parser;
pub mod file_tailer;
pub mod simulator;

pub use event_parser::{EventParser, ParseError};
pub use file_tailer::OffsetTailReader;
pub use simulator::LogSimulator;

use thiserror::Error;

/// I/O failures while reading or writing the input stream
#[derive(Error, Debug)]
pub enum TailError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
