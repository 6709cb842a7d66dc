use super::TailError;
use std::fs::File;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;

/// Tails an append-only log file by byte offset.
///
/// The offset moves to the end of what was read before the lines are
/// handed out, so a byte range is never delivered twice. Lines that the
/// caller fails to process are not retried.
pub struct OffsetTailReader {
    file_path: PathBuf,
    offset: u64,
}

impl OffsetTailReader {
    /// Create a reader positioned at the start of the file
    pub fn new(file_path: PathBuf) -> Self {
        OffsetTailReader {
            file_path,
            offset: 0,
        }
    }

    /// Return the lines appended since the previous poll.
    ///
    /// A missing file or an I/O failure yields no lines; the failure is
    /// logged and the offset is left where it was.
    pub fn poll(&mut self) -> Vec<String> {
        match self.read_new_lines() {
            Ok(lines) => lines,
            Err(e) => {
                log::error!("Log read error on {:?}: {}", self.file_path, e);
                Vec::new()
            }
        }
    }

    fn read_new_lines(&mut self) -> Result<Vec<String>, TailError> {
        let mut file = match File::open(&self.file_path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let size = file.metadata()?.len();
        if size < self.offset {
            log::warn!(
                "Log {:?} shrank from {} to {} bytes, rereading from start",
                self.file_path,
                self.offset,
                size
            );
            self.offset = 0;
        }
        if size == self.offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(self.offset))?;
        let mut buf = Vec::with_capacity((size - self.offset) as usize);
        let bytes_read = file.read_to_end(&mut buf)?;
        self.offset += bytes_read as u64;

        Ok(String::from_utf8_lossy(&buf)
            .lines()
            .map(str::to_string)
            .collect())
    }

    /// Bytes consumed so far
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Forget the read position; the next poll starts from byte 0
    pub fn reset(&mut self) {
        self.offset = 0;
    }
}
