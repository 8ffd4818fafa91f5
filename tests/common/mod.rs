//! In-memory `CopyTransaction` double for driving streams in tests.

use std::collections::VecDeque;

use zero_pgcopy::{CopyTransaction, EncodingGroup, Error, Result};

/// How reads should fail once the preloaded lines run out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadFailure {
    /// Connection-level failure: an IO error.
    Broken,
    /// SQL-level failure reported by the server.
    Sql,
}

#[derive(Debug)]
pub struct MockTransaction {
    pub encoding: EncodingGroup,
    /// Lines served to `read_copy_line`, oldest first.
    pub incoming: VecDeque<Vec<u8>>,
    /// What to do when `incoming` runs dry: end of data, or an error.
    pub read_failure: Option<ReadFailure>,
    /// Commands passed to `exec`.
    pub executed: Vec<String>,
    /// Lines passed to `write_copy_line`.
    pub written: Vec<Vec<u8>>,
    pub copy_ended: bool,
    pub focus: Option<String>,
    pub pending_errors: Vec<String>,
}

impl MockTransaction {
    pub fn new(encoding: EncodingGroup) -> Self {
        Self {
            encoding,
            incoming: VecDeque::new(),
            read_failure: None,
            executed: Vec::new(),
            written: Vec::new(),
            copy_ended: false,
            focus: None,
            pending_errors: Vec::new(),
        }
    }

    pub fn with_lines(lines: &[&[u8]]) -> Self {
        let mut tx = Self::new(EncodingGroup::Utf8);
        tx.incoming = lines.iter().map(|l| l.to_vec()).collect();
        tx
    }
}

impl CopyTransaction for MockTransaction {
    fn exec(&mut self, sql: &str) -> Result<()> {
        self.executed.push(sql.to_string());
        Ok(())
    }

    fn read_copy_line(&mut self, line: &mut Vec<u8>) -> Result<bool> {
        match self.incoming.pop_front() {
            Some(next) => {
                line.clear();
                line.extend_from_slice(&next);
                Ok(true)
            }
            None => match self.read_failure.take() {
                None => Ok(false),
                Some(ReadFailure::Broken) => Err(Error::IoError(std::io::Error::new(
                    std::io::ErrorKind::ConnectionReset,
                    "connection reset by peer",
                ))),
                Some(ReadFailure::Sql) => {
                    Err(Error::ServerError("canceling statement".to_string()))
                }
            },
        }
    }

    fn write_copy_line(&mut self, line: &[u8]) -> Result<()> {
        assert!(!self.copy_ended, "write after end of COPY");
        self.written.push(line.to_vec());
        Ok(())
    }

    fn end_copy_write(&mut self) -> Result<()> {
        self.copy_ended = true;
        Ok(())
    }

    fn encoding_group(&self) -> EncodingGroup {
        self.encoding
    }

    fn register_focus(&mut self, description: &str) -> Result<()> {
        if let Some(current) = &self.focus {
            return Err(Error::BadUsageError(format!(
                "Transaction already has a focus: {current}"
            )));
        }
        self.focus = Some(description.to_string());
        Ok(())
    }

    fn unregister_focus(&mut self) {
        assert!(self.focus.is_some(), "unregister without focus");
        self.focus = None;
    }

    fn register_pending_error(&mut self, message: String) {
        self.pending_errors.push(message);
    }
}
