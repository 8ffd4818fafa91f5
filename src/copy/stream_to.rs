//! Stream data into a table with `COPY ... FROM STDIN`.

use crate::encoding::GlyphScanner;
use crate::error::Result;
use crate::row::ToCopyRow;
use crate::transaction::{CopyTransaction, quote_columns, quote_name};

use super::StreamFrom;

/// A bulk writer for one table.
///
/// Inserting large numbers of rows as individual `INSERT` statements pays
/// per-statement overhead, especially over a network. Writing them through
/// a COPY stream is often orders of magnitude faster.
///
/// Feed rows with [`write_row`], then call [`complete`] to send the COPY
/// terminator and check for errors. The stream *must* be completed before
/// the transaction can commit; dropping an unfinished stream completes it
/// best-effort and records any failure as a pending error on the
/// transaction.
///
/// [`write_row`]: StreamTo::write_row
/// [`complete`]: StreamTo::complete
#[derive(Debug)]
pub struct StreamTo<T: CopyTransaction> {
    tx: T,
    scanner: &'static GlyphScanner,
    /// Assembled line, reused across writes.
    buffer: Vec<u8>,
    /// Field-text scratch, reused across writes.
    scratch: Vec<u8>,
    finished: bool,
}

impl<T: CopyTransaction> StreamTo<T> {
    /// Write to a table, optionally restricted to `columns`.
    ///
    /// Prefer naming the columns: it makes the mapping between your data
    /// and the table explicit instead of an implicit contract with the
    /// schema's column order.
    pub fn table(tx: T, table: &str, columns: &[&str]) -> Result<Self> {
        Self::raw_table_impl(tx, &quote_name(table), &quote_columns(columns))
    }

    /// Write to a pre-quoted table path and column list.
    pub fn raw_table(tx: T, path: &str, columns: &str) -> Result<Self> {
        Self::raw_table_impl(tx, path, columns)
    }

    fn raw_table_impl(tx: T, path: &str, columns: &str) -> Result<Self> {
        let command = if columns.is_empty() {
            format!("COPY {path} FROM STDIN")
        } else {
            format!("COPY {path}({columns}) FROM STDIN")
        };
        Self::start(tx, command)
    }

    #[tracing::instrument(skip_all)]
    fn start(mut tx: T, command: String) -> Result<Self> {
        tx.register_focus("stream_to")?;
        let scanner = tx.encoding_group().scanner();
        if let Err(err) = tx.exec(&command) {
            tx.unregister_focus();
            return Err(err);
        }
        tracing::debug!(%command, "copy write started");
        Ok(Self {
            tx,
            scanner,
            buffer: Vec::new(),
            scratch: Vec::new(),
            finished: false,
        })
    }

    /// Does this stream still need to [`complete`](StreamTo::complete)?
    pub fn is_active(&self) -> bool {
        !self.finished
    }

    /// Insert one row. Pass a tuple of field values; for null fields use
    /// `Option` values (or `None::<T>` for an always-null column).
    pub fn write_row<R: ToCopyRow>(&mut self, row: &R) -> Result<()> {
        self.buffer.clear();
        row.write_fields(self.scanner, &mut self.scratch, &mut self.buffer)?;
        if !self.buffer.is_empty() {
            // Field encoding terminates every field with a tab; the wire
            // format has none after the last field.
            debug_assert_eq!(self.buffer.last(), Some(&b'\t'));
            self.buffer.pop();
        }
        self.tx.write_copy_line(&self.buffer)
    }

    /// Send one pre-assembled line of COPY text.
    pub fn write_raw_line(&mut self, line: &[u8]) -> Result<()> {
        self.tx.write_copy_line(line)
    }

    /// Relay an entire [`StreamFrom`] into this stream, line by line,
    /// without decoding.
    ///
    /// Useful when copying between different databases. If source and
    /// destination are on the same database, a plain
    /// `INSERT INTO ... SELECT` is both simpler and faster.
    pub fn copy_from<S: CopyTransaction>(&mut self, source: &mut StreamFrom<S>) -> Result<()> {
        while let Some(line) = source.read_raw_line()? {
            self.tx.write_copy_line(line)?;
        }
        Ok(())
    }

    /// Complete the operation: send the COPY terminator and release the
    /// transaction.
    ///
    /// Always call this, even after an error (then abort the transaction
    /// afterwards). The only time it's safe to skip is when the whole
    /// connection is being discarded.
    #[tracing::instrument(skip_all)]
    pub fn complete(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        self.finished = true;
        self.tx.unregister_focus();
        self.tx.end_copy_write()
    }
}

impl<T: CopyTransaction> Drop for StreamTo<T> {
    fn drop(&mut self) {
        if let Err(err) = self.complete() {
            self.tx.register_pending_error(err.to_string());
        }
    }
}
