//! Stream data out of the database with `COPY ... TO STDOUT`.

use crate::copy::line::decode_copy_line;
use crate::encoding::GlyphScanner;
use crate::error::Result;
use crate::row::{FromCopyRow, Row, RowBuffer, width_mismatch};
use crate::transaction::{CopyTransaction, quote_columns, quote_name};

/// A stream of rows read from the database.
///
/// Reading this way is usually faster than executing a query and iterating
/// its result, and processing can start before all data has arrived. The
/// trade-offs: an error may leave the whole connection unusable, and while
/// the stream is open the transaction can do nothing else.
///
/// Every row is decoded into one reusable buffer. [`read_row`] therefore
/// hands out views that borrow the stream; the borrow ends before the next
/// read can begin, which is exactly the lifetime the buffer reuse requires.
///
/// Call [`complete`] when done. Dropping an unfinished stream drains it
/// best-effort and records any failure in the transaction's pending-error
/// slot instead of panicking mid-unwind.
///
/// [`read_row`]: StreamFrom::read_row
/// [`complete`]: StreamFrom::complete
#[derive(Debug)]
pub struct StreamFrom<T: CopyTransaction> {
    tx: T,
    scanner: &'static GlyphScanner,
    /// Raw line buffer, reused across reads.
    line: Vec<u8>,
    /// Unescaped row storage, reused across reads.
    row: RowBuffer,
    finished: bool,
}

impl<T: CopyTransaction> StreamFrom<T> {
    /// Execute `query` and stream its results.
    ///
    /// The query can be a `SELECT` or `VALUES` query, or an
    /// `UPDATE`/`INSERT`/`DELETE` with a `RETURNING` clause.
    pub fn query(tx: T, query: &str) -> Result<Self> {
        Self::start(tx, format!("COPY ({query}) TO STDOUT"))
    }

    /// Stream rows from a table, optionally restricted to `columns`.
    ///
    /// The table and column names are quoted here; use
    /// [`raw_table`](StreamFrom::raw_table) if they are already quoted.
    pub fn table(tx: T, table: &str, columns: &[&str]) -> Result<Self> {
        Self::raw_table_impl(tx, &quote_name(table), &quote_columns(columns))
    }

    /// Stream rows from a pre-quoted table path and column list.
    pub fn raw_table(tx: T, path: &str, columns: &str) -> Result<Self> {
        Self::raw_table_impl(tx, path, columns)
    }

    fn raw_table_impl(tx: T, path: &str, columns: &str) -> Result<Self> {
        let command = if columns.is_empty() {
            format!("COPY {path} TO STDOUT")
        } else {
            format!("COPY {path}({columns}) TO STDOUT")
        };
        Self::start(tx, command)
    }

    #[tracing::instrument(skip_all)]
    fn start(mut tx: T, command: String) -> Result<Self> {
        tx.register_focus("stream_from")?;
        // Capture the encoding before COPY starts; it cannot be queried
        // mid-stream.
        let scanner = tx.encoding_group().scanner();
        if let Err(err) = tx.exec(&command) {
            tx.unregister_focus();
            return Err(err);
        }
        tracing::debug!(%command, "copy read started");
        Ok(Self {
            tx,
            scanner,
            line: Vec::new(),
            row: RowBuffer::new(),
            finished: false,
        })
    }

    /// May this stream still produce more data?
    pub fn is_active(&self) -> bool {
        !self.finished
    }

    /// Read one row and return its fields as views.
    ///
    /// `None` means end of data. A field view of `None` is SQL null. The
    /// views are valid until the next read from this stream.
    pub fn read_row(&mut self) -> Result<Option<Row<'_>>> {
        if !self.fetch_line()? {
            return Ok(None);
        }
        decode_copy_line(self.scanner, &self.line, &mut self.row)?;
        Ok(Some(self.row.row()))
    }

    /// Read one row into a tuple of typed fields.
    ///
    /// The row's field count must equal the tuple arity exactly. For a
    /// column that can be null, use an `Option` element type.
    pub fn next_row<R: FromCopyRow>(&mut self) -> Result<Option<R>> {
        match self.read_row()? {
            None => Ok(None),
            Some(row) => {
                if row.len() != R::WIDTH {
                    return Err(width_mismatch(R::WIDTH, row.len()));
                }
                R::from_row(&row).map(Some)
            }
        }
    }

    /// Read one raw line of COPY text, undecoded.
    ///
    /// Useful for relaying into a [`StreamTo`](crate::StreamTo) on another
    /// database without a decode/encode round trip. `None` means end of
    /// data.
    pub fn read_raw_line(&mut self) -> Result<Option<&[u8]>> {
        Ok(if self.fetch_line()? {
            Some(self.line.as_slice())
        } else {
            None
        })
    }

    /// Finish the stream: consume all remaining lines and release the
    /// transaction.
    ///
    /// This may take a while when abandoning a stream early. A broken
    /// connection propagates immediately (the wire state is unknown); any
    /// other failure during the drain is recorded as a pending error on the
    /// transaction.
    #[tracing::instrument(skip_all)]
    pub fn complete(&mut self) -> Result<()> {
        if self.finished {
            return Ok(());
        }
        loop {
            match self.fetch_line() {
                Ok(true) => {}
                Ok(false) => break,
                Err(err) if err.is_connection_broken() => {
                    self.close();
                    return Err(err);
                }
                Err(err) => {
                    self.tx.register_pending_error(err.to_string());
                    break;
                }
            }
        }
        self.close();
        Ok(())
    }

    /// Pull the next raw line into `self.line`. `false` on end of data.
    fn fetch_line(&mut self) -> Result<bool> {
        if self.finished {
            return Ok(false);
        }
        match self.tx.read_copy_line(&mut self.line) {
            Ok(true) => Ok(true),
            Ok(false) => {
                self.close();
                Ok(false)
            }
            Err(err) => {
                self.close();
                Err(err)
            }
        }
    }

    fn close(&mut self) {
        if !self.finished {
            self.finished = true;
            self.tx.unregister_focus();
        }
    }
}

impl<T: CopyTransaction> Drop for StreamFrom<T> {
    fn drop(&mut self) {
        if let Err(err) = self.complete() {
            self.tx.register_pending_error(err.to_string());
        }
    }
}
