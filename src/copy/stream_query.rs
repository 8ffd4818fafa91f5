//! Strongly typed query streaming.

use std::marker::PhantomData;

use crate::error::Result;
use crate::row::FromCopyRow;
use crate::transaction::CopyTransaction;

use super::StreamFrom;

/// A stream of typed rows from a query.
///
/// Where [`StreamFrom`] leaves the row type open per call, a `StreamQuery`
/// fixes it up front and iterates:
///
/// ```ignore
/// let mut stream = StreamQuery::<(i64, String), _>::new(tx, "SELECT id, name FROM users")?;
/// for row in &mut stream {
///     let (id, name) = row?;
///     // ...
/// }
/// stream.complete()?;
/// ```
///
/// Not every query can run inside COPY; plain `SELECT` and
/// `UPDATE ... RETURNING` queries work. See the PostgreSQL documentation
/// for the COPY command for the full rules.
#[derive(Debug)]
pub struct StreamQuery<R: FromCopyRow, T: CopyTransaction> {
    stream: StreamFrom<T>,
    _row: PhantomData<fn() -> R>,
}

impl<R: FromCopyRow, T: CopyTransaction> StreamQuery<R, T> {
    /// Execute `query` and stream its results as typed rows.
    pub fn new(tx: T, query: &str) -> Result<Self> {
        Ok(Self {
            stream: StreamFrom::query(tx, query)?,
            _row: PhantomData,
        })
    }

    /// Read the next row. `None` means end of data.
    pub fn next_row(&mut self) -> Result<Option<R>> {
        self.stream.next_row()
    }

    /// May this stream still produce more data?
    pub fn is_active(&self) -> bool {
        self.stream.is_active()
    }

    /// Finish the stream; see [`StreamFrom::complete`].
    pub fn complete(&mut self) -> Result<()> {
        self.stream.complete()
    }
}

impl<R: FromCopyRow, T: CopyTransaction> Iterator for StreamQuery<R, T> {
    type Item = Result<R>;

    fn next(&mut self) -> Option<Self::Item> {
        self.stream.next_row().transpose()
    }
}
