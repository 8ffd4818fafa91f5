//! The narrow seam between COPY streams and the transaction/connection
//! layer that owns the wire.
//!
//! This crate does not open sockets or speak the general query protocol;
//! it drives a transaction through [`CopyTransaction`]. The contract is
//! deliberately small: start a COPY, move raw lines, report the encoding,
//! and arbitrate which single object may monopolise the wire.

use auto_impl::auto_impl;

use crate::encoding::EncodingGroup;
use crate::error::Result;

/// Operations a transaction must provide for COPY streaming.
///
/// # Focus
///
/// At most one stream (or any other object that monopolises the wire, such
/// as a pipeline) may be registered on a transaction at a time.
/// [`register_focus`](CopyTransaction::register_focus) must fail with a
/// usage error while another focus is registered, and
/// [`unregister_focus`](CopyTransaction::unregister_focus) releases the
/// slot. Streams guarantee the calls come in pairs.
///
/// # Threading
///
/// Everything here is synchronous and single-threaded; serializing access
/// to one connection's world is the caller's job, which `&mut self`
/// receivers make explicit.
///
/// # Errors
///
/// Wire-level failures surface as [`crate::Error::IoError`] (the connection
/// can no longer be trusted) or [`crate::Error::ServerError`] (an SQL-level
/// failure). Streams propagate the former immediately and never retry.
#[auto_impl(&mut)]
pub trait CopyTransaction {
    /// Execute an SQL command and discard its result. Used for the
    /// `COPY ... TO STDOUT` / `COPY ... FROM STDIN` startup commands.
    fn exec(&mut self, sql: &str) -> Result<()>;

    /// Read one raw line of COPY text, without the trailing newline, into
    /// `line` (overwriting it). Returns `false` on end of data.
    ///
    /// The line's bytes are owned by the caller only until its next call;
    /// streams copy-or-consume accordingly.
    fn read_copy_line(&mut self, line: &mut Vec<u8>) -> Result<bool>;

    /// Send one line of COPY text, without a trailing newline.
    fn write_copy_line(&mut self, line: &[u8]) -> Result<()>;

    /// Signal end of data for a write stream.
    fn end_copy_write(&mut self) -> Result<()>;

    /// The connection's text encoding group.
    ///
    /// Must be answerable without a wire round trip: streams call it after
    /// registering but before issuing COPY, and once the COPY sub-protocol
    /// is active no ordinary query may interleave.
    fn encoding_group(&self) -> EncodingGroup;

    /// Claim the transaction's exclusive focus slot. `description` names
    /// the claimant for error messages.
    fn register_focus(&mut self, description: &str) -> Result<()>;

    /// Release the focus slot.
    fn unregister_focus(&mut self);

    /// Record an error that could not be propagated (it surfaced during
    /// drop). The transaction keeps it for later inspection.
    fn register_pending_error(&mut self, message: String);
}

/// Quote an SQL identifier: wrap in double quotes, doubling embedded ones.
pub fn quote_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if c == '"' {
            out.push('"');
        }
        out.push(c);
    }
    out.push('"');
    out
}

/// Quote a column list for a COPY statement.
pub fn quote_columns(columns: &[&str]) -> String {
    let mut out = String::new();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&quote_name(column));
    }
    out
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn quotes_identifiers() {
        assert_eq!(quote_name("plain"), "\"plain\"");
        assert_eq!(quote_name("we\"ird"), "\"we\"\"ird\"");
        assert_eq!(quote_columns(&["a", "b c"]), "\"a\",\"b c\"");
        assert_eq!(quote_columns(&[]), "");
    }
}
