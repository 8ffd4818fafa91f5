use thiserror::Error;

pub use color_eyre::eyre;
pub use color_eyre::eyre::eyre;

/// Render offending bytes the way the server names them: `0x81 0x09`.
fn hex_bytes(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 5);
    for (i, b) in bytes.iter().enumerate() {
        if i > 0 {
            out.push(' ');
        }
        out.push_str(&format!("0x{b:02x}"));
    }
    out
}

#[derive(Debug, Error)]
pub enum Error {
    /// Malformed multibyte sequence: truncated, or a trail byte outside its
    /// legal range. The buffer it came from cannot be trusted past `offset`.
    #[error("Invalid byte sequence for encoding {encoding} at byte {offset}: {}", hex_bytes(.bytes))]
    BadEncoding {
        encoding: &'static str,
        offset: usize,
        bytes: Vec<u8>,
    },

    /// A parsed text value could not be converted to its target type, or an
    /// array/composite/range literal was malformed.
    #[error("Conversion error: {0}")]
    ConversionError(String),

    /// Caller-side contract violation, e.g. a tuple arity that does not match
    /// the row's field count.
    #[error("Usage error: {0}")]
    BadUsageError(String),

    /// A COPY line that violates the wire format.
    #[error("Malformed COPY line: {0}")]
    BadCopyFormat(String),

    /// Caller-supplied output buffer is smaller than the computed budget.
    #[error("Buffer overrun: need {needed} bytes, have {available}")]
    ConversionOverrun { needed: usize, available: usize },

    /// SQL-level failure reported by the server, relayed by the transaction
    /// layer.
    #[error("Server error: {0}")]
    ServerError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Invariant violation inside this library. Please report these.
    #[error("Library bug: {0}")]
    LibraryBug(#[from] eyre::Report),
}

impl Error {
    /// Whether the underlying connection can no longer be trusted.
    ///
    /// Streams use this to decide between propagating an error immediately
    /// (the wire state is unknown, draining would hang or lie) and recording
    /// it in the transaction's pending-error slot.
    pub fn is_connection_broken(&self) -> bool {
        matches!(self, Error::IoError(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoding_error_formats_bytes_as_hex() {
        let err = Error::BadEncoding {
            encoding: "UTF8",
            offset: 3,
            bytes: vec![0xc3, 0x09],
        };
        assert_eq!(
            err.to_string(),
            "Invalid byte sequence for encoding UTF8 at byte 3: 0xc3 0x09"
        );
    }

    #[test]
    fn io_errors_break_the_connection() {
        let io = Error::IoError(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert!(io.is_connection_broken());
        assert!(!Error::ConversionError("x".into()).is_connection_broken());
    }
}
