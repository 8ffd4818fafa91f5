//! Encoding-aware PostgreSQL COPY streaming with zero-copy row parsing.
//!
//! # Features
//!
//! - **Zero-copy rows**: each row is unescaped into one reusable buffer and
//!   read through views that the borrow checker keeps from outliving it
//! - **Multibyte-safe parsing**: field boundaries are found by stepping over
//!   whole characters, so a tab or backslash byte inside a Shift-JIS, Big5,
//!   GB18030, ... character is never mistaken for wire syntax
//! - **Typed rows**: tuples of any [`FromCopyField`]/[`ToCopyField`] types,
//!   with `Option` for nullable columns
//! - **Array, composite and range literals**: pull parsing and budgeted
//!   serialization for the backend's nested text syntaxes
//!
//! The connection itself stays behind the [`CopyTransaction`] trait: this
//! crate drives a COPY operation over any transaction layer that can
//! execute a command and move raw lines.
//!
//! # Example
//!
//! ```no_run
//! use zero_pgcopy::{CopyTransaction, Result, StreamFrom, StreamTo};
//!
//! fn copy_events(tx: impl CopyTransaction) -> Result<()> {
//!     let mut stream = StreamFrom::table(tx, "events", &["id", "label", "score"])?;
//!     while let Some((id, label, score)) = stream.next_row::<(i64, String, Option<f64>)>()? {
//!         println!("{id} {label} {score:?}");
//!     }
//!     stream.complete()
//! }
//!
//! fn load_events(tx: impl CopyTransaction) -> Result<()> {
//!     let mut stream = StreamTo::table(tx, "events", &["id", "label", "score"])?;
//!     stream.write_row(&(1i64, "boot", Some(0.5f64)))?;
//!     stream.write_row(&(2i64, "shutdown", None::<f64>))?;
//!     stream.complete()
//! }
//! ```

pub mod array;
pub mod composite;
pub mod copy;
pub mod encoding;
pub mod error;
pub mod field;
pub mod range;
mod row;
pub mod scan;
pub mod transaction;

pub use copy::{StreamFrom, StreamQuery, StreamTo};
pub use encoding::{EncodingGroup, GlyphScanner};
pub use error::{Error, Result};
pub use field::{FromCopyField, ToCopyField};
pub use row::{FromCopyRow, Row, RowBuffer, ToCopyRow};
pub use transaction::CopyTransaction;
