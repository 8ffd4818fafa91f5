//! Row storage for COPY streams.
//!
//! One [`RowBuffer`] is reused for every row of a stream: the decoder
//! resizes it once per row, unescapes the line into it, and records each
//! field as an offset span. [`Row`] hands out views into that storage.
//! Because a view borrows the buffer, the borrow checker enforces the
//! core lifetime rule of this design: field views die before the next row
//! is decoded into the same buffer.

use crate::copy::line::{escape_field_into, write_null_field};
use crate::encoding::GlyphScanner;
use crate::error::{Error, Result};
use crate::field::{FromCopyField, ToCopyField, as_utf8};

/// One field's location in the unescape buffer.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FieldSpan {
    pub(crate) start: usize,
    pub(crate) len: usize,
}

/// Reusable storage for one decoded COPY row.
///
/// The unescape buffer and the field list are cleared and refilled for each
/// row, so a long stream does no per-row heap allocation once the buffers
/// have grown to the widest row seen.
#[derive(Debug, Default)]
pub struct RowBuffer {
    /// Unescaped field text, all fields back to back.
    pub(crate) text: Vec<u8>,
    /// One span per field; `None` is SQL null (distinct from empty).
    pub(crate) fields: Vec<Option<FieldSpan>>,
}

impl RowBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// View the currently decoded row.
    pub fn row(&self) -> Row<'_> {
        Row { buffer: self }
    }
}

/// A decoded row: a sequence of field views.
///
/// Views remain valid until the owning stream reads the next row; the
/// borrow on the stream enforces that statically.
#[derive(Debug, Clone, Copy)]
pub struct Row<'a> {
    buffer: &'a RowBuffer,
}

impl<'a> Row<'a> {
    /// Number of fields in this row.
    pub fn len(&self) -> usize {
        self.buffer.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.fields.is_empty()
    }

    /// A field's unescaped bytes, or `None` for SQL null.
    ///
    /// Panics if `index` is out of bounds.
    pub fn raw(&self, index: usize) -> Option<&'a [u8]> {
        self.buffer.fields[index].map(|span| &self.buffer.text[span.start..span.start + span.len])
    }

    /// A field as UTF-8 text, or `None` for SQL null.
    ///
    /// Fails with a conversion error if the bytes are not valid UTF-8,
    /// which can happen for string data in a non-UTF-8 server encoding.
    pub fn text(&self, index: usize) -> Result<Option<&'a str>> {
        self.raw(index).map(as_utf8).transpose()
    }

    /// Iterate over the fields as raw views.
    pub fn iter(&self) -> impl Iterator<Item = Option<&'a [u8]>> + use<'a> {
        let buffer = self.buffer;
        buffer
            .fields
            .iter()
            .map(move |span| span.map(|s| &buffer.text[s.start..s.start + s.len]))
    }
}

/// Decode a whole row into a value, one [`FromCopyField`] per field.
///
/// Implemented for tuples up to 12 fields. The stream checks the row's
/// actual field count against [`WIDTH`](FromCopyRow::WIDTH) before calling
/// [`from_row`](FromCopyRow::from_row).
pub trait FromCopyRow: Sized {
    /// Number of fields this type expects.
    const WIDTH: usize;

    fn from_row(row: &Row<'_>) -> Result<Self>;
}

fn extract_field<F: FromCopyField>(row: &Row<'_>, index: usize) -> Result<F> {
    match row.raw(index) {
        Some(text) => F::from_text(text),
        None => F::from_null(),
    }
}

macro_rules! impl_from_copy_row_tuple {
    ($width:expr; $($t:ident: $idx:tt),+) => {
        impl<$($t: FromCopyField),+> FromCopyRow for ($($t,)+) {
            const WIDTH: usize = $width;

            fn from_row(row: &Row<'_>) -> Result<Self> {
                debug_assert_eq!(row.len(), Self::WIDTH);
                Ok(($(extract_field::<$t>(row, $idx)?,)+))
            }
        }
    };
}

impl_from_copy_row_tuple!(1; A: 0);
impl_from_copy_row_tuple!(2; A: 0, B: 1);
impl_from_copy_row_tuple!(3; A: 0, B: 1, C: 2);
impl_from_copy_row_tuple!(4; A: 0, B: 1, C: 2, D: 3);
impl_from_copy_row_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_from_copy_row_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_from_copy_row_tuple!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_from_copy_row_tuple!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_from_copy_row_tuple!(9; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_from_copy_row_tuple!(10; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_from_copy_row_tuple!(11; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_from_copy_row_tuple!(12; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

/// Encode a whole row of values as COPY fields, one [`ToCopyField`] per
/// field. Implemented for tuples up to 12 fields.
pub trait ToCopyRow {
    /// Number of fields this type produces.
    const WIDTH: usize;

    /// Escape every field into `out`, each followed by a tab terminator.
    /// `scratch` is a reusable buffer for the fields' unescaped text.
    fn write_fields(
        &self,
        scanner: &GlyphScanner,
        scratch: &mut Vec<u8>,
        out: &mut Vec<u8>,
    ) -> Result<()>;
}

fn write_field<F: ToCopyField>(
    field: &F,
    scanner: &GlyphScanner,
    scratch: &mut Vec<u8>,
    out: &mut Vec<u8>,
) -> Result<()> {
    if field.is_null() {
        write_null_field(out);
        Ok(())
    } else {
        scratch.clear();
        field.write_text(scratch)?;
        escape_field_into(scanner, scratch, out)
    }
}

macro_rules! impl_to_copy_row_tuple {
    ($width:expr; $($t:ident: $idx:tt),+) => {
        impl<$($t: ToCopyField),+> ToCopyRow for ($($t,)+) {
            const WIDTH: usize = $width;

            fn write_fields(
                &self,
                scanner: &GlyphScanner,
                scratch: &mut Vec<u8>,
                out: &mut Vec<u8>,
            ) -> Result<()> {
                $(
                    write_field(&self.$idx, scanner, scratch, out)?;
                )+
                Ok(())
            }
        }
    };
}

impl_to_copy_row_tuple!(1; A: 0);
impl_to_copy_row_tuple!(2; A: 0, B: 1);
impl_to_copy_row_tuple!(3; A: 0, B: 1, C: 2);
impl_to_copy_row_tuple!(4; A: 0, B: 1, C: 2, D: 3);
impl_to_copy_row_tuple!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_to_copy_row_tuple!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_to_copy_row_tuple!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_to_copy_row_tuple!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_to_copy_row_tuple!(9; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_to_copy_row_tuple!(10; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_to_copy_row_tuple!(11; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_to_copy_row_tuple!(12; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

/// Arity mismatch between a row and a tuple type: a usage error naming
/// both counts.
pub(crate) fn width_mismatch(expected: usize, actual: usize) -> Error {
    Error::BadUsageError(format!(
        "Tried to extract {expected} field(s) from a stream of {actual}."
    ))
}
