//! Parsing of composite-type (row) values.
//!
//! A composite value arrives as text like `("hello, world",42,)`: fields
//! separated by commas inside parentheses, quoted when needed, empty when
//! null. Ranges use the same field syntax inside `(`/`[` pairs, so the
//! field-level parser here is shared with [`crate::range`].

use std::any::type_name;

use crate::encoding::{EncodingGroup, GlyphScanner};
use crate::error::{Error, Result};
use crate::field::{FromCopyField, ToCopyField};
use crate::scan::{parse_double_quoted_string, scan_double_quoted_string, scan_unquoted_string};

/// Parse one field of a composite-type value.
///
/// `index` is the field's zero-based number and `last_field` the number of
/// the final field. Strip the opening parenthesis or bracket before calling;
/// the closing one is consumed here, when parsing the last field.
///
/// On success `pos` points at the start of the next field, or one past the
/// closing delimiter for the last field, and `index` has been incremented.
pub fn parse_composite_field<T: FromCopyField>(
    scanner: &GlyphScanner,
    index: &mut usize,
    input: &[u8],
    pos: &mut usize,
    field: &mut T,
    last_field: usize,
) -> Result<()> {
    debug_assert!(*index <= last_field);
    let glyph = require_glyph(scanner, input, *pos)?;
    if glyph.end - *pos != 1 {
        return Err(Error::ConversionError(
            "Non-ASCII character in composite-type syntax.".to_string(),
        ));
    }

    // Expect a field.
    match input[*pos] {
        b',' | b')' | b']' => {
            // The field is empty, i.e. null.
            *field = T::from_null().map_err(|_| {
                Error::ConversionError(format!(
                    "Can't read composite field {}: {} does not support nulls.",
                    *index,
                    type_name::<T>()
                ))
            })?;
        }
        b'"' => {
            let stop = scan_double_quoted_string(scanner, input, *pos)?;
            let text = parse_double_quoted_string(scanner, input, stop, *pos)?;
            *field = T::from_text(&text)?;
            *pos = stop;
        }
        _ => {
            let stop = scan_unquoted_string(scanner, input, *pos, b",)]")?;
            *field = T::from_text(&input[*pos..stop])?;
            *pos = stop;
        }
    }

    // Expect a comma, or the closing parenthesis/bracket.
    let glyph = require_glyph(scanner, input, *pos)?;
    if glyph.end - *pos != 1 {
        return Err(Error::ConversionError(format!(
            "Unexpected non-ASCII character after composite field: {}",
            String::from_utf8_lossy(input)
        )));
    }
    let next = glyph.end;

    if *index < last_field {
        if input[*pos] != b',' {
            return Err(Error::ConversionError(format!(
                "Found '{}' in composite value where comma was expected: {}",
                input[*pos] as char,
                String::from_utf8_lossy(input)
            )));
        }
    } else {
        if input[*pos] == b',' {
            return Err(Error::ConversionError(format!(
                "Composite value contained more fields than the expected {}: {}",
                last_field + 1,
                String::from_utf8_lossy(input)
            )));
        }
        if input[*pos] != b')' && input[*pos] != b']' {
            return Err(Error::ConversionError(format!(
                "Composite value has unexpected characters where closing parenthesis was \
                 expected: {}",
                String::from_utf8_lossy(input)
            )));
        }
        if next != input.len() {
            return Err(Error::ConversionError(format!(
                "Composite value has unexpected text after closing parenthesis: {}",
                String::from_utf8_lossy(input)
            )));
        }
    }

    *pos = next;
    *index += 1;
    Ok(())
}

fn require_glyph(
    scanner: &GlyphScanner,
    input: &[u8],
    pos: usize,
) -> Result<crate::encoding::Glyph> {
    scanner.next_glyph(input, pos)?.ok_or_else(|| {
        Error::ConversionError(format!(
            "Composite value ended unexpectedly: {}",
            String::from_utf8_lossy(input)
        ))
    })
}

/// An ordered set of `&mut` targets for [`parse_composite`]: tuples of
/// mutable references to field types, one per composite field.
pub trait CompositeTargets {
    /// Number of fields this target set expects.
    const WIDTH: usize;

    fn parse_fields(
        self,
        scanner: &GlyphScanner,
        input: &[u8],
        pos: &mut usize,
        index: &mut usize,
    ) -> Result<()>;
}

macro_rules! impl_composite_targets {
    ($width:expr; $($t:ident: $idx:tt),+) => {
        impl<'a, $($t: FromCopyField),+> CompositeTargets for ($(&'a mut $t,)+) {
            const WIDTH: usize = $width;

            fn parse_fields(
                self,
                scanner: &GlyphScanner,
                input: &[u8],
                pos: &mut usize,
                index: &mut usize,
            ) -> Result<()> {
                let last_field = Self::WIDTH - 1;
                $(
                    parse_composite_field(scanner, index, input, pos, self.$idx, last_field)?;
                )+
                Ok(())
            }
        }
    };
}

impl_composite_targets!(1; A: 0);
impl_composite_targets!(2; A: 0, B: 1);
impl_composite_targets!(3; A: 0, B: 1, C: 2);
impl_composite_targets!(4; A: 0, B: 1, C: 2, D: 3);
impl_composite_targets!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_composite_targets!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_composite_targets!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_composite_targets!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_composite_targets!(9; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_composite_targets!(10; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_composite_targets!(11; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_composite_targets!(12; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

/// Parse a composite-type value into the given field targets.
///
/// ```
/// use zero_pgcopy::composite::parse_composite;
/// use zero_pgcopy::encoding::EncodingGroup;
///
/// let mut name = String::new();
/// let mut count = 0i32;
/// let mut note: Option<String> = None;
/// parse_composite(
///     EncodingGroup::Utf8,
///     br#"("hello, world",42,)"#,
///     (&mut name, &mut count, &mut note),
/// )
/// .unwrap();
/// assert_eq!((name.as_str(), count, note), ("hello, world", 42, None));
/// ```
pub fn parse_composite<T: CompositeTargets>(
    enc: EncodingGroup,
    input: &[u8],
    fields: T,
) -> Result<()> {
    let scanner = enc.scanner();
    if input.is_empty() {
        return Err(Error::ConversionError(
            "Cannot parse composite value from empty string.".to_string(),
        ));
    }
    if input[0] != b'(' {
        return Err(Error::ConversionError(format!(
            "Composite value does not start with '(': {}",
            String::from_utf8_lossy(input)
        )));
    }
    let mut pos = 1;
    let mut index = 0;
    fields.parse_fields(scanner, input, &mut pos, &mut index)
}

fn write_composite_field<F: ToCopyField>(field: &F, out: &mut Vec<u8>) -> Result<()> {
    if field.is_null() {
        // A null field is simply empty.
    } else if F::UNQUOTED_SAFE {
        field.write_text(out)?;
    } else {
        out.push(b'"');
        let start = out.len();
        field.write_text(out)?;
        let mut at = start;
        while at < out.len() {
            if out[at] == b'"' || out[at] == b'\\' {
                out.insert(at, b'\\');
                at += 1;
            }
            at += 1;
        }
        out.push(b'"');
    }
    out.push(b',');
    Ok(())
}

/// An ordered set of field values for [`write_composite_text`]: tuples of
/// [`ToCopyField`] types.
pub trait CompositeSource {
    /// Number of fields this source produces.
    const WIDTH: usize;

    /// Write every field followed by a comma; the caller turns the final
    /// comma into the closing parenthesis.
    fn write_fields(&self, out: &mut Vec<u8>) -> Result<()>;
}

macro_rules! impl_composite_source {
    ($width:expr; $($t:ident: $idx:tt),+) => {
        impl<$($t: ToCopyField),+> CompositeSource for ($($t,)+) {
            const WIDTH: usize = $width;

            fn write_fields(&self, out: &mut Vec<u8>) -> Result<()> {
                $(
                    write_composite_field(&self.$idx, out)?;
                )+
                Ok(())
            }
        }
    };
}

impl_composite_source!(1; A: 0);
impl_composite_source!(2; A: 0, B: 1);
impl_composite_source!(3; A: 0, B: 1, C: 2);
impl_composite_source!(4; A: 0, B: 1, C: 2, D: 3);
impl_composite_source!(5; A: 0, B: 1, C: 2, D: 3, E: 4);
impl_composite_source!(6; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5);
impl_composite_source!(7; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6);
impl_composite_source!(8; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7);
impl_composite_source!(9; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8);
impl_composite_source!(10; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9);
impl_composite_source!(11; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10);
impl_composite_source!(12; A: 0, B: 1, C: 2, D: 3, E: 4, F: 5, G: 6, H: 7, I: 8, J: 9, K: 10, L: 11);

/// Render a composite-type value from a tuple of fields.
///
/// Null fields render empty, unquoted-safe fields raw, everything else
/// double-quoted with backslash escaping. The inverse of
/// [`parse_composite`].
pub fn write_composite_text<T: CompositeSource>(values: &T, out: &mut Vec<u8>) -> Result<()> {
    out.push(b'(');
    values.write_fields(out)?;
    // Every field wrote a trailing comma; the last one becomes the closing
    // parenthesis.
    if let Some(last) = out.last_mut() {
        *last = b')';
    }
    Ok(())
}
