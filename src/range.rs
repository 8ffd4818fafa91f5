//! Range types, as produced by the backend's `int4range`, `tstzrange`, etc.
//!
//! A range's text form is `[lower,upper)` with `[`/`]` for inclusive and
//! `(`/`)` for exclusive bounds, an omitted bound meaning unbounded, and the
//! special literal `empty` (case-insensitive) for a range that encompasses
//! no values. Field syntax inside the brackets is the composite-field
//! syntax, so parsing reuses [`crate::composite::parse_composite_field`].

use crate::composite::parse_composite_field;
use crate::encoding::EncodingGroup;
use crate::error::{Error, Result};
use crate::field::{FromCopyField, ToCopyField};

/// One end of a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound<T> {
    /// No limit at this end.
    Unbounded,
    /// The boundary value is part of the range.
    Inclusive(T),
    /// The boundary value is just outside the range.
    Exclusive(T),
}

impl<T> RangeBound<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            RangeBound::Unbounded => None,
            RangeBound::Inclusive(v) | RangeBound::Exclusive(v) => Some(v),
        }
    }
}

/// A PostgreSQL range value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PgRange<T> {
    /// The canonical empty range.
    Empty,
    Bounds {
        lower: RangeBound<T>,
        upper: RangeBound<T>,
    },
}

impl<T> PgRange<T> {
    pub fn new(lower: RangeBound<T>, upper: RangeBound<T>) -> Self {
        PgRange::Bounds { lower, upper }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PgRange::Empty)
    }
}

fn err_bad_input(input: &[u8]) -> Error {
    Error::ConversionError(format!(
        "Invalid range input: {}",
        String::from_utf8_lossy(input)
    ))
}

/// Is `input` the literal `empty`, in any capitalization but exact spelling?
fn is_empty_literal(input: &[u8]) -> bool {
    input.len() == 5 && input.eq_ignore_ascii_case(b"empty")
}

impl<T: FromCopyField> FromCopyField for PgRange<T> {
    fn from_text(raw: &[u8]) -> Result<Self> {
        if raw.len() < 3 {
            return Err(err_bad_input(raw));
        }
        let left_inclusive = match raw[0] {
            b'[' => true,
            b'(' => false,
            b'e' | b'E' => {
                if !is_empty_literal(raw) {
                    return Err(err_bad_input(raw));
                }
                return Ok(PgRange::Empty);
            }
            _ => return Err(err_bad_input(raw)),
        };

        // The bounds use the same field syntax as composite values. The
        // range syntax itself is pure ASCII, so byte-wise scanning is
        // correct for any ASCII-safe connection encoding.
        let scanner = EncodingGroup::Monobyte.scanner();
        let mut index = 0;
        let last_field = 1;
        let mut pos = 1;
        let mut lower: Option<T> = None;
        let mut upper: Option<T> = None;
        parse_composite_field(scanner, &mut index, raw, &mut pos, &mut lower, last_field)?;
        parse_composite_field(scanner, &mut index, raw, &mut pos, &mut upper, last_field)?;

        if pos != raw.len() {
            return Err(err_bad_input(raw));
        }
        let closing = raw[pos - 1];
        if closing != b')' && closing != b']' {
            return Err(err_bad_input(raw));
        }
        let right_inclusive = closing == b']';

        let lower = match lower {
            None => RangeBound::Unbounded,
            Some(v) if left_inclusive => RangeBound::Inclusive(v),
            Some(v) => RangeBound::Exclusive(v),
        };
        let upper = match upper {
            None => RangeBound::Unbounded,
            Some(v) if right_inclusive => RangeBound::Inclusive(v),
            Some(v) => RangeBound::Exclusive(v),
        };
        Ok(PgRange::Bounds { lower, upper })
    }
}

impl<T: ToCopyField> ToCopyField for PgRange<T> {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            PgRange::Empty => {
                out.extend_from_slice(b"empty");
            }
            PgRange::Bounds { lower, upper } => {
                out.push(if matches!(lower, RangeBound::Inclusive(_)) {
                    b'['
                } else {
                    b'('
                });
                if let Some(value) = lower.value() {
                    value.write_text(out)?;
                }
                out.push(b',');
                if let Some(value) = upper.value() {
                    value.write_text(out)?;
                }
                out.push(if matches!(upper, RangeBound::Inclusive(_)) {
                    b']'
                } else {
                    b')'
                });
            }
        }
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        match self {
            PgRange::Empty => 5,
            PgRange::Bounds { lower, upper } => {
                let bound_budget = |b: &RangeBound<T>| b.value().map_or(0, ToCopyField::copy_budget);
                bound_budget(lower) + bound_budget(upper) + 3
            }
        }
    }
}
