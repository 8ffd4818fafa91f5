//! Conversion between PostgreSQL text representations and Rust types.
//!
//! [`FromCopyField`] decodes one field's unescaped text (or SQL null) into a
//! target type; [`ToCopyField`] produces the text representation for upload.
//! Field text arrives as raw bytes: in a non-UTF-8 server encoding, string
//! data is not guaranteed to be valid UTF-8, so conversions that need `str`
//! validate explicitly (and cheaply, via `simdutf8`).

use std::any::type_name;
use std::io::Write;

use crate::array;
use crate::error::{Error, Result};

/// Validate a field's bytes as UTF-8 text.
pub fn as_utf8(raw: &[u8]) -> Result<&str> {
    simdutf8::basic::from_utf8(raw)
        .map_err(|_| Error::ConversionError("field text is not valid UTF-8".to_string()))
}

/// Decode a single COPY field into a Rust value.
///
/// Types that cannot represent SQL null keep the default [`from_null`]
/// implementation, which fails naming the type; wrap the target in
/// `Option<T>` to read nullable columns.
///
/// [`from_null`]: FromCopyField::from_null
pub trait FromCopyField: Sized {
    /// Convert from the field's unescaped text.
    fn from_text(raw: &[u8]) -> Result<Self>;

    /// Convert from SQL null.
    fn from_null() -> Result<Self> {
        Err(Error::ConversionError(format!(
            "Cannot convert SQL null to {}",
            type_name::<Self>()
        )))
    }
}

/// Encode a Rust value as a COPY field.
pub trait ToCopyField {
    /// Whether this value is SQL null.
    fn is_null(&self) -> bool {
        false
    }

    /// Append the PostgreSQL text representation to `out`.
    ///
    /// Only called when [`is_null`](ToCopyField::is_null) is false.
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()>;

    /// Conservative upper bound on the size of the text representation.
    ///
    /// Array serialization precomputes its buffer budget from this, so it
    /// must never underestimate.
    fn copy_budget(&self) -> usize;

    /// True if the textual form can never contain a quote, backslash, brace,
    /// or separator, and so can be embedded in an array literal unquoted.
    const UNQUOTED_SAFE: bool = false;

    /// True if this type renders as an array literal itself (nested arrays
    /// are embedded raw, not quoted).
    const IS_ARRAY: bool = false;

    /// Separator between elements when this type is an array element.
    /// Comma for every built-in type except `box`, which uses semicolon.
    const ARRAY_SEPARATOR: u8 = b',';
}

fn conversion_err<T>(raw: &[u8]) -> Error {
    Error::ConversionError(format!(
        "Could not convert '{}' to {}",
        String::from_utf8_lossy(raw),
        type_name::<T>()
    ))
}

// ============================================================================
// Integers and floats
// ============================================================================

macro_rules! impl_copy_field_int {
    ($($t:ty => $budget:expr),+ $(,)?) => {
        $(
            impl FromCopyField for $t {
                fn from_text(raw: &[u8]) -> Result<Self> {
                    as_utf8(raw)?.parse().map_err(|_| conversion_err::<$t>(raw))
                }
            }

            impl ToCopyField for $t {
                fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
                    write!(out, "{self}")?;
                    Ok(())
                }

                fn copy_budget(&self) -> usize {
                    $budget
                }

                const UNQUOTED_SAFE: bool = true;
            }
        )+
    };
}

impl_copy_field_int!(
    i8 => 4,    // "-128"
    i16 => 6,   // "-32768"
    i32 => 11,  // "-2147483648"
    i64 => 20,  // "-9223372036854775808"
    u16 => 5,
    u32 => 10,
    u64 => 20,
);

macro_rules! impl_copy_field_float {
    ($($t:ty),+ $(,)?) => {
        $(
            impl FromCopyField for $t {
                fn from_text(raw: &[u8]) -> Result<Self> {
                    // The backend spells specials differently than Rust.
                    match raw {
                        b"NaN" => Ok(<$t>::NAN),
                        b"Infinity" => Ok(<$t>::INFINITY),
                        b"-Infinity" => Ok(<$t>::NEG_INFINITY),
                        _ => as_utf8(raw)?.parse().map_err(|_| conversion_err::<$t>(raw)),
                    }
                }
            }

            impl ToCopyField for $t {
                fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
                    if self.is_nan() {
                        out.extend_from_slice(b"NaN");
                    } else if *self == <$t>::INFINITY {
                        out.extend_from_slice(b"Infinity");
                    } else if *self == <$t>::NEG_INFINITY {
                        out.extend_from_slice(b"-Infinity");
                    } else {
                        write!(out, "{self}")?;
                    }
                    Ok(())
                }

                fn copy_budget(&self) -> usize {
                    // `Display` for floats never switches to an exponent, so
                    // there is no useful constant bound; measure instead.
                    if self.is_finite() {
                        format!("{self}").len()
                    } else {
                        "-Infinity".len()
                    }
                }

                const UNQUOTED_SAFE: bool = true;
            }
        )+
    };
}

impl_copy_field_float!(f32, f64);

// ============================================================================
// Booleans and characters
// ============================================================================

impl FromCopyField for bool {
    fn from_text(raw: &[u8]) -> Result<Self> {
        match raw {
            b"t" | b"true" => Ok(true),
            b"f" | b"false" => Ok(false),
            _ => Err(conversion_err::<bool>(raw)),
        }
    }
}

impl ToCopyField for bool {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        out.push(if *self { b't' } else { b'f' });
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        1
    }

    const UNQUOTED_SAFE: bool = true;
}

impl FromCopyField for char {
    fn from_text(raw: &[u8]) -> Result<Self> {
        let text = as_utf8(raw)?;
        let mut chars = text.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) => Ok(c),
            _ => Err(conversion_err::<char>(raw)),
        }
    }
}

impl ToCopyField for char {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut buf = [0u8; 4];
        out.extend_from_slice(self.encode_utf8(&mut buf).as_bytes());
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        4
    }
}

// ============================================================================
// Strings
// ============================================================================

impl FromCopyField for String {
    fn from_text(raw: &[u8]) -> Result<Self> {
        as_utf8(raw).map(str::to_owned)
    }
}

impl ToCopyField for String {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        self.len()
    }
}

impl ToCopyField for &str {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        self.len()
    }
}

// ============================================================================
// Nullable values
// ============================================================================

impl<T: FromCopyField> FromCopyField for Option<T> {
    fn from_text(raw: &[u8]) -> Result<Self> {
        T::from_text(raw).map(Some)
    }

    fn from_null() -> Result<Self> {
        Ok(None)
    }
}

impl<T: ToCopyField> ToCopyField for Option<T> {
    fn is_null(&self) -> bool {
        self.is_none()
    }

    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Some(value) => value.write_text(out),
            None => Err(Error::ConversionError(format!(
                "Attempt to write SQL null {} as text",
                type_name::<Self>()
            ))),
        }
    }

    fn copy_budget(&self) -> usize {
        self.as_ref().map_or(0, ToCopyField::copy_budget)
    }

    const UNQUOTED_SAFE: bool = T::UNQUOTED_SAFE;
    const IS_ARRAY: bool = T::IS_ARRAY;
    const ARRAY_SEPARATOR: u8 = T::ARRAY_SEPARATOR;
}

// ============================================================================
// Arrays
// ============================================================================

impl<T: FromCopyField> FromCopyField for Vec<T> {
    fn from_text(raw: &[u8]) -> Result<Self> {
        // Byte-wise scanning finds the literal's ASCII structure correctly
        // in every ASCII-safe encoding (single-byte, UTF-8, the EUC family):
        // their multibyte characters never contain bytes in the ASCII
        // range. For the encodings where that doesn't hold (Shift-JIS,
        // Big5, GBK, ...) use `array::parse_array` with the connection's
        // encoding group.
        array::parse_array(crate::encoding::EncodingGroup::Monobyte, raw)
    }
}

impl<T: ToCopyField> ToCopyField for Vec<T> {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        array::write_array_text(self, out)
    }

    fn copy_budget(&self) -> usize {
        array::array_copy_budget(self)
    }

    const IS_ARRAY: bool = true;
    const ARRAY_SEPARATOR: u8 = T::ARRAY_SEPARATOR;
}

// ============================================================================
// Optional ecosystem types
// ============================================================================

#[cfg(feature = "with-uuid")]
impl FromCopyField for uuid::Uuid {
    fn from_text(raw: &[u8]) -> Result<Self> {
        uuid::Uuid::try_parse_ascii(raw).map_err(|_| conversion_err::<uuid::Uuid>(raw))
    }
}

#[cfg(feature = "with-uuid")]
impl ToCopyField for uuid::Uuid {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        let mut buf = [0u8; uuid::fmt::Hyphenated::LENGTH];
        out.extend_from_slice(self.hyphenated().encode_lower(&mut buf).as_bytes());
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        uuid::fmt::Hyphenated::LENGTH
    }
}

#[cfg(feature = "with-chrono")]
impl FromCopyField for chrono::NaiveDate {
    fn from_text(raw: &[u8]) -> Result<Self> {
        chrono::NaiveDate::parse_from_str(as_utf8(raw)?, "%Y-%m-%d")
            .map_err(|_| conversion_err::<chrono::NaiveDate>(raw))
    }
}

#[cfg(feature = "with-chrono")]
impl ToCopyField for chrono::NaiveDate {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        write!(out, "{}", self.format("%Y-%m-%d"))?;
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        16
    }
}

#[cfg(feature = "with-chrono")]
impl FromCopyField for chrono::NaiveDateTime {
    fn from_text(raw: &[u8]) -> Result<Self> {
        chrono::NaiveDateTime::parse_from_str(as_utf8(raw)?, "%Y-%m-%d %H:%M:%S%.f")
            .map_err(|_| conversion_err::<chrono::NaiveDateTime>(raw))
    }
}

#[cfg(feature = "with-chrono")]
impl ToCopyField for chrono::NaiveDateTime {
    fn write_text(&self, out: &mut Vec<u8>) -> Result<()> {
        write!(out, "{}", self.format("%Y-%m-%d %H:%M:%S%.6f"))?;
        Ok(())
    }

    fn copy_budget(&self) -> usize {
        32
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn text_of<T: ToCopyField>(value: &T) -> Vec<u8> {
        let mut out = Vec::new();
        value.write_text(&mut out).unwrap();
        out
    }

    #[test]
    fn integers_round_trip() {
        assert_eq!(i32::from_text(b"-2147483648").unwrap(), i32::MIN);
        assert_eq!(text_of(&i32::MIN), b"-2147483648");
        assert_eq!(u64::from_text(b"18446744073709551615").unwrap(), u64::MAX);
        assert!(i16::from_text(b"99999").is_err());
        assert!(i32::from_text(b"12abc").is_err());
    }

    #[test]
    fn integer_budgets_cover_extremes() {
        assert!(text_of(&i8::MIN).len() <= i8::MIN.copy_budget());
        assert!(text_of(&i64::MIN).len() <= i64::MIN.copy_budget());
        assert!(text_of(&u64::MAX).len() <= u64::MAX.copy_budget());
    }

    #[test]
    fn float_specials_use_backend_spelling() {
        assert!(f64::from_text(b"NaN").unwrap().is_nan());
        assert_eq!(f64::from_text(b"Infinity").unwrap(), f64::INFINITY);
        assert_eq!(f64::from_text(b"-Infinity").unwrap(), f64::NEG_INFINITY);
        assert_eq!(text_of(&f64::INFINITY), b"Infinity");
        assert_eq!(text_of(&f32::NAN), b"NaN");
        assert_eq!(f64::from_text(b"1.5").unwrap(), 1.5);
    }

    #[test]
    fn float_budgets_cover_extremes() {
        for value in [f64::MAX, f64::MIN, 5e-324, 0.5, f64::NAN, f64::INFINITY] {
            assert!(
                text_of(&value).len() <= value.copy_budget(),
                "budget too small for {value}"
            );
        }
    }

    #[test]
    fn bools_use_backend_spelling() {
        assert!(bool::from_text(b"t").unwrap());
        assert!(!bool::from_text(b"f").unwrap());
        assert_eq!(text_of(&true), b"t");
        assert!(bool::from_text(b"yes").is_err());
    }

    #[test]
    fn null_into_non_nullable_type_fails_naming_it() {
        let err = i32::from_null().unwrap_err().to_string();
        assert!(err.contains("i32"), "{err}");
        assert_eq!(Option::<i32>::from_null().unwrap(), None);
    }

    #[test]
    fn option_delegates_text_conversion() {
        assert_eq!(Option::<i32>::from_text(b"7").unwrap(), Some(7));
        assert!(Option::<i32>::from_text(b"x").is_err());
    }

    #[test]
    fn non_utf8_text_is_a_conversion_error_for_string() {
        assert!(String::from_text(b"\x81\x5c").is_err());
        assert_eq!(String::from_text(b"ok").unwrap(), "ok");
    }
}
