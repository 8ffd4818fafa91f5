//! Parsing and rendering of SQL array literals.
//!
//! An array arrives from the backend as text like `{1,2,NULL,4}` or
//! `{{a,b},{c,d}}`. [`ArrayParser`] is a low-level pull parser over that
//! syntax; [`parse_array`] is the typed convenience built on top of it, and
//! the `write_array_*` functions are the inverse direction.

use crate::encoding::{EncodingGroup, GlyphScanner};
use crate::error::{Error, Result};
use crate::field::{FromCopyField, ToCopyField};
use crate::scan::{
    parse_double_quoted_string, parse_single_quoted_string, scan_double_quoted_string,
    scan_single_quoted_string, scan_unquoted_string,
};

/// What the parser found in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayEntry {
    /// Starting a new row (an opening brace).
    RowStart,
    /// Ending the current row (a closing brace).
    RowEnd,
    /// A NULL element.
    Null,
    /// A string element, unquoted and unescaped. Raw bytes: in a non-UTF-8
    /// server encoding, text data need not be valid UTF-8.
    Value(Vec<u8>),
    /// Parsing has completed.
    Done,
}

/// Low-level array parser.
///
/// Use this to decode an array field fetched from the database. Call
/// [`next_entry`](ArrayParser::next_entry) until it returns
/// [`ArrayEntry::Done`]. The element separator (comma, or semicolon for box
/// types) is consumed between entries.
///
/// The unquoted value `NULL` means a null element; a *quoted* `"NULL"` is a
/// string that happens to spell NULL.
#[derive(Debug)]
pub struct ArrayParser<'a> {
    input: &'a [u8],
    scanner: &'static GlyphScanner,
    pos: usize,
}

impl<'a> ArrayParser<'a> {
    pub fn new(input: &'a [u8], enc: EncodingGroup) -> Self {
        Self {
            input,
            scanner: enc.scanner(),
            pos: 0,
        }
    }

    /// Current parsing position, as a byte offset into the input.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Parse the next step in the array.
    pub fn next_entry(&mut self) -> Result<ArrayEntry> {
        if self.pos >= self.input.len() {
            return Ok(ArrayEntry::Done);
        }

        let entry;
        let mut end;
        let glyph_end = self.glyph_end(self.pos)?;
        if glyph_end - self.pos > 1 {
            // Non-ASCII unquoted string.
            end = self.scan_unquoted()?;
            entry = ArrayEntry::Value(self.input[self.pos..end].to_vec());
        } else {
            match self.input[self.pos] {
                0 => {
                    return Err(Error::ConversionError(
                        "Unexpected zero byte in array.".to_string(),
                    ));
                }
                b'{' => {
                    entry = ArrayEntry::RowStart;
                    end = glyph_end;
                }
                b'}' => {
                    entry = ArrayEntry::RowEnd;
                    end = glyph_end;
                }
                b'\'' => {
                    end = scan_single_quoted_string(self.scanner, self.input, self.pos)?;
                    entry = ArrayEntry::Value(parse_single_quoted_string(
                        self.scanner,
                        self.input,
                        end,
                        self.pos,
                    )?);
                }
                b'"' => {
                    end = scan_double_quoted_string(self.scanner, self.input, self.pos)?;
                    entry = ArrayEntry::Value(parse_double_quoted_string(
                        self.scanner,
                        self.input,
                        end,
                        self.pos,
                    )?);
                }
                _ => {
                    end = self.scan_unquoted()?;
                    let value = &self.input[self.pos..end];
                    if value == b"NULL" {
                        entry = ArrayEntry::Null;
                    } else {
                        entry = ArrayEntry::Value(value.to_vec());
                    }
                }
            }
        }

        // Skip a trailing element separator, if present.
        if end < self.input.len() {
            let next = self.glyph_end(end)?;
            if next - end == 1 && (self.input[end] == b',' || self.input[end] == b';') {
                end = next;
            }
        }

        self.pos = end;
        Ok(entry)
    }

    fn glyph_end(&self, pos: usize) -> Result<usize> {
        match self.scanner.next_glyph(self.input, pos)? {
            Some(glyph) => Ok(glyph.end),
            None => Ok(pos),
        }
    }

    fn scan_unquoted(&self) -> Result<usize> {
        scan_unquoted_string(self.scanner, self.input, self.pos, b",;}")
    }
}

/// Find the end of a balanced `{...}` literal starting at `pos`.
///
/// Skips over quoted strings, so braces inside element values don't count.
fn scan_subarray(scanner: &GlyphScanner, input: &[u8], pos: usize) -> Result<usize> {
    debug_assert_eq!(input.get(pos), Some(&b'{'));
    let mut depth = 0usize;
    let mut here = pos;
    while here < input.len() {
        let next = match scanner.next_glyph(input, here)? {
            Some(glyph) => glyph.end,
            None => break,
        };
        if next - here == 1 {
            match input[here] {
                b'{' => depth += 1,
                b'}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(next);
                    }
                }
                b'"' => {
                    here = scan_double_quoted_string(scanner, input, here)?;
                    continue;
                }
                b'\'' => {
                    here = scan_single_quoted_string(scanner, input, here)?;
                    continue;
                }
                _ => {}
            }
        }
        here = next;
    }
    Err(Error::ConversionError(
        "Malformed array; may be truncated.".to_string(),
    ))
}

/// Parse an array literal into a vector of elements.
///
/// Nested arrays work through element types that are themselves vectors:
/// `parse_array::<Vec<i32>>` reads `{{1,2},{3,4}}`. Null elements need a
/// nullable element type, `Option<T>`.
pub fn parse_array<T: FromCopyField>(enc: EncodingGroup, input: &[u8]) -> Result<Vec<T>> {
    let scanner = enc.scanner();
    if input.is_empty() || input[0] != b'{' {
        return Err(Error::ConversionError(format!(
            "Malformed array: does not start with '{{': {}",
            String::from_utf8_lossy(input)
        )));
    }
    let outer_end = scan_subarray(scanner, input, 0)?;
    if outer_end != input.len() {
        return Err(Error::ConversionError(format!(
            "Malformed array: unexpected text after closing brace: {}",
            String::from_utf8_lossy(input)
        )));
    }

    let mut out = Vec::new();
    let mut pos = 1;
    loop {
        let glyph_end = match scanner.next_glyph(input, pos)? {
            Some(glyph) => glyph.end,
            None => {
                return Err(Error::ConversionError(
                    "Malformed array; may be truncated.".to_string(),
                ));
            }
        };

        // Element or closing brace.
        if glyph_end - pos == 1 && input[pos] == b'}' {
            break;
        }
        if glyph_end - pos == 1 && input[pos] == b'{' {
            // Nested sub-array: hand the whole literal to the element type.
            let sub_end = scan_subarray(scanner, input, pos)?;
            out.push(T::from_text(&input[pos..sub_end])?);
            pos = sub_end;
        } else if glyph_end - pos == 1 && input[pos] == b'"' {
            let end = scan_double_quoted_string(scanner, input, pos)?;
            let text = parse_double_quoted_string(scanner, input, end, pos)?;
            out.push(T::from_text(&text)?);
            pos = end;
        } else if glyph_end - pos == 1 && input[pos] == b'\'' {
            let end = scan_single_quoted_string(scanner, input, pos)?;
            let text = parse_single_quoted_string(scanner, input, end, pos)?;
            out.push(T::from_text(&text)?);
            pos = end;
        } else {
            let stop = scan_unquoted_string(scanner, input, pos, b",;}")?;
            let value = &input[pos..stop];
            if value == b"NULL" {
                out.push(T::from_null()?);
            } else {
                out.push(T::from_text(value)?);
            }
            pos = stop;
        }

        // Separator between elements, or the closing brace.
        match input.get(pos) {
            Some(b',' | b';') => pos += 1,
            Some(b'}') => break,
            _ => {
                return Err(Error::ConversionError(format!(
                    "Malformed array: expected separator or closing brace at byte {pos}: {}",
                    String::from_utf8_lossy(input)
                )));
            }
        }
    }
    Ok(out)
}

/// Conservative buffer budget for an array's text representation.
///
/// Serialization writes against this budget without re-measuring, so it must
/// never underestimate: unquoted-safe elements pay their own budget plus a
/// separator; all other elements pay for quotes and worst-case escaping.
pub fn array_copy_budget<T: ToCopyField>(elements: &[T]) -> usize {
    let per_element: usize = elements
        .iter()
        .map(|elt| {
            if elt.is_null() {
                // "NULL" plus a separator.
                5
            } else if T::IS_ARRAY || T::UNQUOTED_SAFE {
                elt.copy_budget() + 1
            } else {
                // Opening and closing quotes, worst-case escaping on every
                // byte, and one byte for the separator.
                2 * elt.copy_budget() + 3
            }
        })
        .sum();
    // Braces plus slack.
    3 + per_element
}

/// Render an array literal, growing `out` as needed.
pub fn write_array_text<T: ToCopyField>(elements: &[T], out: &mut Vec<u8>) -> Result<()> {
    out.push(b'{');
    for (i, elt) in elements.iter().enumerate() {
        if i > 0 {
            out.push(T::ARRAY_SEPARATOR);
        }
        if elt.is_null() {
            out.extend_from_slice(b"NULL");
        } else if T::IS_ARRAY || T::UNQUOTED_SAFE {
            elt.write_text(out)?;
        } else {
            out.push(b'"');
            let start = out.len();
            elt.write_text(out)?;
            // Escape in place: shift bytes that need a backslash.
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
    }
    out.push(b'}');
    Ok(())
}

/// Render an array literal into a caller-supplied buffer.
///
/// The required budget is computed up front; a buffer smaller than the
/// budget is rejected with [`Error::ConversionOverrun`] before anything is
/// written. Returns the number of bytes written.
pub fn write_array_into<T: ToCopyField>(buf: &mut [u8], elements: &[T]) -> Result<usize> {
    let needed = array_copy_budget(elements);
    if buf.len() < needed {
        return Err(Error::ConversionOverrun {
            needed,
            available: buf.len(),
        });
    }
    let mut out = Vec::with_capacity(needed);
    write_array_text(elements, &mut out)?;
    debug_assert!(out.len() <= needed);
    buf[..out.len()].copy_from_slice(&out);
    Ok(out.len())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn entries(input: &[u8]) -> Vec<ArrayEntry> {
        let mut parser = ArrayParser::new(input, EncodingGroup::Utf8);
        let mut out = Vec::new();
        loop {
            let entry = parser.next_entry().unwrap();
            let done = entry == ArrayEntry::Done;
            out.push(entry);
            if done {
                return out;
            }
        }
    }

    fn value(text: &[u8]) -> ArrayEntry {
        ArrayEntry::Value(text.to_vec())
    }

    #[test]
    fn walks_flat_array() {
        assert_eq!(
            entries(b"{1,2,NULL,4}"),
            vec![
                ArrayEntry::RowStart,
                value(b"1"),
                value(b"2"),
                ArrayEntry::Null,
                value(b"4"),
                ArrayEntry::RowEnd,
                ArrayEntry::Done,
            ]
        );
    }

    #[test]
    fn walks_nested_array() {
        assert_eq!(
            entries(b"{a,{b,c}}"),
            vec![
                ArrayEntry::RowStart,
                value(b"a"),
                ArrayEntry::RowStart,
                value(b"b"),
                value(b"c"),
                ArrayEntry::RowEnd,
                ArrayEntry::RowEnd,
                ArrayEntry::Done,
            ]
        );
    }

    #[test]
    fn quoted_null_is_a_string() {
        assert_eq!(
            entries(b"{\"NULL\",NULL}"),
            vec![
                ArrayEntry::RowStart,
                value(b"NULL"),
                ArrayEntry::Null,
                ArrayEntry::RowEnd,
                ArrayEntry::Done,
            ]
        );
    }

    #[test]
    fn quoted_values_unescape() {
        assert_eq!(
            entries(br#"{"a\"b","c\\d",'e''f'}"#),
            vec![
                ArrayEntry::RowStart,
                value(br#"a"b"#),
                value(br"c\d"),
                value(b"e'f"),
                ArrayEntry::RowEnd,
                ArrayEntry::Done,
            ]
        );
    }

    #[test]
    fn semicolon_separator_is_accepted() {
        assert_eq!(
            entries(b"{a;b}"),
            vec![
                ArrayEntry::RowStart,
                value(b"a"),
                value(b"b"),
                ArrayEntry::RowEnd,
                ArrayEntry::Done,
            ]
        );
    }

    #[test]
    fn zero_byte_is_rejected() {
        let mut parser = ArrayParser::new(b"{a,\0}", EncodingGroup::Utf8);
        parser.next_entry().unwrap();
        parser.next_entry().unwrap();
        assert!(parser.next_entry().is_err());
    }

    #[test]
    fn parses_typed_flat_array() {
        let got: Vec<Option<i32>> = parse_array(EncodingGroup::Utf8, b"{1,2,NULL,4}").unwrap();
        assert_eq!(got, vec![Some(1), Some(2), None, Some(4)]);
    }

    #[test]
    fn parses_empty_array() {
        let got: Vec<i32> = parse_array(EncodingGroup::Utf8, b"{}").unwrap();
        assert_eq!(got, Vec::<i32>::new());
    }

    #[test]
    fn null_element_needs_nullable_type() {
        assert!(parse_array::<i32>(EncodingGroup::Utf8, b"{1,NULL}").is_err());
    }

    #[test]
    fn parses_nested_array() {
        let got: Vec<Vec<i32>> = parse_array(EncodingGroup::Utf8, b"{{1,2},{3,4}}").unwrap();
        assert_eq!(got, vec![vec![1, 2], vec![3, 4]]);
    }

    #[test]
    fn rejects_malformed_arrays() {
        assert!(parse_array::<i32>(EncodingGroup::Utf8, b"").is_err());
        assert!(parse_array::<i32>(EncodingGroup::Utf8, b"1,2").is_err());
        assert!(parse_array::<i32>(EncodingGroup::Utf8, b"{1,2").is_err());
        assert!(parse_array::<i32>(EncodingGroup::Utf8, b"{1,2}x").is_err());
    }

    #[test]
    fn serializes_and_reparses() {
        let values = vec![Some(1i32), Some(2), None, Some(4)];
        let mut out = Vec::new();
        write_array_text(&values, &mut out).unwrap();
        assert_eq!(out, b"{1,2,NULL,4}");
        let back: Vec<Option<i32>> = parse_array(EncodingGroup::Utf8, &out).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn strings_are_quoted_and_escaped() {
        let values = vec!["plain".to_string(), "with \"q\" and \\".to_string()];
        let mut out = Vec::new();
        write_array_text(&values, &mut out).unwrap();
        assert_eq!(out, br#"{"plain","with \"q\" and \\"}"#);
        let back: Vec<String> = parse_array(EncodingGroup::Utf8, &out).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn nested_arrays_round_trip() {
        let values = vec![vec![1i64, 2], vec![3, 4], vec![]];
        let mut out = Vec::new();
        write_array_text(&values, &mut out).unwrap();
        assert_eq!(out, b"{{1,2},{3,4},{}}");
        let back: Vec<Vec<i64>> = parse_array(EncodingGroup::Utf8, &out).unwrap();
        assert_eq!(back, values);
    }

    #[test]
    fn buffered_write_respects_budget() {
        let values = vec![Some(10i32), None];
        let needed = array_copy_budget(&values);
        let mut buf = vec![0u8; needed];
        let written = write_array_into(&mut buf, &values).unwrap();
        assert_eq!(&buf[..written], b"{10,NULL}");

        let mut small = vec![0u8; needed - 1];
        match write_array_into(&mut small, &values) {
            Err(Error::ConversionOverrun { .. }) => {}
            other => panic!("expected overrun, got {other:?}"),
        }
    }
}
