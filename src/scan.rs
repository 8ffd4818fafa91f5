//! Scanning primitives shared by the array and composite-type grammars.
//!
//! The backend double-quotes strings in composites and arrays when needed,
//! escaping special characters with backslashes. Older output may instead
//! use single quotes with doubling. Both grammars also contain unquoted
//! runs terminated by a separator or closing delimiter. All scanning here
//! steps over whole glyphs so that quote and separator bytes hiding inside
//! multibyte characters are never misread.

use crate::encoding::GlyphScanner;
use crate::error::{Error, Result};

/// Find the end of a double-quoted string.
///
/// `input[pos]` must be the opening double quote. Handles both escape
/// conventions: backslash (`\"`, `\\`) and doubled quotes (`""`). Returns
/// the offset of the first position after the closing quote.
pub fn scan_double_quoted_string(
    scanner: &GlyphScanner,
    input: &[u8],
    pos: usize,
) -> Result<usize> {
    debug_assert_eq!(input.get(pos), Some(&b'"'));
    let mut at_quote = false;
    let mut here = glyph_end(scanner, input, pos)?;
    while here < input.len() {
        let next = glyph_end(scanner, input, here)?;
        if at_quote {
            if next - here == 1 && input[here] == b'"' {
                // A pair of double quotes: one escaped quote. Carry on.
                at_quote = false;
            } else {
                // The previous quote was the closing one, and this is the
                // position right after it.
                return Ok(here);
            }
        } else if next - here == 1 {
            match input[here] {
                b'\\' => {
                    // Backslash escape. Skip one more glyph.
                    here = next;
                    here = glyph_end(scanner, input, here)?;
                    continue;
                }
                b'"' => {
                    // Either the closing quote, or the first of a pair.
                    at_quote = true;
                }
                _ => {}
            }
        }
        here = next;
    }
    if at_quote {
        // The final quote closed the string at end of input.
        Ok(input.len())
    } else {
        Err(Error::ConversionError(format!(
            "Missing closing double-quote: {}",
            String::from_utf8_lossy(input)
        )))
    }
}

/// Un-quote and un-escape a double-quoted string.
///
/// `pos` points at the opening quote, `end` one past the closing quote (as
/// returned by [`scan_double_quoted_string`]).
pub fn parse_double_quoted_string(
    scanner: &GlyphScanner,
    input: &[u8],
    end: usize,
    pos: usize,
) -> Result<Vec<u8>> {
    // Maximum output size is the input size minus the surrounding quotes.
    // In the extreme opposite case the real number could be half that.
    // Usually it's a close estimate.
    let mut output = Vec::with_capacity(end.saturating_sub(pos + 2));

    let mut here = glyph_end(scanner, input, pos)?;
    while here < end - 1 {
        let mut next = glyph_end(scanner, input, here)?;
        // A backslash here is always an escape, and so is a double quote
        // since we're inside the quoted string. Drop the escape character
        // and take the one that follows.
        if next - here == 1 && (input[here] == b'\\' || input[here] == b'"') {
            here = next;
            next = glyph_end(scanner, input, here)?;
        }
        output.extend_from_slice(&input[here..next]);
        here = next;
    }
    Ok(output)
}

/// Find the end of a single-quoted string.
///
/// Legacy quoting: single quotes are escaped by doubling (`''`), and
/// backslash escapes are also accepted. Returns the offset one past the
/// closing quote.
pub fn scan_single_quoted_string(
    scanner: &GlyphScanner,
    input: &[u8],
    pos: usize,
) -> Result<usize> {
    debug_assert_eq!(input.get(pos), Some(&b'\''));
    let mut here = glyph_end(scanner, input, pos)?;
    while here < input.len() {
        let next = glyph_end(scanner, input, here)?;
        if next - here == 1 {
            match input[here] {
                b'\'' => {
                    // Either the closing quote or the first of a doubled
                    // pair. Look at the next character to tell.
                    here = next;
                    if here >= input.len() {
                        return Ok(here);
                    }
                    let after = glyph_end(scanner, input, here)?;
                    if after - here > 1 || input[here] != b'\'' {
                        // Not an escaped quote: first character outside the
                        // string.
                        return Ok(here);
                    }
                    // An escaped quote. Keep going.
                    here = after;
                    continue;
                }
                b'\\' => {
                    // Backslash escape. Skip one more glyph.
                    here = glyph_end(scanner, input, next)?;
                    continue;
                }
                _ => {}
            }
        }
        here = next;
    }
    Err(Error::ConversionError(format!(
        "Missing closing single-quote: {}",
        String::from_utf8_lossy(input)
    )))
}

/// Un-quote and un-escape a single-quoted string.
pub fn parse_single_quoted_string(
    scanner: &GlyphScanner,
    input: &[u8],
    end: usize,
    pos: usize,
) -> Result<Vec<u8>> {
    let mut output = Vec::with_capacity(end.saturating_sub(pos + 2));

    let mut here = glyph_end(scanner, input, pos)?;
    while here < end - 1 {
        let mut next = glyph_end(scanner, input, here)?;
        if next - here == 1 && (input[here] == b'\'' || input[here] == b'\\') {
            here = next;
            next = glyph_end(scanner, input, here)?;
        }
        output.extend_from_slice(&input[here..next]);
        here = next;
    }
    Ok(output)
}

/// Find the end of an unquoted string.
///
/// Stops at the end of the input, or at the first *unescaped, single-byte*
/// occurrence of any byte in `stops`. For arrays, `stops` is the element
/// separator plus the closing brace; for composites, a comma or closing
/// parenthesis/bracket.
pub fn scan_unquoted_string(
    scanner: &GlyphScanner,
    input: &[u8],
    pos: usize,
    stops: &[u8],
) -> Result<usize> {
    scanner.find_ascii_char(input, stops, pos)
}

fn glyph_end(scanner: &GlyphScanner, input: &[u8], pos: usize) -> Result<usize> {
    match scanner.next_glyph(input, pos)? {
        Some(glyph) => Ok(glyph.end),
        None => Ok(pos),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::encoding::EncodingGroup;

    fn utf8() -> &'static GlyphScanner {
        EncodingGroup::Utf8.scanner()
    }

    #[test]
    fn scans_plain_double_quoted_string() {
        let input = b"\"hello\",rest";
        let end = scan_double_quoted_string(utf8(), input, 0).unwrap();
        assert_eq!(end, 7);
        let text = parse_double_quoted_string(utf8(), input, end, 0).unwrap();
        assert_eq!(text, b"hello");
    }

    #[test]
    fn handles_backslash_escapes() {
        let input = br#""a\"b\\c""#;
        let end = scan_double_quoted_string(utf8(), input, 0).unwrap();
        assert_eq!(end, input.len());
        let text = parse_double_quoted_string(utf8(), input, end, 0).unwrap();
        assert_eq!(text, br#"a"b\c"#);
    }

    #[test]
    fn handles_doubled_quote_escapes() {
        let input = br#""say ""hi""""#;
        let end = scan_double_quoted_string(utf8(), input, 0).unwrap();
        assert_eq!(end, input.len());
        let text = parse_double_quoted_string(utf8(), input, end, 0).unwrap();
        assert_eq!(text, br#"say "hi""#);
    }

    #[test]
    fn unterminated_double_quote_is_an_error() {
        assert!(scan_double_quoted_string(utf8(), b"\"oops", 0).is_err());
    }

    #[test]
    fn quote_bytes_inside_multibyte_characters_are_not_quotes() {
        // In SJIS, 0x81 0x22 would be an illegal sequence, but 0x81 0x5C is
        // a real character whose trail byte is the backslash. It must not
        // eat the character after it as an escape.
        let scanner = EncodingGroup::Sjis.scanner();
        let input = b"\"\x81\x5c\"";
        let end = scan_double_quoted_string(scanner, input, 0).unwrap();
        assert_eq!(end, input.len());
        let text = parse_double_quoted_string(scanner, input, end, 0).unwrap();
        assert_eq!(text, b"\x81\x5c");
    }

    #[test]
    fn scans_single_quoted_string() {
        let input = b"'it''s',next";
        let end = scan_single_quoted_string(utf8(), input, 0).unwrap();
        assert_eq!(end, 7);
        let text = parse_single_quoted_string(utf8(), input, end, 0).unwrap();
        assert_eq!(text, b"it's");
    }

    #[test]
    fn unquoted_scan_stops_at_separator_or_end() {
        let input = b"12345,67";
        assert_eq!(
            scan_unquoted_string(utf8(), input, 0, b",}").unwrap(),
            5
        );
        assert_eq!(
            scan_unquoted_string(utf8(), b"12345", 0, b",}").unwrap(),
            5
        );
    }
}
