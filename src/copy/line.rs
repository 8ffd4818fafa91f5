//! Codec for one line of COPY text wire format.
//!
//! A line is one row: fields separated by tab, SQL null spelled `\N`, and
//! the control characters that could be mistaken for wire syntax carried as
//! backslash escapes. Both directions are encoding-aware: a tab or
//! backslash byte that is really the trail byte of a multibyte character is
//! passed through untouched.

use crate::encoding::GlyphScanner;
use crate::error::{Error, Result, eyre};
use crate::row::{FieldSpan, RowBuffer};

/// Bytes that must travel as backslash escapes on the wire.
pub(crate) const ESCAPE_TARGETS: &[u8] = b"\x08\x0c\n\r\t\x0b\\";

/// Decode one raw COPY line into `row`.
///
/// Single pass. The unescape buffer is sized once, up front, before any
/// field span is recorded; unescaping only shrinks text, so the buffer
/// never reallocates underneath the spans.
///
/// Escape handling follows the wire format: `\N` alone in a field is SQL
/// null, `\b \f \n \r \t \v \\` map to their control bytes, and any other
/// escaped byte is kept as itself with the backslash dropped. That last
/// tolerance is deliberately more permissive than the documented COPY
/// format; the server is not known to emit such sequences.
pub fn decode_copy_line(scanner: &GlyphScanner, line: &[u8], row: &mut RowBuffer) -> Result<()> {
    if line.len() >= usize::MAX / 2 {
        return Err(Error::BadCopyFormat(
            "Stream produced a ridiculously long line.".to_string(),
        ));
    }

    row.text.clear();
    row.fields.clear();
    row.text.reserve(line.len() + 1);

    // Start of the current field in the unescape buffer; `None` once the
    // field was marked null.
    let mut field_begin: Option<usize> = Some(0);
    let mut read = 0;
    while read < line.len() {
        let Some(glyph) = scanner.next_glyph(line, read)? else {
            break;
        };
        if glyph.end - read == 1 {
            let c = line[read];
            read += 1;
            match c {
                b'\t' => end_field(row, &mut field_begin),
                b'\\' => {
                    if read >= line.len() {
                        return Err(Error::BadCopyFormat("Row ends in backslash".to_string()));
                    }
                    let escaped = line[read];
                    read += 1;
                    match escaped {
                        b'N' => match field_begin {
                            Some(begin) if row.text.len() == begin => field_begin = None,
                            _ => {
                                return Err(Error::BadCopyFormat(
                                    "Null sequence found in nonempty field".to_string(),
                                ));
                            }
                        },
                        b'b' => append(row, field_begin, 0x08)?,
                        b'f' => append(row, field_begin, 0x0c)?,
                        b'n' => append(row, field_begin, b'\n')?,
                        b'r' => append(row, field_begin, b'\r')?,
                        b't' => append(row, field_begin, b'\t')?,
                        b'v' => append(row, field_begin, 0x0b)?,
                        // Self-escaped: keep the byte, drop the backslash.
                        other => append(row, field_begin, other)?,
                    }
                }
                other => append(row, field_begin, other)?,
            }
        } else {
            // Multibyte character. Never treated specially; copy verbatim.
            if field_begin.is_none() {
                return Err(Error::BadCopyFormat(
                    "Data found after null marker in field".to_string(),
                ));
            }
            row.text.extend_from_slice(&line[glyph.start..glyph.end]);
            read = glyph.end;
        }
    }

    // End-of-line closes the last field like a tab would.
    end_field(row, &mut field_begin);
    Ok(())
}

fn append(row: &mut RowBuffer, field_begin: Option<usize>, byte: u8) -> Result<()> {
    if field_begin.is_none() {
        return Err(Error::BadCopyFormat(
            "Data found after null marker in field".to_string(),
        ));
    }
    row.text.push(byte);
    Ok(())
}

fn end_field(row: &mut RowBuffer, field_begin: &mut Option<usize>) {
    match *field_begin {
        Some(start) => row.fields.push(Some(FieldSpan {
            start,
            len: row.text.len() - start,
        })),
        None => row.fields.push(None),
    }
    *field_begin = Some(row.text.len());
}

/// The escape letter for a byte in [`ESCAPE_TARGETS`].
fn escape_char(special: u8) -> Result<u8> {
    Ok(match special {
        0x08 => b'b',
        0x0c => b'f',
        b'\n' => b'n',
        b'\r' => b'r',
        b'\t' => b't',
        0x0b => b'v',
        b'\\' => b'\\',
        other => {
            // The finder only stops on the fixed escape set; anything else
            // means the scanner and this table disagree.
            return Err(Error::LibraryBug(eyre!(
                "Stream escaping unexpectedly stopped at '{other}'"
            )));
        }
    })
}

/// Escape one field's text onto `out`, followed by a tab terminator.
///
/// The caller strips the final field's trailing tab before transmitting the
/// line; the wire format has no separator after the last field.
pub fn escape_field_into(scanner: &GlyphScanner, data: &[u8], out: &mut Vec<u8>) -> Result<()> {
    let mut here = 0;
    while here < data.len() {
        let stop = scanner.find_ascii_char(data, ESCAPE_TARGETS, here)?;
        // Copy the unremarkable run we just skipped over.
        out.extend_from_slice(&data[here..stop]);
        if stop < data.len() {
            out.push(b'\\');
            out.push(escape_char(data[stop])?);
        }
        here = stop + 1;
    }
    out.push(b'\t');
    Ok(())
}

/// Write an SQL null field: the literal `\N`, tab-terminated.
pub fn write_null_field(out: &mut Vec<u8>) {
    out.extend_from_slice(b"\\N\t");
}
