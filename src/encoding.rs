//! Server text encodings and the glyph boundary scanner.
//!
//! Every supported server encoding is a superset of ASCII, but in several of
//! them a byte in the ASCII range can occur as the *trail* byte of a
//! multibyte character. A tab or backslash byte inside such a character is
//! not a field separator or an escape, and treating it as one desynchronizes
//! all downstream parsing. The scanner in this module exists so that every
//! search for an ASCII marker byte can step over whole characters instead of
//! raw bytes.
//!
//! Encodings are registered as data: one table per group describing which
//! lead-byte ranges start a sequence of which length, and which ranges the
//! trail bytes must fall in. A single interpreter walks those tables. The
//! range boundaries are taken verbatim from the PostgreSQL server encoding
//! definitions.

use crate::error::{Error, Result};

/// One glyph's byte range within a buffer: `start..end`, `end` exclusive.
pub type Glyph = core::ops::Range<usize>;

/// The byte-shape family a server encoding belongs to.
///
/// This does not name individual encodings, only the schemes for finding
/// where a character ends and the next may begin. All single-byte encodings
/// (LATIN1, WIN125x, KOI8R, ...) share [`EncodingGroup::Monobyte`].
///
/// The group is fixed per connection and must be captured *before* a COPY
/// operation starts: querying it mid-stream would require an ordinary query,
/// which the COPY sub-protocol forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EncodingGroup {
    /// Any single-byte, ASCII-superset encoding.
    Monobyte,
    Big5,
    EucCn,
    EucJp,
    EucJis2004,
    EucKr,
    EucTw,
    Gb18030,
    Gbk,
    Johab,
    MuleInternal,
    Sjis,
    ShiftJis2004,
    Uhc,
    Utf8,
}

impl EncodingGroup {
    /// Map a PostgreSQL server encoding name to its group.
    ///
    /// See <https://www.postgresql.org/docs/current/multibyte.html>.
    pub fn from_name(encoding_name: &str) -> Result<Self> {
        let group = match encoding_name {
            "BIG5" => Self::Big5,
            "EUC_CN" => Self::EucCn,
            "EUC_JP" => Self::EucJp,
            "EUC_JIS_2004" => Self::EucJis2004,
            "EUC_KR" => Self::EucKr,
            "EUC_TW" => Self::EucTw,
            "GB18030" => Self::Gb18030,
            "GBK" => Self::Gbk,
            "JOHAB" => Self::Johab,
            "MULE_INTERNAL" => Self::MuleInternal,
            "SJIS" => Self::Sjis,
            "SHIFT_JIS_2004" => Self::ShiftJis2004,
            "UHC" => Self::Uhc,
            "UTF8" => Self::Utf8,
            "SQL_ASCII" | "ISO_8859_5" | "ISO_8859_6" | "ISO_8859_7" | "ISO_8859_8" | "KOI8R"
            | "KOI8U" | "LATIN1" | "LATIN2" | "LATIN3" | "LATIN4" | "LATIN5" | "LATIN6"
            | "LATIN7" | "LATIN8" | "LATIN9" | "LATIN10" | "WIN866" | "WIN874" | "WIN1250"
            | "WIN1251" | "WIN1252" | "WIN1253" | "WIN1254" | "WIN1255" | "WIN1256"
            | "WIN1257" | "WIN1258" => Self::Monobyte,
            other => {
                return Err(Error::BadUsageError(format!(
                    "unrecognized encoding '{other}'"
                )));
            }
        };
        Ok(group)
    }

    /// The scanner for this group. Resolve this once per stream; the
    /// encoding cannot change while a COPY operation is in progress.
    pub fn scanner(self) -> &'static GlyphScanner {
        match self {
            Self::Monobyte => &MONOBYTE,
            Self::Big5 => &BIG5,
            Self::EucCn => &EUC_CN,
            Self::EucJp => &EUC_JP,
            Self::EucJis2004 => &EUC_JIS_2004,
            Self::EucKr => &EUC_KR,
            Self::EucTw => &EUC_TW,
            Self::Gb18030 => &GB18030,
            Self::Gbk => &GBK,
            Self::Johab => &JOHAB,
            Self::MuleInternal => &MULE_INTERNAL,
            Self::Sjis => &SJIS,
            Self::ShiftJis2004 => &SHIFT_JIS_2004,
            Self::Uhc => &UHC,
            Self::Utf8 => &UTF8,
        }
    }

    pub fn name(self) -> &'static str {
        self.scanner().name
    }
}

/// Inclusive byte range.
#[derive(Debug, Clone, Copy)]
struct ByteRange {
    lo: u8,
    hi: u8,
}

const fn r(lo: u8, hi: u8) -> ByteRange {
    ByteRange { lo, hi }
}

/// A set of inclusive byte ranges.
type ByteSet = &'static [ByteRange];

fn in_set(set: ByteSet, byte: u8) -> bool {
    set.iter().any(|range| (range.lo..=range.hi).contains(&byte))
}

/// One legal multibyte sequence shape: the lead bytes that start it and the
/// legal range set for each trail byte. Total length is `trails.len() + 1`.
#[derive(Debug)]
struct SeqRule {
    lead: ByteSet,
    trails: &'static [ByteSet],
}

/// Glyph scanner for one encoding group.
///
/// Bytes below `0x80` are always complete single-byte characters. Bytes at
/// or above `0x80` are either listed in `single` (complete one-byte glyphs,
/// e.g. half-width katakana in Shift-JIS) or must start one of the shapes in
/// `rules`, tried in order.
#[derive(Debug)]
pub struct GlyphScanner {
    name: &'static str,
    single: ByteSet,
    rules: &'static [SeqRule],
}

impl GlyphScanner {
    /// Encoding name used in error messages, e.g. `"SJIS"`.
    pub fn encoding_name(&self) -> &'static str {
        self.name
    }

    /// Find the glyph starting at `start`.
    ///
    /// `start` must be at most `buffer.len()`; `start == buffer.len()` means
    /// no glyph remains and yields `Ok(None)`. A truncated sequence or a
    /// trail byte outside its legal range is a [`Error::BadEncoding`]: the
    /// scanner never silently under- or over-consumes bytes.
    pub fn next_glyph(&self, buffer: &[u8], start: usize) -> Result<Option<Glyph>> {
        debug_assert!(start <= buffer.len());
        if start >= buffer.len() {
            return Ok(None);
        }
        let byte1 = buffer[start];
        if byte1 < 0x80 || in_set(self.single, byte1) {
            return Ok(Some(start..start + 1));
        }

        // Multibyte lead byte. Shapes sharing a lead range are disambiguated
        // by their trail bytes; the first fully matching shape wins.
        let avail = buffer.len() - start - 1;
        let mut best: Option<(usize, usize)> = None;
        for rule in self.rules {
            if !in_set(rule.lead, byte1) {
                continue;
            }
            let mut matched = 0usize;
            for (i, set) in rule.trails.iter().copied().enumerate() {
                if i >= avail || !in_set(set, buffer[start + 1 + i]) {
                    break;
                }
                matched += 1;
            }
            let len = rule.trails.len() + 1;
            if matched == rule.trails.len() {
                return Ok(Some(start..start + len));
            }
            match best {
                Some((_, m)) if m >= matched => {}
                _ => best = Some((len, matched)),
            }
        }

        let remaining = buffer.len() - start;
        Err(match best {
            // No shape starts with this byte.
            None => self.bad_sequence(buffer, start, 1),
            Some((len, matched)) => {
                if remaining < len && matched == remaining - 1 {
                    // The buffer ends partway through the sequence.
                    self.bad_sequence(buffer, start, remaining)
                } else {
                    self.bad_sequence(buffer, start, len.min(remaining))
                }
            }
        })
    }

    /// Find the first occurrence of any of the ASCII bytes in `needles`.
    ///
    /// Steps glyph by glyph: a needle byte only matches when it forms a
    /// complete single-byte glyph, never when it is a trail byte of a
    /// multibyte character. Returns `haystack.len()` when there is no match.
    pub fn find_ascii_char(&self, haystack: &[u8], needles: &[u8], start: usize) -> Result<usize> {
        let mut here = start;
        while here < haystack.len() {
            let end = match self.next_glyph(haystack, here)? {
                Some(glyph) => glyph.end,
                None => break,
            };
            // Check the cheap filter first; almost no byte is a needle.
            if needles.contains(&haystack[here]) && end == here + 1 {
                return Ok(here);
            }
            here = end;
        }
        Ok(haystack.len())
    }

    /// Iterate over the glyphs in `buffer` starting at `start`.
    ///
    /// Yields nothing for an empty buffer, and can be restarted from any
    /// valid glyph boundary.
    pub fn glyphs<'a>(&'a self, buffer: &'a [u8], start: usize) -> Glyphs<'a> {
        Glyphs {
            scanner: self,
            buffer,
            pos: start,
            done: false,
        }
    }

    fn bad_sequence(&self, buffer: &[u8], start: usize, count: usize) -> Error {
        Error::BadEncoding {
            encoding: self.name,
            offset: start,
            bytes: buffer[start..start + count].to_vec(),
        }
    }
}

/// Iterator over a buffer's glyphs. Stops after yielding an error.
#[derive(Debug)]
pub struct Glyphs<'a> {
    scanner: &'a GlyphScanner,
    buffer: &'a [u8],
    pos: usize,
    done: bool,
}

impl Iterator for Glyphs<'_> {
    type Item = Result<Glyph>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.scanner.next_glyph(self.buffer, self.pos) {
            Ok(Some(glyph)) => {
                self.pos = glyph.end;
                Some(Ok(glyph))
            }
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}

static MONOBYTE: GlyphScanner = GlyphScanner {
    name: "MONOBYTE",
    single: &[r(0x80, 0xff)],
    rules: &[],
};

// https://en.wikipedia.org/wiki/Big5#Organization
static BIG5: GlyphScanner = GlyphScanner {
    name: "BIG5",
    single: &[],
    rules: &[SeqRule {
        lead: &[r(0x81, 0xfe)],
        trails: &[&[r(0x40, 0x7e), r(0xa1, 0xfe)]],
    }],
};

// The PostgreSQL documentation claims the EUC_* encodings are 1-3 bytes
// each, but the EUC sets contain 1-(2,3,4) bytes depending on the specific
// extension:
//     EUC_CN      : 1-2
//     EUC_JP      : 1-3
//     EUC_JIS_2004: 1-2
//     EUC_KR      : 1-2
//     EUC_TW      : 1-4

// https://en.wikipedia.org/wiki/GB_2312#EUC-CN
static EUC_CN: GlyphScanner = GlyphScanner {
    name: "EUC_CN",
    single: &[],
    rules: &[SeqRule {
        lead: &[r(0xa1, 0xf7)],
        trails: &[&[r(0xa1, 0xfe)]],
    }],
};

// EUC-JP and EUC-JIS-2004 represent slightly different code points but
// iterate the same.
// https://en.wikipedia.org/wiki/Extended_Unix_Code#EUC-JP
const EUC_JP_RULES: &[SeqRule] = &[
    SeqRule {
        lead: &[r(0x8e, 0x8e)],
        trails: &[&[r(0xa1, 0xfe)]],
    },
    SeqRule {
        lead: &[r(0xa1, 0xfe)],
        trails: &[&[r(0xa1, 0xfe)]],
    },
    SeqRule {
        lead: &[r(0x8f, 0x8f)],
        trails: &[&[r(0xa1, 0xfe)], &[r(0xa1, 0xfe)]],
    },
];

static EUC_JP: GlyphScanner = GlyphScanner {
    name: "EUC_JP",
    single: &[],
    rules: EUC_JP_RULES,
};

static EUC_JIS_2004: GlyphScanner = GlyphScanner {
    name: "EUC_JIS_2004",
    single: &[],
    rules: EUC_JP_RULES,
};

// https://en.wikipedia.org/wiki/Extended_Unix_Code#EUC-KR
static EUC_KR: GlyphScanner = GlyphScanner {
    name: "EUC_KR",
    single: &[],
    rules: &[SeqRule {
        lead: &[r(0xa1, 0xfe)],
        trails: &[&[r(0xa1, 0xfe)]],
    }],
};

// https://en.wikipedia.org/wiki/Extended_Unix_Code#EUC-TW
static EUC_TW: GlyphScanner = GlyphScanner {
    name: "EUC_TW",
    single: &[],
    rules: &[
        SeqRule {
            lead: &[r(0xa1, 0xfe)],
            trails: &[&[r(0xa1, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0x8e, 0x8e)],
            trails: &[&[r(0xa1, 0xb0)], &[r(0xa1, 0xfe)], &[r(0xa1, 0xfe)]],
        },
    ],
};

// https://en.wikipedia.org/wiki/GB_18030#Mapping
static GB18030: GlyphScanner = GlyphScanner {
    name: "GB18030",
    single: &[r(0x80, 0x80), r(0xff, 0xff)],
    rules: &[
        SeqRule {
            lead: &[r(0x81, 0xfe)],
            trails: &[&[r(0x40, 0x7e), r(0x80, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0x81, 0xfe)],
            trails: &[&[r(0x30, 0x39)], &[r(0x81, 0xfe)], &[r(0x30, 0x39)]],
        },
    ],
};

// https://en.wikipedia.org/wiki/GBK_(character_encoding)#Encoding
static GBK: GlyphScanner = GlyphScanner {
    name: "GBK",
    single: &[],
    rules: &[
        SeqRule {
            lead: &[r(0xa1, 0xa9)],
            trails: &[&[r(0xa1, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0xb0, 0xf7)],
            trails: &[&[r(0xa1, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0x81, 0xa0)],
            trails: &[&[r(0x40, 0x7e), r(0x80, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0xaa, 0xfe)],
            trails: &[&[r(0x40, 0x7e), r(0x80, 0xa0)]],
        },
        SeqRule {
            lead: &[r(0xa8, 0xa9)],
            trails: &[&[r(0x40, 0x7e), r(0x80, 0xa0)]],
        },
        SeqRule {
            lead: &[r(0xaa, 0xaf)],
            trails: &[&[r(0xa1, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0xf8, 0xfe)],
            trails: &[&[r(0xa1, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0xa1, 0xa7)],
            trails: &[&[r(0x40, 0x7e), r(0x80, 0xa0)]],
        },
    ],
};

// The PostgreSQL documentation claims JOHAB is 1-3 bytes, but the Hangul
// portion is "three five-bit segments" inside 16 bits (2 bytes).
// CJKV Information Processing by Ken Lunde, pg. 269
static JOHAB: GlyphScanner = GlyphScanner {
    name: "JOHAB",
    single: &[],
    rules: &[
        SeqRule {
            lead: &[r(0x84, 0xd3)],
            trails: &[&[r(0x41, 0x7e), r(0x81, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0xd8, 0xde), r(0xe0, 0xf9)],
            trails: &[&[r(0x31, 0x7e), r(0x91, 0xfe)]],
        },
    ],
};

// PostgreSQL's MULE_INTERNAL is the emacs rather than Xemacs implementation;
// see the server/mb/pg_wchar.h PostgreSQL header file.
static MULE_INTERNAL: GlyphScanner = GlyphScanner {
    name: "MULE_INTERNAL",
    single: &[],
    rules: &[
        SeqRule {
            lead: &[r(0x81, 0x8d)],
            trails: &[&[r(0xa0, 0xff)]],
        },
        SeqRule {
            lead: &[r(0x9a, 0x9a)],
            trails: &[&[r(0xa0, 0xdf)], &[r(0xa0, 0xff)]],
        },
        SeqRule {
            lead: &[r(0x9b, 0x9b)],
            trails: &[&[r(0xe0, 0xef)], &[r(0xa0, 0xff)]],
        },
        SeqRule {
            lead: &[r(0x90, 0x99)],
            trails: &[&[r(0xa0, 0xff)], &[r(0xa0, 0xff)]],
        },
        SeqRule {
            lead: &[r(0x9c, 0x9c)],
            trails: &[&[r(0xf0, 0xf4)], &[r(0xa0, 0xff)], &[r(0xa0, 0xff)]],
        },
        SeqRule {
            lead: &[r(0x9d, 0x9d)],
            trails: &[&[r(0xf5, 0xfe)], &[r(0xa0, 0xff)], &[r(0xa0, 0xff)]],
        },
    ],
};

// For the purposes of iterating, the only difference between SJIS and
// SJIS-2004 is increased range in the first byte of two-byte sequences
// (0xEF increased to 0xFC). The version of SJIS used by Postgres has the
// same range as SJIS-2004.
// https://en.wikipedia.org/wiki/Shift_JIS#Shift_JIS_byte_map
const SJIS_RULES: &[SeqRule] = &[SeqRule {
    lead: &[r(0x81, 0x9f), r(0xe0, 0xfc)],
    trails: &[&[r(0x40, 0x7e), r(0x80, 0xfc)]],
}];

static SJIS: GlyphScanner = GlyphScanner {
    name: "SJIS",
    single: &[r(0xa1, 0xdf)],
    rules: SJIS_RULES,
};

static SHIFT_JIS_2004: GlyphScanner = GlyphScanner {
    name: "SHIFT_JIS_2004",
    single: &[r(0xa1, 0xdf)],
    rules: SJIS_RULES,
};

// https://en.wikipedia.org/wiki/Unified_Hangul_Code
static UHC: GlyphScanner = GlyphScanner {
    name: "UHC",
    single: &[],
    rules: &[
        SeqRule {
            lead: &[r(0x80, 0xc6)],
            trails: &[&[r(0x41, 0x5a), r(0x61, 0x7a), r(0x80, 0xfe)]],
        },
        SeqRule {
            lead: &[r(0xa1, 0xfe)],
            trails: &[&[r(0xa1, 0xfe)]],
        },
    ],
};

// https://en.wikipedia.org/wiki/UTF-8#Description
static UTF8: GlyphScanner = GlyphScanner {
    name: "UTF8",
    single: &[],
    rules: &[
        SeqRule {
            lead: &[r(0xc0, 0xdf)],
            trails: &[&[r(0x80, 0xbf)]],
        },
        SeqRule {
            lead: &[r(0xe0, 0xef)],
            trails: &[&[r(0x80, 0xbf)], &[r(0x80, 0xbf)]],
        },
        SeqRule {
            lead: &[r(0xf0, 0xf7)],
            trails: &[&[r(0x80, 0xbf)], &[r(0x80, 0xbf)], &[r(0x80, 0xbf)]],
        },
    ],
};

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    const ALL_GROUPS: [EncodingGroup; 15] = [
        EncodingGroup::Monobyte,
        EncodingGroup::Big5,
        EncodingGroup::EucCn,
        EncodingGroup::EucJp,
        EncodingGroup::EucJis2004,
        EncodingGroup::EucKr,
        EncodingGroup::EucTw,
        EncodingGroup::Gb18030,
        EncodingGroup::Gbk,
        EncodingGroup::Johab,
        EncodingGroup::MuleInternal,
        EncodingGroup::Sjis,
        EncodingGroup::ShiftJis2004,
        EncodingGroup::Uhc,
        EncodingGroup::Utf8,
    ];

    /// Walk `buffer` and assert the glyphs tile it exactly: contiguous,
    /// non-overlapping, never empty.
    fn assert_tiles(group: EncodingGroup, buffer: &[u8]) {
        let scanner = group.scanner();
        let mut pos = 0;
        while let Some(glyph) = scanner.next_glyph(buffer, pos).unwrap() {
            assert_eq!(glyph.start, pos);
            assert!(glyph.end > glyph.start);
            pos = glyph.end;
        }
        assert_eq!(pos, buffer.len());
    }

    #[test]
    fn ascii_tiles_in_every_group() {
        for group in ALL_GROUPS {
            assert_tiles(group, b"");
            assert_tiles(group, b"hello, world\t\\n");
        }
    }

    #[test]
    fn utf8_tiling() {
        // "a", U+00E9 (2 bytes), U+3042 (3 bytes), U+1F600 (4 bytes), "z"
        let buf = b"a\xc3\xa9\xe3\x81\x82\xf0\x9f\x98\x80z";
        assert_tiles(EncodingGroup::Utf8, buf);
        let scanner = EncodingGroup::Utf8.scanner();
        assert_eq!(scanner.next_glyph(buf, 1).unwrap(), Some(1..3));
        assert_eq!(scanner.next_glyph(buf, 3).unwrap(), Some(3..6));
        assert_eq!(scanner.next_glyph(buf, 6).unwrap(), Some(6..10));
        assert_eq!(scanner.next_glyph(buf, 11).unwrap(), None);
    }

    #[test]
    fn sjis_single_byte_katakana() {
        // 0xB1 is half-width katakana: a complete one-byte character.
        let scanner = EncodingGroup::Sjis.scanner();
        assert_eq!(scanner.next_glyph(b"\xb1", 0).unwrap(), Some(0..1));
        // 0x81 starts a two-byte sequence.
        assert_eq!(scanner.next_glyph(b"\x81\x40", 0).unwrap(), Some(0..2));
    }

    #[test]
    fn gb18030_shapes() {
        let scanner = EncodingGroup::Gb18030.scanner();
        // 0x80 and 0xFF are complete single-byte characters.
        assert_eq!(scanner.next_glyph(b"\x80", 0).unwrap(), Some(0..1));
        assert_eq!(scanner.next_glyph(b"\xff", 0).unwrap(), Some(0..1));
        // Two-byte form.
        assert_eq!(scanner.next_glyph(b"\x81\x40", 0).unwrap(), Some(0..2));
        // Four-byte form: lead, digit, 0x81-0xFE, digit.
        assert_eq!(
            scanner.next_glyph(b"\x81\x30\x81\x30", 0).unwrap(),
            Some(0..4)
        );
        // 0x7F is never a valid second byte.
        assert!(scanner.next_glyph(b"\x81\x7f\x81\x30", 0).is_err());
    }

    #[test]
    fn euc_tw_four_byte_form() {
        let scanner = EncodingGroup::EucTw.scanner();
        assert_eq!(
            scanner.next_glyph(b"\x8e\xa1\xa1\xa1", 0).unwrap(),
            Some(0..4)
        );
        assert_eq!(scanner.next_glyph(b"\xa1\xa1", 0).unwrap(), Some(0..2));
        assert!(scanner.next_glyph(b"\x8e\xb1\xa1\xa1", 0).is_err());
    }

    #[test]
    fn truncated_sequences_are_rejected_everywhere() {
        // For each multibyte group, a valid lead byte with the buffer ending
        // right after it must raise an encoding error, never a short glyph.
        let cases: &[(EncodingGroup, &[u8])] = &[
            (EncodingGroup::Big5, b"\x81"),
            (EncodingGroup::EucCn, b"\xa1"),
            (EncodingGroup::EucJp, b"\x8f\xa1"),
            (EncodingGroup::EucKr, b"\xa1"),
            (EncodingGroup::EucTw, b"\x8e\xa1\xa1"),
            (EncodingGroup::Gb18030, b"\x81\x30\x81"),
            (EncodingGroup::Gbk, b"\x81"),
            (EncodingGroup::Johab, b"\x84"),
            (EncodingGroup::MuleInternal, b"\x9c\xf0\xa0"),
            (EncodingGroup::Sjis, b"\xe0"),
            (EncodingGroup::ShiftJis2004, b"\xe0"),
            (EncodingGroup::Uhc, b"\xa1"),
            (EncodingGroup::Utf8, b"\xe3\x81"),
        ];
        for (group, buf) in cases {
            let err = group.scanner().next_glyph(buf, 0).unwrap_err();
            assert!(
                matches!(err, Error::BadEncoding { .. }),
                "{}: {err}",
                group.name()
            );
        }
    }

    #[test]
    fn bad_trail_byte_reports_encoding_and_offset() {
        let err = EncodingGroup::Utf8
            .scanner()
            .next_glyph(b"ab\xc3\x28", 2)
            .unwrap_err();
        match err {
            Error::BadEncoding {
                encoding,
                offset,
                bytes,
            } => {
                assert_eq!(encoding, "UTF8");
                assert_eq!(offset, 2);
                assert_eq!(bytes, vec![0xc3, 0x28]);
            }
            other => panic!("expected BadEncoding, got {other}"),
        }
    }

    #[test]
    fn find_ascii_char_skips_trail_bytes() {
        // In SJIS, 0x5C (ASCII backslash) is a legal trail byte. A search
        // for backslash must not match inside the character 0x81 0x5C, but
        // must find the genuine backslash that follows.
        let scanner = EncodingGroup::Sjis.scanner();
        let haystack = b"a\x81\x5cb\\c";
        assert_eq!(scanner.find_ascii_char(haystack, b"\\", 0).unwrap(), 4);

        // Same trap in Big5 and GBK.
        let scanner = EncodingGroup::Big5.scanner();
        let haystack = b"\xa4\x5c\\";
        assert_eq!(scanner.find_ascii_char(haystack, b"\\", 0).unwrap(), 2);

        let scanner = EncodingGroup::Gbk.scanner();
        let haystack = b"\x81\x5c\x82\x5c\\x";
        assert_eq!(scanner.find_ascii_char(haystack, b"\\", 0).unwrap(), 4);
    }

    #[test]
    fn find_ascii_char_returns_len_when_absent() {
        let scanner = EncodingGroup::Utf8.scanner();
        assert_eq!(scanner.find_ascii_char(b"hello", b"\t\\", 0).unwrap(), 5);
        assert_eq!(scanner.find_ascii_char(b"", b"\t", 0).unwrap(), 0);
    }

    #[test]
    fn find_ascii_char_finds_first_of_several_needles() {
        let scanner = EncodingGroup::Monobyte.scanner();
        assert_eq!(scanner.find_ascii_char(b"ab\tc\\d", b"\t\\", 0).unwrap(), 2);
        assert_eq!(scanner.find_ascii_char(b"ab\tc\\d", b"\t\\", 3).unwrap(), 4);
    }

    #[test]
    fn glyphs_iterator_tiles_and_restarts() {
        let scanner = EncodingGroup::Utf8.scanner();
        let buf = b"a\xc3\xa9b";
        let all: Vec<Glyph> = scanner.glyphs(buf, 0).map(|g| g.unwrap()).collect();
        assert_eq!(all, vec![0..1, 1..3, 3..4]);
        let tail: Vec<Glyph> = scanner.glyphs(buf, 1).map(|g| g.unwrap()).collect();
        assert_eq!(tail, vec![1..3, 3..4]);
        assert_eq!(scanner.glyphs(b"", 0).count(), 0);
    }

    #[test]
    fn glyphs_iterator_stops_after_error() {
        let scanner = EncodingGroup::Utf8.scanner();
        let mut iter = scanner.glyphs(b"a\xc3", 0);
        assert!(iter.next().unwrap().is_ok());
        assert!(iter.next().unwrap().is_err());
        assert!(iter.next().is_none());
    }

    #[test]
    fn encoding_names_resolve_to_groups() {
        assert_eq!(
            EncodingGroup::from_name("UTF8").unwrap(),
            EncodingGroup::Utf8
        );
        assert_eq!(
            EncodingGroup::from_name("LATIN5").unwrap(),
            EncodingGroup::Monobyte
        );
        assert_eq!(
            EncodingGroup::from_name("WIN1252").unwrap(),
            EncodingGroup::Monobyte
        );
        assert_eq!(
            EncodingGroup::from_name("SHIFT_JIS_2004").unwrap(),
            EncodingGroup::ShiftJis2004
        );
        assert!(EncodingGroup::from_name("EBCDIC").is_err());
    }
}
