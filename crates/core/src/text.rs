//! Script text decoding.

use encoding_rs::SHIFT_JIS;
use serde::{Deserialize, Serialize};

use crate::cursor::Cursor;
use crate::error::{VnError, VnResult};

/// Escape lead byte used by the Ever17 scripts for a few non-JIS glyphs.
const EVER17_ESCAPE: u8 = 0x87;

/// True for bytes that may appear inside a text run.
pub fn is_text_byte(b: u8) -> bool {
    b >= 0x20 || b == b'\n' || b == b'\t'
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextCodec {
    /// Shift-JIS with the `0x87 J/K/L` escapes.
    Ever17,
    /// Plain Shift-JIS.
    Never7,
}

impl TextCodec {
    /// Reads text bytes up to the first non-text byte.
    ///
    /// Returns the decoded string and the terminator, which is consumed.
    pub fn read_string(self, cursor: &mut Cursor) -> VnResult<(String, u8)> {
        let start = cursor.pos();
        let mut out = String::new();
        let mut pending = Vec::new();
        loop {
            let b = cursor.read_u8()?;
            if !is_text_byte(b) {
                flush(&mut out, &mut pending, start)?;
                return Ok((out, b));
            }
            if self == TextCodec::Ever17 && b == EVER17_ESCAPE {
                let follow = cursor.read_u8()?;
                if !is_text_byte(follow) {
                    cursor.seek_back(2)?;
                    return Err(decode_error(
                        cursor.pos(),
                        format!("escape followed by non-text byte {follow:#04x}"),
                    ));
                }
                let glyph = match follow {
                    b'J' => '\u{f6}',
                    b'K' => '\u{fc}',
                    b'L' => '\u{2015}',
                    other => {
                        return Err(decode_error(
                            cursor.pos() - 2,
                            format!("unknown escape sequence 87 {other:02x}"),
                        ))
                    }
                };
                flush(&mut out, &mut pending, start)?;
                out.push(glyph);
                continue;
            }
            pending.push(b);
        }
    }

    /// Like [`TextCodec::read_string`] but requires a specific terminator.
    pub fn read_string_fixedterm(self, cursor: &mut Cursor, term: u8) -> VnResult<String> {
        let (text, found) = self.read_string(cursor)?;
        if found != term {
            return Err(VnError::InvalidData {
                offset: cursor.pos() - 1,
                message: format!(
                    "text {text:?} ended with {found:#04x} instead of {term:#04x}"
                ),
            });
        }
        Ok(text)
    }
}

fn flush(out: &mut String, pending: &mut Vec<u8>, start: usize) -> VnResult<()> {
    if pending.is_empty() {
        return Ok(());
    }
    let decoded = SHIFT_JIS
        .decode_without_bom_handling_and_without_replacement(pending)
        .ok_or_else(|| decode_error(start, format!("invalid Shift-JIS {pending:02x?}")))?;
    out.push_str(&decoded);
    pending.clear();
    Ok(())
}

/// Decodes a Shift-JIS byte string, as stored in filename tables.
pub fn decode_sjis(bytes: &[u8], offset: usize) -> VnResult<String> {
    SHIFT_JIS
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
        .ok_or_else(|| decode_error(offset, format!("invalid Shift-JIS {bytes:02x?}")))
}

#[cold]
#[inline(never)]
fn decode_error(offset: usize, message: String) -> VnError {
    VnError::TextDecode { offset, message }
}

#[cfg(test)]
#[path = "tests/text_tests.rs"]
mod tests;
