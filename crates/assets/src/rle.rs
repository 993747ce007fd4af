//! Run-length decoder for `lnd` archive chunks, CPS images and WAF clips.
//!
//! Each block starts with a control byte:
//!
//! | bits        | block                                                    |
//! |-------------|----------------------------------------------------------|
//! | `00xl llll` | literal run of `l + 1` bytes (`x`: one more length byte) |
//! | `01ll llll` | `n + 1` repetitions of the next `l + 2` input bytes      |
//! | `10ll lloo` | copy `l + 2` bytes from `o + 1` bytes back in the output |
//! | `11xl llll` | `l + 2` copies of one byte (`x`: one more length byte)   |

use crate::AssetError;

/// Decodes `input` until `out_size` bytes have been produced. Runs that would
/// overshoot are cut at `out_size`.
pub fn unpack(input: &[u8], out_size: usize) -> Result<Vec<u8>, AssetError> {
    let mut reader = Reader { input, pos: 0 };
    let mut out = Vec::with_capacity(out_size);
    while out.len() < out_size {
        let control = reader.u8()?;
        let left = out_size - out.len();
        match control >> 6 {
            0b00 => {
                let mut len = usize::from(control & 0x1f) + 1;
                if control & 0x20 != 0 {
                    len += usize::from(reader.u8()?) << 5;
                }
                out.extend_from_slice(reader.bytes(len.min(left))?);
            }
            0b01 => {
                let repeats = usize::from(reader.u8()?) + 1;
                let len = usize::from(control & 0x3f) + 2;
                let sequence = reader.bytes(len)?;
                for _ in 0..repeats {
                    let left = out_size - out.len();
                    if left == 0 {
                        break;
                    }
                    out.extend_from_slice(&sequence[..len.min(left)]);
                }
            }
            0b10 => {
                let len = usize::from((control >> 2) & 0x0f) + 2;
                let distance = (usize::from(control & 0x03) << 8) + usize::from(reader.u8()?) + 1;
                let start = out.len().checked_sub(distance).ok_or_else(|| {
                    AssetError::Compression(format!(
                        "back-reference {distance} bytes before output start at {}",
                        out.len()
                    ))
                })?;
                for i in 0..len.min(left) {
                    let byte = out[start + i];
                    out.push(byte);
                }
            }
            _ => {
                let mut len = usize::from(control & 0x1f) + 2;
                if control & 0x20 != 0 {
                    len += usize::from(reader.u8()?) << 5;
                }
                let byte = reader.u8()?;
                out.resize(out.len() + len.min(left), byte);
            }
        }
    }
    Ok(out)
}

struct Reader<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn u8(&mut self) -> Result<u8, AssetError> {
        Ok(self.bytes(1)?[0])
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], AssetError> {
        let input: &'a [u8] = self.input;
        let slice = input.get(self.pos..self.pos + len).ok_or_else(|| {
            AssetError::Compression(format!(
                "input ends at {} while reading {len} bytes at {}",
                input.len(),
                self.pos
            ))
        })?;
        self.pos += len;
        Ok(slice)
    }
}

#[cfg(test)]
#[path = "tests/rle_tests.rs"]
mod tests;
