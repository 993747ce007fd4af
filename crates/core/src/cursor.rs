//! Bounded little-endian reader over a [`Domain`].

use crate::domain::Domain;
use crate::error::{invalid_data, VnError, VnResult};

/// Mutable parse position over a domain.
///
/// Offsets are absolute positions in the domain's source buffer. The limit only
/// ever shrinks; [`Cursor::set_end`] pins it to the current position.
#[derive(Clone, Debug)]
pub struct Cursor {
    domain: Domain,
    pos: usize,
    limit: usize,
    end_forced: bool,
    mark: Option<usize>,
}

impl Cursor {
    pub fn new(domain: Domain) -> Self {
        let pos = domain.offset();
        let limit = domain.end();
        Self {
            domain,
            pos,
            limit,
            end_forced: false,
            mark: None,
        }
    }

    pub fn domain(&self) -> &Domain {
        &self.domain
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.pos)
    }

    pub fn at_end(&self) -> bool {
        self.pos >= self.limit
    }

    pub fn end_forced(&self) -> bool {
        self.end_forced
    }

    /// Reads exactly `n` bytes.
    pub fn read(&mut self, n: usize) -> VnResult<&[u8]> {
        let start = self.pos;
        let end = start
            .checked_add(n)
            .filter(|end| *end <= self.limit)
            .ok_or(VnError::DomainBounds {
                offset: start,
                requested: n,
                limit: self.limit,
            })?;
        self.pos = end;
        Ok(&self.domain.get_data()[start - self.domain.offset()..end - self.domain.offset()])
    }

    pub fn read_u8(&mut self) -> VnResult<u8> {
        Ok(self.read(1)?[0])
    }

    pub fn read_u16(&mut self) -> VnResult<u16> {
        let b = self.read(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_s16(&mut self) -> VnResult<i16> {
        let b = self.read(2)?;
        Ok(i16::from_le_bytes([b[0], b[1]]))
    }

    pub fn read_u32(&mut self) -> VnResult<u32> {
        let b = self.read(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn read_i32(&mut self) -> VnResult<i32> {
        let b = self.read(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn peek_u8(&self) -> VnResult<u8> {
        self.clone().read_u8()
    }

    pub fn peek_u32(&self) -> VnResult<u32> {
        self.clone().read_u32()
    }

    /// Reads up to and including `term`; returns the bytes before it.
    pub fn read_bytes_fixedterm(&mut self, term: u8) -> VnResult<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            let b = self.read_u8()?;
            if b == term {
                return Ok(out);
            }
            out.push(b);
        }
    }

    pub fn eat_const(&mut self, expected: &[u8]) -> VnResult<()> {
        let start = self.pos;
        let found = self.read(expected.len())?;
        if found != expected {
            let message = format!("expected {expected:02x?}, found {found:02x?}");
            return Err(invalid_data(start, message));
        }
        Ok(())
    }

    pub fn eat_nulls(&mut self, count: usize) -> VnResult<()> {
        let start = self.pos;
        let found = self.read(count)?;
        if found.iter().any(|b| *b != 0) {
            let message = format!("expected {count} null bytes, found {found:02x?}");
            return Err(invalid_data(start, message));
        }
        Ok(())
    }

    pub fn seek_back(&mut self, n: usize) -> VnResult<()> {
        match self.pos.checked_sub(n) {
            Some(pos) if pos >= self.domain.offset() => {
                self.pos = pos;
                Ok(())
            }
            _ => Err(invalid_data(
                self.pos,
                format!("cannot seek back {n} bytes past domain start"),
            )),
        }
    }

    /// Ends the domain at the current position; later reads fail.
    pub fn set_end(&mut self) -> VnResult<()> {
        if self.pos > self.limit {
            return Err(VnError::DomainBounds {
                offset: self.pos,
                requested: 0,
                limit: self.limit,
            });
        }
        self.limit = self.pos;
        self.end_forced = true;
        Ok(())
    }

    pub fn set_off_mark(&mut self) -> VnResult<()> {
        if self.mark.is_some() {
            return Err(invalid_data(self.pos, "offset mark already set"));
        }
        self.mark = Some(self.pos);
        Ok(())
    }

    pub fn clear_off_mark(&mut self) {
        self.mark = None;
    }

    /// Returns the bytes consumed since the mark and clears it.
    pub fn read_from_off_mark(&mut self) -> VnResult<Domain> {
        let mark = self
            .mark
            .take()
            .ok_or_else(|| invalid_data(self.pos, "no offset mark set"))?;
        self.span_from(mark)
    }

    /// View over `[start, pos)`.
    pub fn span_from(&self, start: usize) -> VnResult<Domain> {
        self.domain
            .absolute(start, self.pos.saturating_sub(start))
    }
}

#[cfg(test)]
#[path = "tests/cursor_tests.rs"]
mod tests;
