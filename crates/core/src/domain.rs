//! Cheap, shareable views into loaded byte buffers.

use std::fmt;
use std::sync::Arc;

use crate::error::{VnError, VnResult};

/// An immutable `(offset, length)` window over a shared buffer.
///
/// Cloning a domain or taking a sub-view never copies the underlying bytes.
#[derive(Clone)]
pub struct Domain {
    source: Arc<[u8]>,
    offset: usize,
    len: usize,
}

impl Domain {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        let source: Arc<[u8]> = bytes.into();
        let len = source.len();
        Self {
            source,
            offset: 0,
            len,
        }
    }

    /// Absolute offset of this view inside its source buffer.
    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Absolute offset one past the last byte of the view.
    pub fn end(&self) -> usize {
        self.offset + self.len
    }

    pub fn get_data(&self) -> &[u8] {
        &self.source[self.offset..self.end()]
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.get_data().to_vec()
    }

    /// Sub-view at `offset` relative to the start of this view.
    pub fn sub(&self, offset: usize, len: usize) -> VnResult<Domain> {
        self.absolute(self.offset.saturating_add(offset), len)
    }

    /// Sub-view addressed by absolute source offset; must lie inside this view.
    pub fn absolute(&self, offset: usize, len: usize) -> VnResult<Domain> {
        let end = offset.checked_add(len);
        match end {
            Some(end) if offset >= self.offset && end <= self.end() => Ok(Domain {
                source: Arc::clone(&self.source),
                offset,
                len,
            }),
            _ => Err(VnError::DomainBounds {
                offset,
                requested: len,
                limit: self.end(),
            }),
        }
    }

    /// Smallest view covering both; `None` if they view different buffers.
    pub fn span_to(&self, other: &Domain) -> Option<Domain> {
        if !Arc::ptr_eq(&self.source, &other.source) {
            return None;
        }
        let offset = self.offset.min(other.offset);
        let end = self.end().max(other.end());
        Some(Domain {
            source: Arc::clone(&self.source),
            offset,
            len: end - offset,
        })
    }
}

impl From<Vec<u8>> for Domain {
    fn from(value: Vec<u8>) -> Self {
        Domain::new(value)
    }
}

impl PartialEq for Domain {
    fn eq(&self, other: &Self) -> bool {
        self.get_data() == other.get_data()
    }
}

impl Eq for Domain {}

impl fmt::Debug for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Domain")
            .field("offset", &self.offset)
            .field("len", &self.len)
            .finish()
    }
}
