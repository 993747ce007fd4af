//! Hierarchical opcode tables.
//!
//! A table maps the first opcode byte either to a definition or to a nested
//! table keyed by the second byte. Game variants are assembled from a base
//! table plus override lists; sub-tables nobody overrides stay shared.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::error::{VnError, VnResult};
use crate::token::Field;

/// Static description of one opcode: its name, operand shape, and what the
/// runtime does with it.
#[derive(Debug)]
pub struct OpDef<A: 'static> {
    pub op: u8,
    pub name: &'static str,
    pub shape: &'static [Field],
    pub action: A,
    pub linebreak: bool,
}

impl<A> OpDef<A> {
    pub const fn new(op: u8, name: &'static str, shape: &'static [Field], action: A) -> Self {
        Self {
            op,
            name,
            shape,
            action,
            linebreak: false,
        }
    }

    /// Marks the token as ending a row in dump output.
    pub const fn breaks(mut self) -> Self {
        self.linebreak = true;
        self
    }

    /// Whether the shape forces the end of its chunk.
    pub fn ends_chunk(&self) -> bool {
        self.shape.iter().any(|field| matches!(field, Field::End))
    }
}

/// Opcode bytes that selected a definition: one byte for direct opcodes, two
/// for sub-table entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OpPath {
    pub prefix: Option<u8>,
    pub op: u8,
}

impl OpPath {
    pub const fn direct(op: u8) -> Self {
        Self { prefix: None, op }
    }

    pub const fn nested(prefix: u8, op: u8) -> Self {
        Self {
            prefix: Some(prefix),
            op,
        }
    }
}

impl fmt::Display for OpPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix {
            Some(prefix) => write!(f, "{prefix:02x}-{:02x}", self.op),
            None => write!(f, "{:02x}", self.op),
        }
    }
}

pub enum Entry<A: 'static> {
    Leaf(&'static OpDef<A>),
    Sub(Arc<OpcodeTable<A>>),
}

impl<A> Clone for Entry<A> {
    fn clone(&self) -> Self {
        match self {
            Entry::Leaf(def) => Entry::Leaf(def),
            Entry::Sub(table) => Entry::Sub(Arc::clone(table)),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for Entry<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Leaf(def) => write!(f, "Leaf({})", def.name),
            Entry::Sub(table) => f.debug_tuple("Sub").field(table).finish(),
        }
    }
}

pub struct OpcodeTable<A: 'static> {
    entries: BTreeMap<u8, Entry<A>>,
}

impl<A> Clone for OpcodeTable<A> {
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
        }
    }
}

impl<A> Default for OpcodeTable<A> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<A: fmt::Debug> fmt::Debug for OpcodeTable<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.entries.iter()).finish()
    }
}

impl<A> OpcodeTable<A> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a table from one registration list.
    pub fn from_defs(defs: &'static [OpDef<A>]) -> Self {
        let mut table = Self::new();
        table.register(defs);
        table
    }

    /// Registers every definition of `defs`. An opcode repeated within the
    /// list is reported and the later definition wins.
    pub fn register(&mut self, defs: &'static [OpDef<A>]) {
        let mut seen = BTreeSet::new();
        for def in defs {
            if !seen.insert(def.op) {
                tracing::warn!(
                    opcode = format_args!("{:02x}", def.op),
                    name = def.name,
                    "duplicate opcode registration; overwriting"
                );
            }
            self.entries.insert(def.op, Entry::Leaf(def));
        }
    }

    /// Replaces entries with the definitions of an override list.
    pub fn override_with(&mut self, defs: &'static [OpDef<A>]) {
        for def in defs {
            self.entries.insert(def.op, Entry::Leaf(def));
        }
    }

    /// Applies an override list to the sub-table under `prefix`, copying it
    /// first if it is still shared.
    pub fn override_sub(&mut self, prefix: u8, defs: &'static [OpDef<A>]) {
        let entry = self
            .entries
            .entry(prefix)
            .or_insert_with(|| Entry::Sub(Arc::new(OpcodeTable::new())));
        match entry {
            Entry::Sub(table) => Arc::make_mut(table).override_with(defs),
            Entry::Leaf(_) => {
                let mut table = OpcodeTable::new();
                table.override_with(defs);
                *entry = Entry::Sub(Arc::new(table));
            }
        }
    }

    pub fn insert_sub(&mut self, prefix: u8, table: impl Into<Arc<OpcodeTable<A>>>) {
        self.entries.insert(prefix, Entry::Sub(table.into()));
    }

    /// A new table holding only the listed opcodes of this one.
    pub fn select(&self, ops: &[u8]) -> Self {
        let entries = ops
            .iter()
            .filter_map(|op| self.entries.get(op).map(|entry| (*op, entry.clone())))
            .collect();
        Self { entries }
    }

    pub fn entry(&self, op: u8) -> Option<&Entry<A>> {
        self.entries.get(&op)
    }

    pub fn sub_table(&self, prefix: u8) -> Option<&Arc<OpcodeTable<A>>> {
        match self.entries.get(&prefix) {
            Some(Entry::Sub(table)) => Some(table),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every definition reachable from this table, with its path.
    pub fn definitions(&self) -> Vec<(OpPath, &'static OpDef<A>)> {
        let mut out = Vec::new();
        for (op, entry) in &self.entries {
            match entry {
                Entry::Leaf(def) => out.push((OpPath::direct(*op), *def)),
                Entry::Sub(table) => {
                    for (inner, def) in table.definitions() {
                        out.push((OpPath::nested(*op, inner.op), def));
                    }
                }
            }
        }
        out
    }

    /// Reads opcode bytes from `cursor` and resolves them to a definition.
    pub fn lookup(&self, cursor: &mut Cursor) -> VnResult<(OpPath, &'static OpDef<A>)> {
        let offset = cursor.pos();
        let first = cursor.read_u8()?;
        match self.entries.get(&first) {
            Some(Entry::Leaf(def)) => Ok((OpPath::direct(first), *def)),
            Some(Entry::Sub(table)) => {
                let second = cursor.read_u8()?;
                match table.entries.get(&second) {
                    Some(Entry::Leaf(def)) => Ok((OpPath::nested(first, second), *def)),
                    _ => Err(unknown_opcode(
                        format!("{}", OpPath::nested(first, second)),
                        offset,
                    )),
                }
            }
            None => Err(unknown_opcode(format!("{first:02x}"), offset)),
        }
    }
}

#[cold]
#[inline(never)]
fn unknown_opcode(opcode: String, offset: usize) -> VnError {
    VnError::UnknownOpcode { opcode, offset }
}

#[cfg(test)]
#[path = "tests/registry_tests.rs"]
mod tests;
