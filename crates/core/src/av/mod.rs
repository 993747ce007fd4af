//! Active Values: the small expression language embedded in script operands.
//!
//! An active value is a flat run of literals and operators terminated by a
//! `0x00` byte. After parsing, operators are reduced into trees by descending
//! precedence, and at most one memory operation is bound to its address and
//! value operands.

mod eval;
mod reduce;

use std::fmt;

use crate::cursor::Cursor;
use crate::error::VnResult;

pub use eval::{AvContext, AvResult, ConstantContext};

/// Op types in this range mutate memory.
const MEMOP_RANGE: std::ops::RangeInclusive<u8> = 20..=33;
/// Reserved operator bytes that carry no arithmetic meaning.
const PLACEHOLDER_BYTES: [u8; 4] = [0x2f, 0x30, 0x31, 0x32];
/// Op type assigned to placeholder operators.
pub const PLACEHOLDER_OP: u8 = 255;

/// Address-space selector for main memory in memory operations.
pub const TARGET_MEMORY: u8 = 0x28;
/// Address-space selector for engine state in memory operations.
pub const TARGET_GSTATE: u8 = 0x2d;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Element {
    Literal(i32),
    Operator(Operator),
    Memop(Memop),
    /// Operand slot the encoded expression did not fill.
    Missing,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Operator {
    pub op_type: u8,
    pub precedence: u8,
    /// Set once reduction has assigned operands.
    pub operands: Option<Vec<Element>>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Memop {
    pub op_type: u8,
    pub precedence: u8,
    /// Address-space selector taken from the first element; `None` when absent.
    pub target: Option<u8>,
    pub address: Box<Element>,
    /// `None` for the unary increment and decrement forms.
    pub value: Option<Box<Element>>,
}

impl Memop {
    pub fn is_unary(&self) -> bool {
        matches!(self.op_type, 0x20 | 0x21)
    }
}

impl Element {
    fn precedence(&self) -> Option<u8> {
        match self {
            Element::Operator(op) => Some(op.precedence),
            Element::Memop(memop) => Some(memop.precedence),
            Element::Literal(_) | Element::Missing => None,
        }
    }

    fn is_memop(&self) -> bool {
        matches!(self, Element::Memop(_))
    }
}

/// Operand counts `(before, after)` an operator consumes during reduction.
pub fn arity(op_type: u8) -> (usize, usize) {
    match op_type {
        11 => (0, 1),
        1..=17 => (1, 1),
        40 | 41 | 43 | 45 | 51 => (0, 1),
        42 | 44 | 46 => (0, 2),
        _ => (0, 0),
    }
}

/// A parsed and reduced active value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ActiveValue {
    elements: Vec<Element>,
    memop: Option<usize>,
}

impl ActiveValue {
    /// Reads one active value up to and including its `0x00` terminator.
    pub fn parse(cursor: &mut Cursor) -> VnResult<Self> {
        let mut elements = Vec::new();
        loop {
            let lead = cursor.read_u8()?;
            if lead == 0x00 {
                break;
            }
            if lead & 0x80 != 0 {
                elements.push(Element::Literal(read_literal(cursor, lead)?));
                continue;
            }
            let second = cursor.read_u8()?;
            let (op_type, precedence) = if PLACEHOLDER_BYTES.contains(&lead) {
                (PLACEHOLDER_OP, 0)
            } else {
                (lead, second)
            };
            if MEMOP_RANGE.contains(&op_type) {
                elements.push(Element::Memop(Memop {
                    op_type,
                    precedence,
                    target: None,
                    address: Box::new(Element::Missing),
                    value: None,
                }));
            } else {
                elements.push(Element::Operator(Operator {
                    op_type,
                    precedence,
                    operands: None,
                }));
            }
        }
        let memop = reduce::reduce(&mut elements)?;
        Ok(Self { elements, memop })
    }

    /// A value made only of literals, as synthesized for implicit operands.
    pub fn from_literals(values: &[i32]) -> Self {
        Self {
            elements: values.iter().copied().map(Element::Literal).collect(),
            memop: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Every element left at the top level after reduction.
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// The elements evaluation walks: the memory operation alone if there is one.
    pub fn values(&self) -> &[Element] {
        match self.memop {
            Some(idx) => &self.elements[idx..=idx],
            None => &self.elements,
        }
    }

    pub fn memop(&self) -> Option<&Memop> {
        match self.memop.map(|idx| &self.elements[idx]) {
            Some(Element::Memop(memop)) => Some(memop),
            _ => None,
        }
    }

    /// Evaluates without any engine; memory and random access fail.
    pub fn constant_values(&self) -> VnResult<Vec<i64>> {
        let mut ctx = ConstantContext;
        self.evaluate(&mut ctx, None)?
            .into_iter()
            .map(AvResult::into_value)
            .collect()
    }
}

/// Decodes the literal whose lead byte has already been consumed.
fn read_literal(cursor: &mut Cursor, lead: u8) -> VnResult<i32> {
    let extra = usize::from((lead & 0x60) >> 5);
    if extra == 3 {
        let value = cursor.read_i32()?;
        cursor.read(1)?;
        return Ok(value);
    }
    let mut low = [0u8; 2];
    low[..extra].copy_from_slice(cursor.read(extra)?);
    let low = i64::from(i16::from_le_bytes(low));
    let mut value = (i64::from(lead & 0x1f) << (8 * extra)) + low;
    if lead & 0x10 != 0 {
        let mask: i64 = match extra {
            0 => 0xFFFF_FFE0,
            1 => 0xFFFF_E000,
            _ => 0xFFE0_0000,
        };
        value = i64::from((value | mask) as u32 as i32);
    }
    cursor.read(1)?;
    Ok(value as i32)
}

fn operator_symbol(op_type: u8) -> Option<&'static str> {
    Some(match op_type {
        0x01 => "*",
        0x02 => "/",
        0x03 => "+",
        0x04 => "-",
        0x05 => "%",
        0x06 => "<<",
        0x07 => ">>",
        0x08 => "&",
        0x09 => "^",
        0x0a => "|",
        0x0c => "==",
        0x0d => "!=",
        0x0e => "<=",
        0x0f => ">=",
        0x10 => "<",
        0x11 => ">",
        0x28 => "mem[{}]",
        0x2d => "e17gstate[{}]",
        0x33 => "<random({})>",
        _ => return None,
    })
}

fn memop_symbol(op_type: u8) -> Option<&'static str> {
    Some(match op_type {
        0x14 => "= {}",
        0x15 => "*= {}",
        0x16 => "/= {}",
        0x17 => "+= {}",
        0x18 => "-= {}",
        0x19 => "%= {}",
        0x1a => "<<= {}",
        0x1b => ">>= {}",
        0x1c => "&= {}",
        0x1d => "|= {}",
        0x1e => "^= {}",
        0x20 => "+= 1",
        0x21 => "-= 1",
        _ => return None,
    })
}

fn unknown_symbol(op_type: u8) -> String {
    format!("~{op_type}~")
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Element::Literal(value) => write!(f, "{value}"),
            Element::Missing => f.write_str("MissingData"),
            Element::Operator(op) => {
                let (before, after) = arity(op.op_type);
                let symbol = operator_symbol(op.op_type)
                    .map(str::to_string)
                    .unwrap_or_else(|| unknown_symbol(op.op_type));
                match (&op.operands, before + after) {
                    (_, 0) => f.write_str(&symbol),
                    (None, _) => write!(f, "<op {:#04x} p{}>", op.op_type, op.precedence),
                    (Some(operands), 1) => {
                        let inner = operands.first().map(ToString::to_string).unwrap_or_default();
                        f.write_str(&symbol.replace("{}", &inner))
                    }
                    (Some(operands), _) => {
                        let lhs = operands.first().unwrap_or(&Element::Missing);
                        let rhs = operands.get(1).unwrap_or(&Element::Missing);
                        write!(f, "({lhs} {symbol} {rhs})")
                    }
                }
            }
            Element::Memop(memop) => {
                let rhs = match memop_symbol(memop.op_type) {
                    Some(symbol) if memop.is_unary() => symbol.to_string(),
                    Some(symbol) => {
                        let value = memop.value.as_deref().unwrap_or(&Element::Missing);
                        symbol.replace("{}", &value.to_string())
                    }
                    None => unknown_symbol(memop.op_type),
                };
                let address = memop.address.to_string();
                let lhs = match memop.target {
                    Some(TARGET_MEMORY) => format!("mem[{address}]"),
                    Some(TARGET_GSTATE) => format!("e17gstate[{address}]"),
                    Some(other) => format!("({other}){address}"),
                    None => format!("(?){address}"),
                };
                write!(f, "({lhs} {rhs})")
            }
        }
    }
}

fn join(elements: &[Element]) -> String {
    elements
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl fmt::Display for ActiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.memop {
            None => write!(f, "[{}]", join(&self.elements)),
            Some(_) => write!(f, "<[{}] / [{}]>", join(self.values()), join(&self.elements)),
        }
    }
}

#[cfg(test)]
#[path = "tests/av_tests.rs"]
mod tests;
