use serde::{Deserialize, Serialize};

use crate::error::{evaluation_error, structure_error, VnResult};

use super::{ActiveValue, Element, Memop, Operator, TARGET_GSTATE, TARGET_MEMORY};

/// Engine services an active value may call into while evaluating.
pub trait AvContext {
    fn memory(&self, address: i64) -> VnResult<i64>;
    fn set_memory(&mut self, address: i64, value: i64) -> VnResult<()>;
    /// Uniform draw from `0..bound`.
    fn random(&mut self, bound: i64) -> VnResult<i64>;

    /// Engine state queries. Index 7 reports whether a movie is still playing,
    /// which is always false since movies are handed off whole.
    fn gstate(&self, index: i64) -> VnResult<i64> {
        match index {
            7 => Ok(0),
            other => Err(evaluation_error(format!("unknown engine state index {other}"))),
        }
    }
}

/// Context for evaluating values that must not touch engine state.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConstantContext;

impl AvContext for ConstantContext {
    fn memory(&self, address: i64) -> VnResult<i64> {
        Err(evaluation_error(format!(
            "memory read of {address} in a constant value"
        )))
    }

    fn set_memory(&mut self, address: i64, _value: i64) -> VnResult<()> {
        Err(evaluation_error(format!(
            "memory write to {address} in a constant value"
        )))
    }

    fn random(&mut self, _bound: i64) -> VnResult<i64> {
        Err(evaluation_error("random draw in a constant value"))
    }
}

/// Outcome of evaluating one top-level element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AvResult {
    Value(i64),
    /// A memory operation ran; it yields no usable value.
    MemoryWrite { address: i64, value: i64 },
}

impl AvResult {
    pub fn into_value(self) -> VnResult<i64> {
        match self {
            AvResult::Value(value) => Ok(value),
            AvResult::MemoryWrite { address, .. } => Err(structure_error(format!(
                "expected a value, got memory write to {address}"
            ))),
        }
    }
}

impl ActiveValue {
    /// Evaluates every top-level value, performing any memory write.
    ///
    /// Each call re-runs side effects. `expected` must match the number of
    /// top-level values when given.
    pub fn evaluate(
        &self,
        ctx: &mut dyn AvContext,
        expected: Option<usize>,
    ) -> VnResult<Vec<AvResult>> {
        let values = self.values();
        if let Some(expected) = expected {
            if expected != values.len() {
                return Err(structure_error(format!(
                    "{self} was asked for {expected} values but holds {}",
                    values.len()
                )));
            }
        }
        values.iter().map(|element| eval_top(element, ctx)).collect()
    }

    /// Evaluates a single plain value.
    pub fn evaluate_one(&self, ctx: &mut dyn AvContext) -> VnResult<i64> {
        let results = self.evaluate(ctx, Some(1))?;
        match results.as_slice() {
            [result] => result.into_value(),
            _ => Err(structure_error(format!("{self} did not yield one value"))),
        }
    }
}

fn eval_top(element: &Element, ctx: &mut dyn AvContext) -> VnResult<AvResult> {
    match element {
        Element::Memop(memop) => eval_memop(memop, ctx),
        other => eval(other, ctx).map(AvResult::Value),
    }
}

fn eval(element: &Element, ctx: &mut dyn AvContext) -> VnResult<i64> {
    match element {
        Element::Literal(value) => Ok(i64::from(*value)),
        Element::Operator(op) => eval_operator(op, ctx),
        Element::Memop(_) => Err(structure_error("nested memory operation")),
        Element::Missing => Err(evaluation_error("operand missing from encoded value")),
    }
}

fn eval_operator(op: &Operator, ctx: &mut dyn AvContext) -> VnResult<i64> {
    let operands = op.operands.as_deref().ok_or_else(|| {
        evaluation_error(format!("operator {:#04x} has no operands", op.op_type))
    })?;
    let mut args = Vec::with_capacity(operands.len());
    for operand in operands {
        args.push(eval(operand, ctx)?);
    }
    match (op.op_type, args.as_slice()) {
        (0x28, [address]) => ctx.memory(*address),
        (0x2d, [index]) => ctx.gstate(*index),
        (0x33, [bound]) => ctx.random(*bound),
        (0x01..=0x11, [a, b]) => binary(op.op_type, *a, *b),
        (other, _) => Err(evaluation_error(format!(
            "operator {other:#04x} cannot be evaluated"
        ))),
    }
}

fn eval_memop(memop: &Memop, ctx: &mut dyn AvContext) -> VnResult<AvResult> {
    if memop.target != Some(TARGET_MEMORY) {
        let target = memop.target.map_or(String::from("none"), |t| format!("{t:#04x}"));
        let hint = if memop.target == Some(TARGET_GSTATE) {
            " (engine state is read-only)"
        } else {
            ""
        };
        return Err(evaluation_error(format!(
            "memory operation on target {target}{hint}"
        )));
    }
    let address = eval(&memop.address, ctx)?;
    let current = ctx.memory(address)?;
    let value = match (memop.op_type, memop.value.as_deref()) {
        (0x20, _) => current.wrapping_add(1),
        (0x21, _) => current.wrapping_sub(1),
        (op_type, Some(operand)) => {
            let rhs = eval(operand, ctx)?;
            match op_type {
                0x14 => rhs,
                0x15 => binary(0x01, current, rhs)?,
                0x16 => binary(0x02, current, rhs)?,
                0x17 => binary(0x03, current, rhs)?,
                0x18 => binary(0x04, current, rhs)?,
                0x19 => binary(0x05, current, rhs)?,
                0x1a => binary(0x06, current, rhs)?,
                0x1b => binary(0x07, current, rhs)?,
                0x1c => binary(0x08, current, rhs)?,
                0x1d => binary(0x0a, current, rhs)?,
                0x1e => binary(0x09, current, rhs)?,
                other => {
                    return Err(evaluation_error(format!(
                        "memory operation {other:#04x} cannot be evaluated"
                    )))
                }
            }
        }
        (other, None) => {
            return Err(evaluation_error(format!(
                "memory operation {other:#04x} has no value operand"
            )))
        }
    };
    ctx.set_memory(address, value)?;
    Ok(AvResult::MemoryWrite { address, value })
}

/// Integer semantics of the binary operators.
///
/// Division truncates toward zero; modulo takes the sign of the divisor.
fn binary(op_type: u8, a: i64, b: i64) -> VnResult<i64> {
    let flag = |cond: bool| i64::from(cond);
    Ok(match op_type {
        0x01 => a.wrapping_mul(b),
        0x02 => {
            if b == 0 {
                return Err(evaluation_error(format!("division of {a} by zero")));
            }
            a.wrapping_div(b)
        }
        0x03 => a.wrapping_add(b),
        0x04 => a.wrapping_sub(b),
        0x05 => {
            if b == 0 {
                return Err(evaluation_error(format!("modulo of {a} by zero")));
            }
            let r = a.wrapping_rem(b);
            if r != 0 && (r < 0) != (b < 0) {
                r + b
            } else {
                r
            }
        }
        0x06 => shift_amount(b)?.map_or(0, |s| a.wrapping_shl(s)),
        0x07 => shift_amount(b)?.map_or(if a < 0 { -1 } else { 0 }, |s| a >> s),
        0x08 => a & b,
        0x09 => a ^ b,
        0x0a => a | b,
        0x0c => flag(a == b),
        0x0d => flag(a != b),
        0x0e => flag(a <= b),
        0x0f => flag(a >= b),
        0x10 => flag(a < b),
        0x11 => flag(a > b),
        other => {
            return Err(evaluation_error(format!(
                "operator {other:#04x} cannot be evaluated"
            )))
        }
    })
}

/// `None` when the shift clears every bit.
fn shift_amount(b: i64) -> VnResult<Option<u32>> {
    match b {
        b if b < 0 => Err(evaluation_error(format!("negative shift {b}"))),
        b if b >= 64 => Ok(None),
        b => Ok(Some(b as u32)),
    }
}
