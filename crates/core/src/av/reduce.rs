use crate::error::{structure_error, VnResult};

use super::{arity, Element};

/// Reduces `elements` in place and binds the memory operation, if any.
///
/// Returns the index of the bound memory operation.
pub(super) fn reduce(elements: &mut Vec<Element>) -> VnResult<Option<usize>> {
    let memops = elements.iter().filter(|e| e.is_memop()).count();
    if memops > 1 {
        return Err(structure_error(format!(
            "{memops} memory operations in one value"
        )));
    }
    let Some(first) = elements.iter().position(Element::is_memop) else {
        let len = elements.len();
        reduce_range(elements, 0, len)?;
        return Ok(None);
    };

    let len = elements.len();
    reduce_range(elements, first + 1, len)?;
    reduce_range(elements, 1, first)?;

    let idx = elements
        .iter()
        .position(Element::is_memop)
        .ok_or_else(|| structure_error("memory operation consumed as an operand"))?;
    bind_memop(elements, idx);
    if elements.len() != idx + 1 && elements.len() != idx + 2 {
        return Err(structure_error(format!(
            "{} elements left around memory operation at {idx}",
            elements.len()
        )));
    }
    Ok(Some(idx))
}

fn max_precedence(elements: &[Element], below: Option<u8>) -> u8 {
    elements
        .iter()
        .filter_map(Element::precedence)
        .filter(|p| below.map_or(true, |limit| *p < limit))
        .max()
        .unwrap_or(0)
}

/// Precedence-descending reduction over `[start, limit)`.
fn reduce_range(elements: &mut Vec<Element>, start: usize, mut limit: usize) -> VnResult<()> {
    let mut last = None;
    while limit > start {
        let level = max_precedence(&elements[start..limit.min(elements.len())], last);
        last = Some(level);
        if level == 0 {
            break;
        }
        let mut i = start;
        while i < elements.len().min(limit) {
            if elements[i].precedence() == Some(level) {
                let Element::Operator(op) = &elements[i] else {
                    return Err(structure_error(format!(
                        "memory operation at precedence {level} inside operand range"
                    )));
                };
                let (before, after) = arity(op.op_type);
                let mut operands = Vec::with_capacity(before + after);
                if before > 0 {
                    if before > i - start {
                        operands.extend(std::iter::repeat(Element::Missing).take(before));
                    } else {
                        operands.extend(elements.drain(i - before..i));
                        limit -= before;
                        i -= before;
                    }
                }
                if after > 0 {
                    let end = (i + 1 + after).min(elements.len());
                    let taken = end - (i + 1);
                    operands.extend(elements.drain(i + 1..end));
                    operands.extend(std::iter::repeat(Element::Missing).take(after - taken));
                    limit = limit.saturating_sub(after);
                }
                if before > 0 || after > 0 {
                    if let Element::Operator(op) = &mut elements[i] {
                        op.operands = Some(operands);
                    }
                }
            }
            i += 1;
        }
    }
    Ok(())
}

fn bind_memop(elements: &mut [Element], idx: usize) {
    let (target, address) = if idx < 2 {
        (None, Element::Missing)
    } else {
        let target = match &elements[0] {
            Element::Operator(op) => Some(op.op_type),
            _ => None,
        };
        (target, elements[1].clone())
    };
    let value = elements.get(idx + 1).cloned().unwrap_or(Element::Missing);
    if let Element::Memop(memop) = &mut elements[idx] {
        memop.target = target;
        memop.address = Box::new(address);
        memop.value = if memop.is_unary() {
            None
        } else {
            Some(Box::new(value))
        };
    }
}
