use super::*;
use crate::domain::Domain;
use crate::error::VnError;

struct Scratch {
    memory: Vec<i64>,
    bounds: Vec<i64>,
}

impl Scratch {
    fn new() -> Self {
        Self {
            memory: vec![0; 16],
            bounds: Vec::new(),
        }
    }
}

impl AvContext for Scratch {
    fn memory(&self, address: i64) -> VnResult<i64> {
        Ok(self.memory[address as usize])
    }

    fn set_memory(&mut self, address: i64, value: i64) -> VnResult<()> {
        self.memory[address as usize] = value;
        Ok(())
    }

    fn random(&mut self, bound: i64) -> VnResult<i64> {
        self.bounds.push(bound);
        Ok(bound - 1)
    }
}

fn parse(bytes: &[u8]) -> VnResult<ActiveValue> {
    let mut cursor = Cursor::new(Domain::new(bytes.to_vec()));
    let av = ActiveValue::parse(&mut cursor)?;
    assert!(cursor.at_end(), "terminator must be consumed");
    Ok(av)
}

fn single_literal(bytes: &[u8]) -> i32 {
    let av = parse(bytes).expect("literal parses");
    match av.elements() {
        [Element::Literal(value)] => *value,
        other => panic!("expected one literal, got {other:?}"),
    }
}

#[test]
fn precedence_groups_addition_before_multiplication() {
    // 3 +(p2) 4 *(p1) 2
    let av = parse(&[
        0x83, 0x00, 0x03, 0x02, 0x84, 0x00, 0x01, 0x01, 0x82, 0x00, 0x00,
    ])
    .expect("parse");
    assert_eq!(av.to_string(), "[((3 + 4) * 2)]");
    assert_eq!(av.evaluate_one(&mut Scratch::new()).expect("eval"), 14);
    assert_eq!(av.constant_values().expect("constant"), vec![14]);
}

#[test]
fn equal_precedence_reduces_left_to_right() {
    let av = parse(&[
        0x81, 0x00, 0x04, 0x01, 0x82, 0x00, 0x04, 0x01, 0x83, 0x00, 0x00,
    ])
    .expect("parse");
    assert_eq!(av.to_string(), "[((1 - 2) - 3)]");
    assert_eq!(av.evaluate_one(&mut Scratch::new()).expect("eval"), -4);
}

#[test]
fn memory_add_assign_writes_back() {
    // mem[5] += 3
    let av = parse(&[0x28, 0x00, 0x85, 0x00, 0x17, 0x00, 0x83, 0x00, 0x00]).expect("parse");
    let mut ctx = Scratch::new();
    ctx.memory[5] = 10;
    let results = av.evaluate(&mut ctx, Some(1)).expect("eval");
    assert_eq!(ctx.memory[5], 13);
    assert_eq!(
        results,
        vec![AvResult::MemoryWrite {
            address: 5,
            value: 13
        }]
    );
    let memop = av.memop().expect("memop bound");
    assert_eq!(memop.target, Some(TARGET_MEMORY));
    assert!(av.to_string().starts_with("<[(mem[5] += 3)] / ["));
}

#[test]
fn memory_write_repeats_on_each_evaluation() {
    let av = parse(&[0x28, 0x00, 0x82, 0x00, 0x20, 0x00, 0x00]).expect("parse");
    let mut ctx = Scratch::new();
    av.evaluate(&mut ctx, None).expect("first");
    av.evaluate(&mut ctx, None).expect("second");
    assert_eq!(ctx.memory[2], 2);
    assert!(av.memop().expect("memop").is_unary());
}

#[test]
fn second_memory_operation_is_rejected() {
    let err = parse(&[
        0x28, 0x00, 0x85, 0x00, 0x17, 0x00, 0x83, 0x00, 0x14, 0x00, 0x81, 0x00, 0x00,
    ])
    .expect_err("two memops");
    assert!(matches!(err, VnError::ActiveValueStructure(_)));
}

#[test]
fn leftover_elements_after_memop_are_rejected() {
    let err = parse(&[
        0x28, 0x00, 0x85, 0x00, 0x14, 0x00, 0x83, 0x00, 0x84, 0x00, 0x00,
    ])
    .expect_err("dangling literal");
    assert!(matches!(err, VnError::ActiveValueStructure(_)));
}

#[test]
fn requested_count_must_match() {
    let av = ActiveValue::from_literals(&[1, 2]);
    let err = av
        .evaluate(&mut Scratch::new(), Some(1))
        .expect_err("count mismatch");
    assert!(matches!(err, VnError::ActiveValueStructure(_)));
    assert_eq!(av.constant_values().expect("constants"), vec![1, 2]);
}

#[test]
fn short_literals_sign_extend() {
    assert_eq!(single_literal(&[0x9f, 0x00, 0x00]), -1);
    assert_eq!(single_literal(&[0x90, 0x00, 0x00]), -16);
    assert_eq!(single_literal(&[0x8f, 0x00, 0x00]), 15);
}

#[test]
fn one_byte_literals_cover_thirteen_bits() {
    assert_eq!(single_literal(&[0xaf, 0xff, 0x00, 0x00]), 4095);
    assert_eq!(single_literal(&[0xb0, 0x00, 0x00, 0x00]), -4096);
    assert_eq!(single_literal(&[0xbf, 0xff, 0x00, 0x00]), -1);
}

#[test]
fn two_byte_literals_use_middle_endian_assembly() {
    assert_eq!(single_literal(&[0xcf, 0xff, 0x7f, 0x00, 0x00]), 1_015_807);
    assert_eq!(single_literal(&[0xd0, 0x00, 0x00, 0x00, 0x00]), -1_048_576);
    assert_eq!(single_literal(&[0xc1, 0x34, 0x12, 0x00, 0x00]), 0x1_1234);
}

#[test]
fn four_byte_literal_replaces_inline_bits() {
    let mut bytes = vec![0xe0];
    bytes.extend_from_slice(&(-123_456_789i32).to_le_bytes());
    bytes.extend_from_slice(&[0x00, 0x00]);
    assert_eq!(single_literal(&bytes), -123_456_789);
}

#[test]
fn missing_operands_are_padded_and_fail_evaluation() {
    let av = parse(&[0x01, 0x05, 0x82, 0x00, 0x00]).expect("parse tolerates gaps");
    assert_eq!(av.to_string(), "[(MissingData * 2)]");
    let err = av.evaluate_one(&mut Scratch::new()).expect_err("missing operand");
    assert!(matches!(err, VnError::Evaluation(_)));
}

#[test]
fn placeholders_never_reduce() {
    let av = parse(&[0x30, 0x09, 0x81, 0x00, 0x00]).expect("parse");
    assert_eq!(av.to_string(), "[~255~, 1]");
}

#[test]
fn random_and_engine_state_use_context() {
    // <random(6)>
    let av = parse(&[0x33, 0x01, 0x86, 0x00, 0x00]).expect("parse");
    let mut ctx = Scratch::new();
    assert_eq!(av.evaluate_one(&mut ctx).expect("draw"), 5);
    assert_eq!(ctx.bounds, vec![6]);
    assert!(av.constant_values().is_err());

    let gstate = parse(&[0x2d, 0x01, 0x87, 0x00, 0x00]).expect("parse");
    assert_eq!(gstate.to_string(), "[e17gstate[7]]");
    assert_eq!(gstate.evaluate_one(&mut ctx).expect("movie flag"), 0);
}

#[test]
fn division_truncates_and_modulo_follows_divisor() {
    // -7 / 2 and -7 % 2
    let div = parse(&[0x99, 0x00, 0x02, 0x01, 0x82, 0x00, 0x00]).expect("parse");
    assert_eq!(div.evaluate_one(&mut Scratch::new()).expect("div"), -3);
    let rem = parse(&[0x99, 0x00, 0x05, 0x01, 0x82, 0x00, 0x00]).expect("parse");
    assert_eq!(rem.evaluate_one(&mut Scratch::new()).expect("mod"), 1);
    let by_zero = parse(&[0x81, 0x00, 0x02, 0x01, 0x80, 0x00, 0x00]).expect("parse");
    assert!(matches!(
        by_zero.evaluate_one(&mut Scratch::new()),
        Err(VnError::Evaluation(_))
    ));
}

#[test]
fn memory_read_inside_comparison() {
    // mem[3] == 0
    let av = parse(&[
        0x28, 0x02, 0x83, 0x00, 0x0c, 0x01, 0x80, 0x00, 0x00,
    ])
    .expect("parse");
    assert_eq!(av.to_string(), "[(mem[3] == 0)]");
    let mut ctx = Scratch::new();
    assert_eq!(av.evaluate_one(&mut ctx).expect("eq"), 1);
    ctx.memory[3] = 4;
    assert_eq!(av.evaluate_one(&mut ctx).expect("ne"), 0);
}

#[test]
fn truncated_value_reports_bounds() {
    let err = parse(&[0x83, 0x00, 0x03]).expect_err("no terminator");
    assert!(matches!(err, VnError::DomainBounds { .. }));
}
