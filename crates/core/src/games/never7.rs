//! Never7 opcode tables, layered over the Ever17 ones.

use std::sync::OnceLock;

use crate::registry::{OpDef, OpcodeTable};
use crate::token::Field::{self, *};
use crate::token::{ConvAction, EventAction};

use super::ever17;

type Ev = OpDef<EventAction>;
type Cv = OpDef<ConvAction>;

const fn ev(op: u8, name: &'static str, shape: &'static [Field]) -> Ev {
    OpDef::new(op, name, shape, EventAction::Data)
}

const fn cv(op: u8, name: &'static str, shape: &'static [Field], action: ConvAction) -> Cv {
    OpDef::new(op, name, shape, action).breaks()
}

/// Ever17 `00` opcodes carried over unchanged.
const SHARED_00: &[u8] = &[
    0x00, 0x01, 0x03, 0x05, 0x06, 0x07, 0x08, 0x0a, 0x0b, 0x0d, 0x0e, 0x0f, 0x10, 0x11, 0x13,
    0x15, 0x19, 0x1a,
];

static OVERRIDE_00: &[Ev] = &[
    ev(0x04, "scene-link", &[U8, Av, EsrData]),
    ev(0x0c, "unk", &[Av, Nulls(2)]),
    OpDef::new(0x0e, "return", &[End], EventAction::Return).breaks(),
    ev(0x12, "unk", &[Av]),
    ev(0x20, "unk", &[]),
    ev(0x21, "unk", &[]),
    ev(0x22, "unk", &[Av]),
];

static OVERRIDE_01: &[Ev] = &[
    ev(0x02, "unk", &[Av, Av, Fnr, Av, EsrData]),
    ev(0x03, "unk", &[AvN(4), EsrData]),
    ev(0x13, "unk", &[Av, Av, Fnr, Av, EsrData]),
    ev(0x17, "unk", &[Av, Av]),
];

static OVERRIDE_10: &[Ev] = &[
    ev(0x00, "unk", &[]),
    ev(0x01, "effect", &[Av]),
    ev(0x02, "unk", &[Av]),
    OpDef::new(
        0x03,
        "choice-store",
        &[Av],
        EventAction::ChoiceStore { check_id: false },
    )
    .breaks(),
    OpDef::new(0x04, "file-jump", &[CStr(0), End], EventAction::FileJump).breaks(),
    OpDef::new(
        0x05,
        "file-call",
        &[Av, CStr(0)],
        EventAction::ReturnableFileJump,
    )
    .breaks(),
    ev(0x06, "unk", &[Av]),
    ev(0x07, "unk", &[]),
    ev(0x08, "sound", &[CStr(0), Av]),
    ev(0x09, "unk", &[]),
    ev(0x0a, "unk", &[]),
    OpDef::new(0x0b, "voice", &[CStr(0)], EventAction::VoicePush),
    OpDef::new(
        0x0c,
        "bgi-scroll",
        &[Fnr, Av, Av, Av],
        EventAction::ScrollBackground,
    ),
    ev(0x0d, "unk", &[Av]),
    OpDef::new(0x0e, "bgi-pan", &[Av, Av], EventAction::ScrollPan),
    ev(0x0f, "unk", &[Av, Av, Av]),
    OpDef::new(0x10, "bgi", &[Fnr, Av, Av], EventAction::Background),
    OpDef::new(
        0x11,
        "charart",
        &[Av, Fnr, Av, Av],
        EventAction::CharArt { one_based: false },
    ),
    OpDef::new(
        0x12,
        "charart-clear",
        &[Av, Av],
        EventAction::ClearCharArt { one_based: false },
    ),
    ev(0x14, "unk", &[Nulls(4), U16, Av, Nulls(4), U16, Av]),
    OpDef::new(0x15, "charart-clear-all", &[Av], EventAction::ClearAll),
    ev(0x16, "unk", &[Av, Av]),
    ev(0x17, "time", &[]),
    ev(0x1a, "unk", &[Av]),
    ev(0x1b, "unk", &[Fnr]),
    ev(0x1c, "unk", &[]),
    ev(0x1e, "unk", &[]),
    OpDef::new(0x22, "movie", &[CStr(0)], EventAction::Movie),
    ev(0x23, "unk", &[]),
    ev(0x27, "unk", &[Av]),
    ev(0x28, "unk", &[]),
    ev(0x29, "unk", &[]),
    ev(0x2c, "unk", &[Av]),
    ev(0x2d, "unk", &[]),
    ev(0x2e, "unk", &[Av]),
];

static OVERRIDE_80: &[Ev] = &[
    ev(0x01, "unk", &[U16, Esr]),
    ev(0x11, "unk", &[Bytes(3)]),
    ev(0x12, "unk", &[U16]),
];

static CONV: &[Cv] = &[
    cv(0x00, "end", &[], ConvAction::Data),
    cv(0x01, "linefeed", &[], ConvAction::Linefeed),
    OpDef::new(0x02, "ack", &[], ConvAction::UserAck),
    OpDef::new(0x03, "unk", &[], ConvAction::Data),
    cv(0x04, "aux", &[Av], ConvAction::TextAux),
    cv(0x05, "unk", &[Av, Av], ConvAction::Data),
    cv(0x0b, "option", &[U8, TextOpen], ConvAction::ChoiceOption),
    cv(0x0c, "unk", &[], ConvAction::Data),
];

static EVENT_TABLE: OnceLock<OpcodeTable<EventAction>> = OnceLock::new();
static CONV_TABLE: OnceLock<OpcodeTable<ConvAction>> = OnceLock::new();

pub fn event_table() -> &'static OpcodeTable<EventAction> {
    EVENT_TABLE.get_or_init(|| {
        let base = ever17::event_table();
        let mut table = base.clone();
        let mut table_00 = base
            .sub_table(0x00)
            .map(|sub| sub.select(SHARED_00))
            .unwrap_or_default();
        table_00.override_with(OVERRIDE_00);
        table.insert_sub(0x00, table_00);
        table.override_sub(0x01, OVERRIDE_01);
        table.override_sub(0x10, OVERRIDE_10);
        table.override_sub(0x80, OVERRIDE_80);
        table
    })
}

pub fn conv_table() -> &'static OpcodeTable<ConvAction> {
    CONV_TABLE.get_or_init(|| OpcodeTable::from_defs(CONV))
}
