//! Ever17 opcode tables.

use std::sync::OnceLock;

use crate::registry::{OpDef, OpcodeTable};
use crate::token::Field::{self, *};
use crate::token::{ConvAction, EventAction};

type Ev = OpDef<EventAction>;
type Cv = OpDef<ConvAction>;

const fn ev(op: u8, name: &'static str, shape: &'static [Field]) -> Ev {
    OpDef::new(op, name, shape, EventAction::Data)
}

pub(crate) static EVENT_00: &[Ev] = &[
    ev(0x00, "nop", &[]),
    ev(0x01, "branch", &[Av, Av, Esr]),
    ev(0x03, "unk", &[]),
    OpDef::new(
        0x04,
        "scene-link",
        &[Nulls(1), Av, EsrData, Bytes(2), Av, U16],
        EventAction::ScriptLink,
    ),
    ev(0x05, "unk", &[Av]),
    OpDef::new(0x06, "end", &[End], EventAction::End).breaks(),
    OpDef::new(0x07, "jump", &[Esr, End], EventAction::Jump).breaks(),
    OpDef::new(0x08, "jump-table", &[Av, EsrData, End], EventAction::JumpTable).breaks(),
    OpDef::new(0x0a, "cond-jump", &[U8, Av, Esr], EventAction::CondJump).breaks(),
    OpDef::new(0x0b, "call", &[Esr], EventAction::ReturnableJump).breaks(),
    ev(0x0d, "unk", &[Av, Bytes(2)]),
    OpDef::new(0x0e, "return", &[End], EventAction::Return).breaks(),
    ev(0x0f, "unk", &[U16, Av]),
    ev(0x10, "branch", &[U8, Av, Esr]),
    ev(0x11, "unk", &[U8, Av]),
    ev(0x12, "unk", &[Av]),
    ev(0x13, "unk", &[Av]),
    OpDef::new(0x15, "jump", &[U8, Av, Av, Esr], EventAction::Jump).breaks(),
    ev(0x19, "unk", &[Av, Av]),
    ev(0x1a, "unk", &[]),
    ev(0x21, "unk", &[]),
    ev(0x23, "unk", &[]),
    ev(0x24, "unk", &[]),
    ev(0x25, "unk", &[U8]),
    OpDef::new(0x26, "load-r1", &[Av], EventAction::LoadR1),
    OpDef::new(0x27, "r1-jump", &[Av, Esr], EventAction::RegJump).breaks(),
    ev(0x28, "unk", &[]),
];

pub(crate) static EVENT_01: &[Ev] = &[
    ev(0x00, "branch", &[Esr]),
    ev(0x01, "unk", &[Av, Av]),
    ev(0x03, "unk", &[AvN(20), U16]),
    ev(0x04, "unk", &[Av]),
    ev(0x06, "unk", &[Av, Av, EsrData]),
    ev(0x07, "unk", &[Av, Av]),
    ev(0x13, "unk", &[Bytes(16), EsrData]),
    ev(0x14, "unk", &[Av, Av]),
    ev(0x15, "unk", &[Av, Av]),
    ev(0x16, "unk", &[Av, Av]),
    ev(0x18, "unk", &[]),
    ev(0x19, "unk", &[Av, Av, Bytes(4)]),
];

pub(crate) static EVENT_10: &[Ev] = &[
    ev(0x00, "unk", &[]),
    OpDef::new(0x01, "file-jump", &[CStr(0), End], EventAction::FileJump).breaks(),
    ev(0x03, "bgm", &[Av, Av]),
    ev(0x04, "bgm-stop", &[]),
    ev(0x05, "sound", &[Text(0), Av, Av]),
    ev(0x06, "unk", &[]),
    ev(0x07, "unk", &[]),
    ev(0x08, "unk", &[Text(0), Bytes(2)]),
    OpDef::new(0x0c, "bgi", &[Fnr, Av, Av], EventAction::Background),
    OpDef::new(0x0d, "bg-fade", &[Av, Av, Av], EventAction::Fade),
    ev(0x0e, "unk", &[Av]),
    OpDef::new(
        0x0f,
        "charart",
        &[Av, Fnr, Av, Av],
        EventAction::CharArt { one_based: true },
    ),
    OpDef::new(
        0x10,
        "charart-clear",
        &[Av, Av],
        EventAction::ClearCharArt { one_based: true },
    ),
    OpDef::new(
        0x12,
        "charart-2",
        &[Av, Av, Fnr, Fnr, Av, Av, Av],
        EventAction::CharArtPair,
    ),
    OpDef::new(0x13, "charart-clear-all", &[Av, Av], EventAction::ClearAll),
    ev(0x14, "unk", &[Av, Av, Av]),
    ev(0x15, "unk", &[Av, Av]),
    OpDef::new(
        0x16,
        "charart-3",
        &[Fnr, Fnr, Fnr, Av, Av, Av, Av],
        EventAction::CharArtTriple,
    ),
    OpDef::new(0x18, "textbox-off", &[], EventAction::TextboxOff),
    ev(0x19, "unk", &[]),
    OpDef::new(
        0x1a,
        "choice-store",
        &[Av, Av],
        EventAction::ChoiceStore { check_id: true },
    )
    .breaks(),
    ev(0x1b, "unk", &[Av]),
    OpDef::new(0x1d, "bgi", &[Fnr], EventAction::Background),
    ev(0x1e, "delay", &[Av]),
    ev(0x1f, "time", &[Av, Av]),
    ev(0x20, "effect", &[Av]),
    ev(0x21, "unk", &[Av]),
    ev(0x23, "unk", &[Av]),
    ev(0x24, "unk", &[Av]),
    ev(0x25, "unk", &[Av]),
    ev(0x26, "unk", &[Av]),
    OpDef::new(0x27, "bgi", &[Fnr, Av, Av], EventAction::Background),
    ev(0x29, "unk", &[]),
    ev(0x2a, "unk", &[Av]),
    ev(0x2b, "unk", &[Av]),
    ev(0x2c, "unk", &[U8, Av]),
    ev(0x2d, "unk", &[Av]),
    ev(0x2e, "unk", &[Av, Av]),
    ev(0x37, "wallpaper", &[Fnr]),
    ev(0x38, "unk", &[]),
    OpDef::new(0x39, "movie", &[Ascii(0)], EventAction::Movie),
    ev(0x3a, "unk", &[]),
    ev(0x3b, "unk", &[Av]),
    ev(0x3c, "unk", &[]),
    ev(0x3f, "unk", &[Av]),
    OpDef::new(
        0x40,
        "bgi-partial",
        &[Fnr, AvN(6)],
        EventAction::PartialBackground,
    ),
    OpDef::new(0x41, "bgi-panzoom", &[AvN(5)], EventAction::PanZoom),
    ev(0x43, "unk", &[Av]),
    ev(0x44, "unk", &[Bytes(2)]),
    ev(0x45, "unk", &[Av, Av]),
    ev(0x46, "perspective", &[Av]),
];

pub(crate) static EVENT_80: &[Ev] = &[
    ev(0x05, "unk", &[Bytes(4)]),
    ev(0x13, "unk", &[U16]),
    ev(0x18, "unk", &[U8, S16, S16]),
];

pub(crate) static EVENT_DIRECT: &[Ev] = &[
    OpDef::new(0xfe, "memop", &[Av], EventAction::Memop),
    OpDef::new(0xff, "conv", &[Convr], EventAction::LoadConversation).breaks(),
];

static CONV: &[Cv] = &[
    OpDef::new(0x00, "unk", &[], ConvAction::Data),
    OpDef::new(0x01, "linefeed", &[], ConvAction::Linefeed),
    OpDef::new(0x02, "ack", &[], ConvAction::UserAck),
    OpDef::new(0x03, "unk", &[], ConvAction::Data),
    OpDef::new(0x04, "unk", &[Av], ConvAction::Data),
    OpDef::new(0x05, "prefix", &[AvZero], ConvAction::BlockPrefix),
    OpDef::new(0x0b, "choice", &[ChoiceEntry], ConvAction::ChoiceEntry).breaks(),
    OpDef::new(0x0c, "unk", &[], ConvAction::Data),
    OpDef::new(0x0d, "voice", &[Ascii(0)], ConvAction::Voice),
    OpDef::new(0x0e, "section", &[], ConvAction::Section).breaks(),
    OpDef::new(0x10, "aux", &[U8], ConvAction::TextAux),
    OpDef::new(0x11, "text-ext", &[Const(&[0x03]), TextOpen], ConvAction::Data),
];

static EVENT_TABLE: OnceLock<OpcodeTable<EventAction>> = OnceLock::new();
static CONV_TABLE: OnceLock<OpcodeTable<ConvAction>> = OnceLock::new();

pub fn event_table() -> &'static OpcodeTable<EventAction> {
    EVENT_TABLE.get_or_init(|| {
        let mut table = OpcodeTable::from_defs(EVENT_DIRECT);
        table.insert_sub(0x00, OpcodeTable::from_defs(EVENT_00));
        table.insert_sub(0x01, OpcodeTable::from_defs(EVENT_01));
        table.insert_sub(0x10, OpcodeTable::from_defs(EVENT_10));
        table.insert_sub(0x80, OpcodeTable::from_defs(EVENT_80));
        table
    })
}

pub fn conv_table() -> &'static OpcodeTable<ConvAction> {
    CONV_TABLE.get_or_init(|| OpcodeTable::from_defs(CONV))
}
