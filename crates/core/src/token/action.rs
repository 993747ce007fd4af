/// What the runtime does with an event-script token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventAction {
    /// Shape known, meaning unknown.
    Data,
    /// Names a script through a data chunk; only contributes a callgraph edge.
    ScriptLink,
    /// Jump table stored in a data chunk; only contributes callgraph edges.
    JumpTable,
    End,
    Jump,
    ReturnableJump,
    CondJump,
    LoadR1,
    RegJump,
    Return,
    FileJump,
    ReturnableFileJump,
    Background,
    PartialBackground,
    ScrollBackground,
    PanZoom,
    ScrollPan,
    Fade,
    /// Slot, filename, position. One-based slots are shifted down by one.
    CharArt { one_based: bool },
    CharArtPair,
    CharArtTriple,
    ClearCharArt { one_based: bool },
    ClearAll,
    TextboxOff,
    ChoiceStore { check_id: bool },
    Memop,
    LoadConversation,
    Movie,
    VoicePush,
}

impl EventAction {
    /// True for tokens the runtime cannot act on.
    pub fn is_unsupported(self) -> bool {
        matches!(
            self,
            EventAction::Data | EventAction::ScriptLink | EventAction::JumpTable
        )
    }
}

/// What the runtime does with a conversation-script token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConvAction {
    Data,
    Linefeed,
    UserAck,
    /// Precedes text at the start of a box; its operand is always 0.
    BlockPrefix,
    ChoiceEntry,
    ChoiceOption,
    Voice,
    Section,
    TextAux,
}
