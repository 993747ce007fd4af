//! Tokenizer and bytecode interpreter for the SC3 scripts of Ever17 and
//! Never7.
//!
//! [`script::ScriptFile`] splits an SC3 container into chunks and tokenizes
//! them against the opcode tables in [`games`]. [`runtime::Interpreter`]
//! executes event tokens and drives a [`runtime::Frontend`].

pub mod av;
pub mod config;
pub mod cursor;
pub mod domain;
pub mod error;
pub mod format;
pub mod games;
pub mod graph;
pub mod registry;
pub mod runtime;
pub mod script;
pub mod storage;
pub mod text;
pub mod token;
pub mod trace;
pub mod version;

#[cfg(test)]
#[path = "tests/fixture.rs"]
pub(crate) mod tests_fixture;

pub use av::{ActiveValue, AvContext};
pub use config::{ConfigError, EngineConfig, MediaLimits};
pub use domain::Domain;
pub use error::{TokenizeFailure, VnError, VnResult};
pub use format::{FormatOptions, ParseStats, TokenFormatter};
pub use games::Game;
pub use graph::CallGraph;
pub use runtime::{
    Frontend, Interpreter, MediaRef, MediaStorage, PathState, PlaybackState, RuntimeOptions,
};
pub use script::{ParseOptions, ScriptFile};
pub use storage::{SaveData, SaveError};
pub use token::{Token, TokenKind};
pub use trace::{ChoicePolicy, FrontendCall, PlaybackTrace, RecordingFrontend};
