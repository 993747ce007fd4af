mod common;

use common::{av, av_load, av_store, concat, fnr, MemoryMedia, Sc3Builder};
use sc3_engine::storage::SaveData;
use sc3_engine::trace::StateDigest;
use sc3_engine::{
    ChoicePolicy, FrontendCall, Game, Interpreter, PlaybackState, PlaybackTrace,
    RecordingFrontend, RuntimeOptions, VnError,
};

fn option(text: &str) -> Vec<u8> {
    concat(&[&[0x0b, 0x02], &av(1), text.as_bytes(), &[0x01]])
}

/// Background, one line of text, a two-way choice stored in mem[5], and a
/// branch on the answer that sets mem[6].
fn story() -> Sc3Builder {
    Sc3Builder::new()
        .event(concat(&[
            &[0x10, 0x0c],
            &fnr(0),
            &av(1),
            &av(2),
            &[0xff, 0x00, 0x00],
            &[0xff, 0x01, 0x00],
            &[0x10, 0x1a],
            &av(5),
            &av(7),
            &[0x00, 0x0a, 0x01],
            &av_load(5),
            &[0x01, 0x00],
            &[0x00, 0x06],
        ]))
        .event(concat(&[&[0xfe], &av_store(6, 1), &[0x00, 0x06]]))
        .conv(concat(&[b"Hello", &[0x02]]))
        .conv(concat(&[
            &[0x0b, 0x00, 0x07, 0x00],
            &option("Left"),
            &option("Right"),
        ]))
        .filename("BG01")
}

fn media() -> MemoryMedia {
    MemoryMedia::new()
        .with_script("op00", &story())
        .with("background", "bg01", vec![0xcc; 4])
}

fn options() -> RuntimeOptions {
    RuntimeOptions {
        game: Game::Ever17,
        seed: Some(3),
        continue_on_error: false,
        ..RuntimeOptions::default()
    }
}

fn interpreter(policy: ChoicePolicy) -> Interpreter<MemoryMedia, RecordingFrontend> {
    Interpreter::new(media(), RecordingFrontend::new(policy), options()).expect("starts")
}

#[test]
fn trace_records_each_yield() {
    let mut interpreter = interpreter(ChoicePolicy::Scripted(vec![1]));
    let trace = PlaybackTrace::record(&mut interpreter, 10).expect("plays");

    let statuses: Vec<PlaybackState> = trace.steps.iter().map(|step| step.status).collect();
    assert_eq!(
        statuses,
        vec![
            PlaybackState::GraphicsOp,
            PlaybackState::UserAck,
            PlaybackState::Choice,
            PlaybackState::Ended,
        ]
    );
    assert!(matches!(
        trace.steps[0].calls.last(),
        Some(FrontendCall::DisplayBackground { name, .. }) if name == "BG01"
    ));
    assert_eq!(
        trace.steps[1].calls,
        vec![FrontendCall::Textblock {
            lines: vec!["Hello".to_string()],
            voice: None,
        }]
    );
    assert_eq!(
        trace.steps[2].calls,
        vec![FrontendCall::Choice {
            options: vec!["Left".to_string(), "Right".to_string()],
            answer: Some(1),
        }]
    );

    let last = &trace.steps[3].state;
    assert_eq!(last.es_index, 1);
    assert_eq!(last.memory.get(&5), Some(&1));
    assert_eq!(last.memory.get(&6), Some(&1));
    assert_eq!(last.background.as_deref(), Some("BG01"));

    let json = trace.to_json().expect("json");
    assert!(json.contains("\"kind\": \"display_background\""));
    assert!(json.contains("\"status\": \"choice\""));
}

#[test]
fn first_option_skips_the_branch() {
    let mut interpreter = interpreter(ChoicePolicy::First);
    assert_eq!(interpreter.run(10).expect("plays"), PlaybackState::Ended);
    let state = interpreter.state();
    assert_eq!(state.memory[5], 0);
    assert_eq!(state.memory[6], 0);
    assert_eq!(state.es_index, 0);
    assert_eq!(interpreter.backlog().len(), 2);
}

#[test]
fn saves_resume_on_a_fresh_interpreter() {
    let mut first = interpreter(ChoicePolicy::Scripted(vec![1]));
    assert_eq!(first.run(2).expect("plays"), PlaybackState::UserAck);
    let save = SaveData::new(
        first.script().script_id(),
        first.get_path_state(),
        first.backlog().len(),
    );
    let bytes = save.to_binary().expect("encodes");

    let loaded = SaveData::from_binary(&bytes).expect("decodes");
    let mut second = interpreter(ChoicePolicy::Scripted(vec![1]));
    loaded
        .validate_script_id(&second.script().script_id())
        .expect("same script");
    second.restore_state(loaded.state).expect("restores");
    assert_eq!(
        StateDigest::from_state(second.state()),
        StateDigest::from_state(first.state())
    );

    assert_eq!(second.run(10).expect("plays"), PlaybackState::Ended);
    assert_eq!(second.state().memory[6], 1);
}

#[test]
fn missing_start_script_is_a_media_error() {
    let options = RuntimeOptions {
        start_script: Some("nowhere".to_string()),
        ..options()
    };
    let result = Interpreter::new(media(), RecordingFrontend::default(), options);
    assert!(matches!(
        result.err().map(|err| err.root().to_string()),
        Some(message) if message.contains("nowhere")
    ));
    let err = Interpreter::new(
        MemoryMedia::new(),
        RecordingFrontend::default(),
        RuntimeOptions::default(),
    )
    .err()
    .expect("no scripts");
    assert!(matches!(err.root(), VnError::Media { kind: "script", .. }));
}
