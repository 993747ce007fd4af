use super::*;
use crate::error::VnError;
use crate::games::Game;
use crate::graph::Edge;
use crate::tests_fixture::{av, concat, Sc3Builder};

fn event_op(token: &Token) -> &OpToken<EventAction> {
    match token.kind() {
        TokenKind::Event(op) => op,
        other => panic!("expected event op, got {other:?}"),
    }
}

#[test]
fn scene_link_points_at_the_named_script() {
    let script = Sc3Builder::new()
        .event(concat(&[
            &[0x00, 0x04, 0x00],
            &av(0),
            &[0x01, 0x00, 0xaa, 0xbb],
            &av(0),
            &[0x00, 0x00],
        ]))
        .event(b"EP01\0\0".to_vec())
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    assert_eq!(tokens.len(), 1);
    let op = event_op(&tokens[0]);
    assert_eq!(op.def().action, EventAction::ScriptLink);
    assert!(op.def().action.is_unsupported());
    assert_eq!(
        tokens[0].edges(&script),
        vec![Edge::to_script("ep01.scr".to_string())]
    );
}

#[test]
fn debug_scene_link_has_no_edge() {
    let script = Sc3Builder::new()
        .event(concat(&[
            &[0x00, 0x04, 0x00],
            &av(0),
            &[0x01, 0x00, 0x00, 0x00],
            &av(0),
            &[0x00, 0x00],
        ]))
        .event(b"debug\0".to_vec())
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    assert!(tokens[0].edges(&script).is_empty());
}

#[test]
fn jump_table_edges_come_from_the_data_chunk() {
    let script = Sc3Builder::new()
        .event(concat(&[&[0x00, 0x08], &av(0), &[0x01, 0x00]]))
        .event(vec![0x02, 0x00, 0x03, 0x00])
        .event(vec![0x00, 0x06])
        .event(vec![0x00, 0x06])
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    assert_eq!(
        tokens[0].edges(&script),
        vec![Edge::local(2), Edge::local(3)]
    );
}

#[test]
fn file_jump_lowercases_the_target() {
    let script = Sc3Builder::new()
        .event(concat(&[&[0x10, 0x01], b"EP02\0"]))
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    let op = event_op(&tokens[0]);
    assert_eq!(op.bytes(0).expect("name"), b"EP02");
    assert_eq!(
        tokens[0].edges(&script),
        vec![Edge::to_script("ep02.scr".to_string())]
    );
    assert!(tokens[0].linebreak());
}

#[test]
fn conditional_jump_has_a_local_edge() {
    let script = Sc3Builder::new()
        .event(concat(&[&[0x00, 0x0a, 0x01], &av(1), &[0x01, 0x00]]))
        .event(vec![0x00, 0x06])
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    let op = event_op(&tokens[0]);
    assert_eq!(op.u8(0).expect("mode"), 1);
    assert_eq!(
        op.esr(2).expect("target"),
        EsRef {
            index: 1,
            data: false
        }
    );
    assert_eq!(tokens[0].edges(&script), vec![Edge::local(1)]);
}

#[test]
fn accessor_mismatch_is_a_state_error() {
    let script = Sc3Builder::new()
        .event(concat(&[&[0x10, 0x1e], &av(5)]))
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    let op = event_op(&tokens[0]);
    assert_eq!(op.av(0).expect("av").to_string(), "[5]");
    assert!(matches!(op.u8(0), Err(VnError::RuntimeState(_))));
    assert!(matches!(op.operand(3), Err(VnError::RuntimeState(_))));
    assert!(!tokens[0].linebreak());
}

#[test]
fn choice_entries_format_and_expose_text() {
    let script = Sc3Builder::new()
        .event(vec![0x00, 0x06])
        .conv(concat(&[
            &[0x0b, 0x00, 0x07, 0x00],
            &[0x0b, 0x01],
            b"Yes",
            &[0x01],
            &[0x0b, 0x02],
            &av(1),
            b"No",
            &[0x01],
        ]))
        .parse(Game::Ever17);
    let tokens = script.tokenize_conv(0, false).expect("conv");
    assert_eq!(tokens.len(), 3);
    assert_eq!(tokens[0].format_hr(&script), "0b choice: question 7");
    assert!(tokens[0].text_lines().is_empty());
    assert_eq!(tokens[1].format_hr(&script), "0b choice: \"Yes\"");
    assert_eq!(tokens[1].text_lines(), vec!["Yes".to_string()]);
    assert_eq!(tokens[2].format_hr(&script), "0b choice: \"No\" if [1]");
    assert_eq!(tokens[2].conv_action(), Some(ConvAction::ChoiceEntry));
}

#[test]
fn conversation_reference_formats_its_text() {
    let script = Sc3Builder::new()
        .event(vec![0xff, 0x00, 0x00])
        .conv(concat(&[b"Hello", &[0x02]]))
        .parse(Game::Ever17);
    let tokens = script.tokenize_event(0, false).expect("tokenize");
    assert_eq!(tokens[0].format_hr(&script), "ff conv: cs0([\"Hello\"])");
    assert!(tokens[0].edges(&script).is_empty());
}

#[test]
fn token_types_display_as_dump_keys() {
    assert_eq!(TokenType::Op(OpPath::nested(0x10, 0x0c)).to_string(), "10-0c");
    assert_eq!(TokenType::Op(OpPath::direct(0xfe)).to_string(), "fe");
    assert_eq!(TokenType::Text.to_string(), "text");
    assert_eq!(TokenType::Textblock.to_string(), "textblock");
    assert_eq!(TokenType::NonTokenData.to_string(), "data");
}

#[test]
fn textblock_formats_its_voice() {
    let block = Token::new(
        0,
        None,
        TokenKind::Textblock(Textblock {
            lines: vec!["a".to_string()],
            voice: VoiceSource::Clip(b"v1".to_vec()),
        }),
    );
    let script = Sc3Builder::new().event(vec![0x00, 0x06]).parse(Game::Ever17);
    assert_eq!(block.format_hr(&script), "textblock [\"a\"] voice 'v1'");
    assert!(block.linebreak());
}
