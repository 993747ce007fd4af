use super::*;
use crate::registry::{Entry, OpPath};
use std::sync::Arc;

fn leaf<A: 'static>(table: &OpcodeTable<A>, path: OpPath) -> &'static crate::registry::OpDef<A> {
    let entry = match path.prefix {
        Some(prefix) => table.sub_table(prefix).and_then(|sub| sub.entry(path.op)),
        None => table.entry(path.op),
    };
    match entry {
        Some(Entry::Leaf(def)) => *def,
        _ => panic!("no definition at {path}"),
    }
}

#[test]
fn never7_shares_untouched_definitions() {
    let e17 = Game::Ever17.event_table();
    let n7 = Game::Never7.event_table();
    for path in [OpPath::direct(0xfe), OpPath::direct(0xff), OpPath::nested(0x00, 0x07)] {
        assert!(
            std::ptr::eq(leaf(e17, path), leaf(n7, path)),
            "{path} should be shared"
        );
    }
}

#[test]
fn never7_overrides_leave_ever17_untouched() {
    let e17 = Game::Ever17.event_table();
    let n7 = Game::Never7.event_table();
    let bgi = OpPath::nested(0x10, 0x0c);
    assert_eq!(leaf(e17, bgi).action, EventAction::Background);
    assert_eq!(leaf(n7, bgi).action, EventAction::ScrollBackground);
    assert_eq!(
        leaf(n7, OpPath::nested(0x10, 0x03)).action,
        EventAction::ChoiceStore { check_id: false }
    );
    assert_eq!(
        leaf(e17, OpPath::nested(0x10, 0x1a)).action,
        EventAction::ChoiceStore { check_id: true }
    );
    assert!(!Arc::ptr_eq(
        e17.sub_table(0x10).expect("e17 10"),
        n7.sub_table(0x10).expect("n7 10")
    ));
}

#[test]
fn never7_drops_ever17_only_00_opcodes() {
    let n7 = Game::Never7.event_table();
    let sub = n7.sub_table(0x00).expect("00 table");
    assert!(sub.entry(0x27).is_none());
    assert!(sub.entry(0x22).is_some());
    assert!(Game::Ever17
        .event_table()
        .sub_table(0x00)
        .and_then(|sub| sub.entry(0x27))
        .is_some());
}

#[test]
fn every_chunk_ending_opcode_breaks_the_row() {
    for game in [Game::Ever17, Game::Never7] {
        for (path, def) in game.event_table().definitions() {
            if def.ends_chunk() {
                assert!(def.linebreak, "{game} {path} ends a chunk without a break");
            }
        }
    }
}

#[test]
fn conversation_tables_differ_per_game() {
    let e17 = Game::Ever17.conv_table();
    let n7 = Game::Never7.conv_table();
    assert_eq!(leaf(e17, OpPath::direct(0x0d)).action, ConvAction::Voice);
    assert!(n7.entry(0x0d).is_none());
    assert_eq!(leaf(n7, OpPath::direct(0x0b)).action, ConvAction::ChoiceOption);
}

#[test]
fn game_names_parse_and_display() {
    assert_eq!("E17".parse::<Game>().expect("e17"), Game::Ever17);
    assert_eq!("never7".parse::<Game>().expect("n7"), Game::Never7);
    assert!("remember11".parse::<Game>().is_err());
    assert_eq!(Game::Never7.to_string(), "never7");
    assert_eq!(Game::Ever17.start_script(), "op00");
    assert_eq!(Game::Never7.voice_archive(), "wave.dat");
    assert_eq!(Game::default(), Game::Ever17);
}
