use super::*;
use crate::runtime::{CharArtSlot, PlaybackState};

fn sample_save() -> SaveData {
    let mut state = PathState::new("op00", 7);
    state.memory[5] = 13;
    state.es_index = 4;
    state.es_pos = 2;
    state.status = PlaybackState::UserAck;
    state.charart.insert(
        0,
        CharArtSlot {
            image: "TSU01".to_string(),
            x: 200,
        },
    );
    SaveData::new([1u8; 32], state, 3)
}

#[test]
fn save_roundtrip_keeps_state() {
    let save = sample_save();
    let encoded = save.to_binary().expect("encode");
    assert_eq!(&encoded[0..4], b"S3SV");
    assert_eq!(u16::from_le_bytes([encoded[4], encoded[5]]), SAVE_FORMAT_VERSION);
    let decoded = SaveData::from_binary(&encoded).expect("decode");
    assert_eq!(decoded, save);
    assert_eq!(decoded.state.memory[5], 13);
}

#[test]
fn header_checks_fail_in_order() {
    let encoded = sample_save().to_binary().expect("encode");

    assert_eq!(SaveData::from_binary(&encoded[..10]), Err(SaveError::TooSmall));

    let mut bad_magic = encoded.clone();
    bad_magic[0] = b'X';
    assert_eq!(SaveData::from_binary(&bad_magic), Err(SaveError::InvalidMagic));

    let mut bad_version = encoded.clone();
    bad_version[4] = 99;
    assert_eq!(
        SaveData::from_binary(&bad_version),
        Err(SaveError::IncompatibleVersion {
            found: 99,
            expected: SAVE_FORMAT_VERSION
        })
    );

    assert_eq!(
        SaveData::from_binary(&encoded[..HEADER_LEN]),
        Err(SaveError::MissingPayload)
    );

    let truncated = &encoded[..encoded.len() - 1];
    assert_eq!(SaveData::from_binary(truncated), Err(SaveError::LengthMismatch));

    let mut flipped = encoded.clone();
    let last = flipped.len() - 1;
    flipped[last] ^= 0xff;
    assert_eq!(SaveData::from_binary(&flipped), Err(SaveError::ChecksumMismatch));
}

#[test]
fn script_id_must_match() {
    let save = sample_save();
    assert!(save.validate_script_id(&[1u8; 32]).is_ok());
    assert_eq!(
        save.validate_script_id(&[2u8; 32]),
        Err(SaveError::ScriptMismatch)
    );
}

#[test]
fn script_ids_render_as_hex() {
    let mut id = [0u8; 32];
    id[0] = 0xab;
    id[31] = 0x01;
    let hex = script_id_hex(&id);
    assert_eq!(hex.len(), 64);
    assert!(hex.starts_with("ab00"));
    assert!(hex.ends_with("01"));
}
