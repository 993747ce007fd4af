use super::*;

/// `lnd` chunk whose body expands to `plain_len` copies of `byte`.
fn lnd_chunk(byte: u8, plain_len: u8) -> Vec<u8> {
    let mut out = LND_MAGIC.to_vec();
    out.extend([0u8; 4]);
    out.extend(u32::from(plain_len).to_le_bytes());
    out.extend([0u8; 4]);
    out.extend([0xc0 | (plain_len - 2), byte]);
    out
}

fn sample() -> LnkArchive {
    let compressed = lnd_chunk(b'z', 6);
    LnkArchive::build([
        ("OP00.SCR", &b"SC3\0body"[..], false),
        ("BG01.CPS", compressed.as_slice(), true),
    ])
    .expect("builds")
}

#[test]
fn entries_are_found_case_insensitively() {
    let archive = sample();
    assert_eq!(archive.entries().len(), 2);
    let entry = archive.find("op00.scr").expect("entry");
    assert_eq!(entry.offset, 16 + 2 * 32);
    assert_eq!(entry.len, 8);
    assert!(!entry.compressed);
    assert_eq!(archive.plain(entry).expect("plain").get_data(), b"SC3\0body");
    assert!(archive.find("op01.scr").is_none());
}

#[test]
fn compressed_entries_are_unpacked() {
    let archive = sample();
    let entry = archive.find("bg01.cps").expect("entry");
    assert!(entry.compressed);
    assert_eq!(archive.stored(entry).expect("stored").len(), 18);
    assert_eq!(archive.plain(entry).expect("plain").get_data(), b"zzzzzz");
}

#[test]
fn write_reproduces_the_layout() {
    let archive = sample();
    let bytes = archive.write().expect("writes");
    let reparsed = LnkArchive::parse(Domain::new(bytes.clone())).expect("parses");
    assert_eq!(reparsed.entries(), archive.entries());
    assert_eq!(reparsed.write().expect("writes"), bytes);
    assert_eq!(&bytes[..4], b"LNK\0");
    assert_eq!(u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), 2);
    assert_eq!(u32::from_le_bytes([bytes[20], bytes[21], bytes[22], bytes[23]]), 16);
    assert_eq!(u32::from_le_bytes([bytes[52], bytes[53], bytes[54], bytes[55]]), 37);
}

#[test]
fn malformed_archives_are_rejected() {
    let mut bytes = sample().write().expect("writes");
    bytes.push(0);
    assert!(matches!(
        LnkArchive::parse(Domain::new(bytes.clone())),
        Err(AssetError::InvalidArchive(_))
    ));
    bytes[0] = b'X';
    assert!(matches!(
        LnkArchive::parse(Domain::new(bytes)),
        Err(AssetError::InvalidArchive(_))
    ));
    assert!(matches!(
        LnkArchive::parse(Domain::new(b"LNK\0".to_vec())),
        Err(AssetError::InvalidArchive(_))
    ));
}

#[test]
fn long_names_do_not_fit() {
    let name = "a".repeat(25);
    assert!(LnkArchive::build([(name.as_str(), &b""[..], false)]).is_err());
}

#[test]
fn missing_lnd_preamble_is_a_compression_error() {
    let archive = LnkArchive::build([("X.WAF", &b"nope-nope-nope-nope"[..], true)]).expect("builds");
    let entry = archive.find("x.waf").expect("entry");
    assert!(matches!(
        archive.plain(entry),
        Err(AssetError::Compression(_))
    ));
}
