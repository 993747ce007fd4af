use super::*;
use sc3_engine::{Game, MediaStorage};
use std::fs;

fn write(root: &Path, rel: &str, bytes: &[u8]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().expect("parent path should exist"))
        .expect("media directory should be created");
    fs::write(path, bytes).expect("media file should be written");
}

#[test]
fn sanitize_rel_path_blocks_traversal() {
    assert_eq!(
        sanitize_rel_path(Path::new("./bg/BG01.cps")).expect("relative path"),
        PathBuf::from("bg/BG01.cps")
    );
    assert!(matches!(
        sanitize_rel_path(Path::new("../secret")),
        Err(AssetError::Traversal)
    ));
    assert!(matches!(
        sanitize_rel_path(Path::new("/etc/passwd")),
        Err(AssetError::Traversal)
    ));
}

#[test]
fn directory_storage_matches_names_case_insensitively() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "script/OP00.SCR", b"SC3\0");
    write(dir.path(), "bg/bg01.cps", b"cps");

    let mut storage = DirectoryStorage::new(dir.path(), Game::Ever17);
    assert_eq!(storage.script("op00").expect("script").get_data(), b"SC3\0");
    assert_eq!(storage.background("BG01").expect("background").get_data(), b"cps");
    assert_eq!(storage.background("bg01.cps").expect("explicit suffix").get_data(), b"cps");
}

#[test]
fn directory_storage_serves_repeated_reads_from_cache() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "chara/CH01.cps", &[1, 2, 3, 4]);

    let mut storage = DirectoryStorage::new(dir.path(), Game::Ever17).with_cache_budget(1024);
    let first = storage.character_art("ch01").expect("first read should succeed");
    assert_eq!(first.get_data(), &[1, 2, 3, 4]);
    assert_eq!(storage.cached_bytes(), 4);

    fs::remove_file(dir.path().join("chara/CH01.cps")).expect("media file should be removed");
    let second = storage
        .character_art("CH01")
        .expect("second read should be served from cache");
    assert_eq!(second.get_data(), &[1, 2, 3, 4]);
}

#[test]
fn voice_directory_follows_the_game() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "wave/N7V001.waf", b"never7");
    write(dir.path(), "voice/E17V001.waf", b"ever17");

    let mut never7 = DirectoryStorage::new(dir.path(), Game::Never7);
    assert_eq!(never7.voice("n7v001").expect("voice").get_data(), b"never7");
    assert!(never7.voice("e17v001").is_err());

    let mut ever17 = DirectoryStorage::new(dir.path(), Game::Ever17);
    assert_eq!(ever17.voice("E17V001").expect("voice").get_data(), b"ever17");
}

#[test]
fn movies_are_found_by_stem() {
    let dir = tempfile::tempdir().expect("tempdir");
    write(dir.path(), "movie/OP.mpg", b"mpeg");

    let mut storage = DirectoryStorage::new(dir.path(), Game::Ever17);
    assert_eq!(storage.movie("op").expect("movie").get_data(), b"mpeg");
}

#[test]
fn missing_media_maps_to_a_media_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut storage = DirectoryStorage::new(dir.path(), Game::Ever17);

    match storage.background("bg99") {
        Err(VnError::Media { kind, name }) => {
            assert_eq!(kind, "background");
            assert_eq!(name, "bg99");
        }
        other => panic!("expected media error, got {other:?}"),
    }
    assert!(matches!(
        storage.load(MediaKind::Background, "../outside"),
        Err(AssetError::Traversal)
    ));
}

#[test]
fn lnk_storage_reads_plain_and_compressed_entries() {
    let dir = tempfile::tempdir().expect("tempdir");
    let script = LnkArchive::build([("OP00.SCR", &b"SC3\0body"[..], false)]).expect("builds");
    let mut lnd = lnk::LND_MAGIC.to_vec();
    lnd.extend([0u8; 4]);
    lnd.extend(4u32.to_le_bytes());
    lnd.extend([0u8; 4]);
    lnd.extend([0xc0 | 2, b'q']);
    let bg = LnkArchive::build([("BG01.CPS", lnd.as_slice(), true)]).expect("builds");
    write(dir.path(), "script.dat", &script.write().expect("writes"));
    write(dir.path(), "BG.DAT", &bg.write().expect("writes"));

    let mut storage = LnkMediaStorage::new(dir.path(), Game::Ever17);
    assert_eq!(storage.script("op00").expect("script").get_data(), b"SC3\0body");
    assert_eq!(storage.background("bg01").expect("background").get_data(), b"qqqq");
    assert_eq!(
        storage.archive(MediaKind::Script).expect("opened").entries().len(),
        1
    );
    assert!(matches!(
        storage.script("op01"),
        Err(VnError::Media { kind: "script", .. })
    ));
    assert!(matches!(
        storage.voice("v001"),
        Err(VnError::Media { kind: "archive", .. })
    ));
}
