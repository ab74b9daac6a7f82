use std::fs;

use sam_mini::{Encoding, ModificationFlags, init_state};

mod support;
use support::fixtures::{dot, run, run_all, state_with, text};

#[test]
fn write_saves_and_clears_the_modified_flag() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.txt");

    let (state, _) = run(state_with("hello"), "a/!/");
    assert!(state.active().flags.contains(ModificationFlags::MODIFIED));

    let (state, _) = run(state, &format!("w {}", path.display()));
    assert_eq!(fs::read_to_string(&path).unwrap(), "hello!");
    assert!(state.active().flags.is_empty());
    // Every undo point is now known to predate a save.
    for snapshot in &state.active().history {
        assert!(snapshot.flags.contains(ModificationFlags::MODIFIED));
    }
}

#[test]
fn edit_replaces_the_buffer_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.txt");
    fs::write(&path, "from disk").unwrap();

    let (state, _) = run(state_with("abc"), &format!("e {}", path.display()));
    assert_eq!(text(&state), "from disk");
    assert_eq!(dot(&state), (0, 9));
    assert_eq!(state.active().history.len(), 1);
}

#[test]
fn edit_of_a_missing_file_is_a_noop() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("missing.txt");

    let (state, _) = run(state_with("abc"), &format!("e {}", path.display()));
    assert_eq!(text(&state), "abc");
    assert!(state.active().history.is_empty());
}

#[test]
fn read_replaces_the_selection_only() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("part.txt");
    fs::write(&path, "--").unwrap();

    let (state, _) = run_all(
        state_with("abcdef"),
        &["#2,#4", &format!("r {}", path.display())],
    );
    assert_eq!(text(&state), "ab--ef");
    assert_eq!(dot(&state), (2, 4));
}

#[test]
fn open_file_appends_and_activates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("disk.txt");
    fs::write(&path, "from disk").unwrap();

    let (state, _) = run(state_with("abc"), &format!("l {}", path.display()));
    assert_eq!(state.files.len(), 2);
    assert_eq!(state.active_file, 1);
    assert_eq!(text(&state), "from disk");

    let (state, _) = run(state, "b 0");
    assert_eq!(state.active_file, 0);
    assert_eq!(text(&state), "abc");

    // Out-of-range file numbers are ignored.
    let (state, _) = run(state, "b 9");
    assert_eq!(state.active_file, 0);
}

#[test]
fn open_without_filename_makes_an_empty_file() {
    let (state, _) = run(state_with("abc"), "l");
    assert_eq!(state.files.len(), 2);
    assert_eq!(state.active_file, 1);
    assert_eq!(text(&state), "");
}

#[test]
fn init_state_reads_files_and_selects_everything() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("init.txt");
    fs::write(&path, "x\ny\n").unwrap();
    let path = path.display().to_string();

    let state = init_state(&[&path]);
    assert_eq!(state.files.len(), 1);
    assert_eq!(text(&state), "x\ny\n");
    assert_eq!(dot(&state), (0, 4));
    assert_eq!(state.active().filename, path);
}

#[test]
fn init_state_without_paths_has_one_empty_file() {
    let state = init_state(&[]);
    assert_eq!(state.files.len(), 1);
    assert!(state.active().content.is_empty());
}

#[test]
fn invalid_utf8_downgrades_to_byte_characters() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("raw.bin");
    fs::write(&path, [0x61, 0xFF, 0x62]).unwrap();
    let path = path.display().to_string();

    let state = init_state(&[&path]);
    assert_eq!(state.active().encoding, Encoding::Ascii);
    assert_eq!(state.active().content.len(), 3);

    // The byte stream is not valid UTF-8, so re-packing refuses to act.
    let (state, _) = run(state, "U");
    assert_eq!(state.active().encoding, Encoding::Ascii);
    assert_eq!(state.active().content.len(), 3);
}

#[test]
fn ascii_and_utf8_conversions_remap_dot() {
    let state = state_with("héllo");
    assert_eq!(dot(&state), (0, 5));

    let (state, _) = run(state, "A");
    assert_eq!(state.active().encoding, Encoding::Ascii);
    assert_eq!(state.active().content.len(), 6);
    assert_eq!(dot(&state), (0, 6));

    let (state, _) = run(state, "U");
    assert_eq!(state.active().encoding, Encoding::Utf8);
    assert_eq!(text(&state), "héllo");
    assert_eq!(dot(&state), (0, 5));
}

#[test]
fn conversion_in_the_target_encoding_is_a_noop() {
    let (state, _) = run(state_with("plain"), "U");
    assert_eq!(state.active().encoding, Encoding::Utf8);
    assert!(state.active().history.is_empty());
}
