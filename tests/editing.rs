use sam_mini::{ModificationFlags, handle_command_with_output};

mod support;
use support::fixtures::{dot, run, run_all, sample_state, state_with, text};

#[test]
fn append_extends_after_dot() {
    let (state, output) = run(sample_state(), "a/Test/,p");
    assert_eq!(output, "The quick brown fox jumps over the lazy dogTest\n");
    assert_eq!(text(&state), "The quick brown fox jumps over the lazy dogTest");
}

#[test]
fn append_selects_the_added_text() {
    let (state, _) = run(sample_state(), "a/Test/");
    assert_eq!(dot(&state), (43, 47));
    assert!(state.active().flags.contains(ModificationFlags::MODIFIED));
}

#[test]
fn change_replaces_dot() {
    let (state, output) = run(sample_state(), ", c/AAA/ ,p");
    assert_eq!(output, "AAA\n");
    assert_eq!(text(&state), "AAA");
}

#[test]
fn insert_goes_before_dot() {
    let (state, _) = run(sample_state(), "i/X/");
    assert_eq!(text(&state), "XThe quick brown fox jumps over the lazy dog");
    assert_eq!(dot(&state), (0, 1));
}

#[test]
fn delete_collapses_dot_at_start() {
    let (state, _) = run(sample_state(), "#4,#9 d");
    assert_eq!(text(&state), "The  brown fox jumps over the lazy dog");
    assert_eq!(dot(&state), (4, 4));
}

#[test]
fn substitute_replaces_first_match() {
    let (state, _) = run(sample_state(), "s/quick/slow/");
    assert_eq!(text(&state), "The slow brown fox jumps over the lazy dog");
    assert_eq!(dot(&state), (4, 8));
}

#[test]
fn substitute_only_looks_inside_dot() {
    let (state, _) = run_all(sample_state(), &["#0,#3", "s/quick/slow/"]);
    assert_eq!(text(&state), "The quick brown fox jumps over the lazy dog");
    assert!(state.active().history.is_empty());
    assert!(state.active().flags.is_empty());
}

#[test]
fn substitute_touches_one_match_only() {
    let (state, _) = run(state_with("aaa"), ",s/a/b/");
    assert_eq!(text(&state), "baa");
    assert_eq!(dot(&state), (0, 1));
}

#[test]
fn move_towards_the_end() {
    let (state, _) = run(state_with("abcdef"), "#0,#2 m #4");
    assert_eq!(text(&state), "cdabef");
    assert_eq!(dot(&state), (2, 4));
}

#[test]
fn move_towards_the_start() {
    let (state, _) = run(state_with("abcdef"), "#4,#6 m #0");
    assert_eq!(text(&state), "efabcd");
    assert_eq!(dot(&state), (0, 2));
}

#[test]
fn copy_leaves_the_source_in_place() {
    let (state, _) = run(state_with("abcdef"), "#0,#2 t $");
    assert_eq!(text(&state), "abcdefab");
    assert_eq!(dot(&state), (6, 8));
}

#[test]
fn print_empty_selection_is_a_bare_newline() {
    let (_, output) = run(sample_state(), "$ p");
    assert_eq!(output, "\n");
}

#[test]
fn quit_returns_none() {
    let mut out = Vec::new();
    let result = handle_command_with_output(sample_state(), "q", &mut out);
    assert!(matches!(result, Ok(None)));
}

#[test]
fn expressions_run_left_to_right() {
    let (state, output) = run(state_with("one two"), "/two/ c/2/ ,p");
    assert_eq!(output, "one 2\n");
    assert_eq!(text(&state), "one 2");
}
