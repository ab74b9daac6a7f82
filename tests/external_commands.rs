#![cfg(unix)]

use sam_mini::{Error, ModificationFlags, handle_command_with_output};

mod support;
use support::fixtures::{dot, run, state_with, text};

#[test]
fn process_output_replaces_the_selection() {
    let (state, _) = run(state_with("abc"), ">echo hi");
    assert_eq!(text(&state), "hi\n");
    assert_eq!(dot(&state), (0, 3));
    assert!(state.active().flags.contains(ModificationFlags::MODIFIED));
}

#[test]
fn piping_through_cat_round_trips() {
    let (state, _) = run(state_with("hello"), "|cat");
    assert_eq!(text(&state), "hello");
    assert_eq!(dot(&state), (0, 5));
    assert_eq!(state.active().history.len(), 1);
}

#[test]
fn piping_through_tr_transforms_the_selection() {
    let (state, _) = run(state_with("hello"), "|tr a-z A-Z");
    assert_eq!(text(&state), "HELLO");
}

#[test]
fn send_only_leaves_the_buffer_alone() {
    let (state, _) = run(state_with("hello"), "<cat");
    assert_eq!(text(&state), "hello");
    assert!(state.active().history.is_empty());
}

#[test]
fn detached_runs_do_not_touch_the_buffer() {
    let (state, _) = run(state_with("abc"), "!true");
    assert_eq!(text(&state), "abc");
    assert!(state.active().history.is_empty());
}

#[test]
fn spawn_failure_is_reported() {
    let mut out = Vec::new();
    let result =
        handle_command_with_output(state_with("abc"), ">/no/such/binary_xyz", &mut out);
    assert!(matches!(result, Err(Error::Pipe(_))));
}
