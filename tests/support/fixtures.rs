use sam_mini::{EngineState, File, handle_command_with_output};

pub const SAMPLE: &str = "The quick brown fox jumps over the lazy dog";

pub fn state_with(text: &str) -> EngineState {
    EngineState {
        files: vec![File::from_text(0, text)],
        active_file: 0,
    }
}

pub fn sample_state() -> EngineState {
    state_with(SAMPLE)
}

/// Runs one command line, collecting printed output. Panics on parse or
/// execution errors and on quit.
pub fn run(state: EngineState, command: &str) -> (EngineState, String) {
    let mut out = Vec::new();
    let next = handle_command_with_output(state, command, &mut out)
        .expect("command should succeed")
        .expect("command should not quit");
    (next, String::from_utf8(out).expect("output should be UTF-8"))
}

pub fn run_all(mut state: EngineState, commands: &[&str]) -> (EngineState, String) {
    let mut output = String::new();
    for command in commands {
        let (next, printed) = run(state, command);
        state = next;
        output.push_str(&printed);
    }
    (state, output)
}

pub fn text(state: &EngineState) -> String {
    state.active().content.to_string()
}

pub fn dot(state: &EngineState) -> (usize, usize) {
    let range = state.active().dot.range;
    (range.p1, range.p2)
}
