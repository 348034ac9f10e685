//! The `@@` trigger typed in the editor.

pub const TRIGGER: &str = "@@";

/// Query text after the first trigger on `line`, trimmed.
/// `Some("")` means the trigger was typed with no query yet.
pub fn extract_query(line: &str) -> Option<&str> {
    line.find(TRIGGER)
        .map(|at| line[at + TRIGGER.len()..].trim())
}

/// Drop everything from the trigger to the end of the line and append `insertion`.
/// Lines without a trigger only get the insertion appended.
pub fn replace_trigger(line: &str, insertion: &str) -> String {
    let kept = line.find(TRIGGER).map_or(line, |at| &line[..at]);
    format!("{kept}{insertion}")
}
