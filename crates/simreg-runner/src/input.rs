//! In-place editing of the simulator's runtime input files

use simreg_common::{CaseError, ParamMap, StageResult};
use std::path::Path;
use tracing::{debug, info};

/// Width of the parameter-name column in `Input__*` files
const KEY_COLUMN: usize = 29;

/// Rewrite `line` with `value` if its first token is `key`.
///
/// The key is padded to the name column, the value to four characters, and the
/// original text after the name column (the old value and its comment) is kept
/// behind a `#`.
pub fn rewrite_line(line: &str, key: &str, value: &str) -> Option<String> {
    if line.split_whitespace().next() != Some(key) {
        return None;
    }
    let cut = if line.len() >= KEY_COLUMN && line.is_char_boundary(KEY_COLUMN) {
        KEY_COLUMN
    } else {
        key.len()
    };
    let rest = &line[cut..];
    Some(format!("{key:<KEY_COLUMN$}{value:<4} #{rest}"))
}

/// Apply every setting to `text`; keys absent from the text are ignored
pub fn apply_settings(text: &str, settings: &ParamMap) -> String {
    let mut out: Vec<String> = text.lines().map(str::to_string).collect();
    for (key, value) in settings {
        let value = value.to_string();
        for line in &mut out {
            if let Some(edited) = rewrite_line(line, key, &value) {
                *line = edited;
            }
        }
    }
    let mut joined = out.join("\n");
    if text.ends_with('\n') {
        joined.push('\n');
    }
    joined
}

/// Rewrite `path` in place with `settings`; a no-op for empty settings
pub fn edit_input_file(path: &Path, settings: &ParamMap) -> StageResult<()> {
    if settings.is_empty() {
        return Ok(());
    }
    let name = path
        .file_name()
        .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());
    info!(target: "simreg::runner", "Editing {name}.");
    let edit_err = || CaseError::edit_file(format!("Error on editing {name}."));

    let text = std::fs::read_to_string(path).map_err(|_| edit_err())?;
    let edited = apply_settings(&text, settings);
    std::fs::write(path, edited).map_err(|_| edit_err())?;
    debug!(target: "simreg::runner", "{} key(s) applied to {name}", settings.len());
    Ok(())
}
