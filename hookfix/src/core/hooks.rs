//! Failed-hook extraction from raw pre-commit output.

use std::sync::LazyLock;

use regex::Regex;

/// Extract failing hook ids from raw `pre-commit` output.
///
/// pre-commit prints a `- hook id: <id>` line under each failed hook.
/// Ids are returned in first-seen order without duplicates.
pub fn failed_hook_ids(output: &str) -> Vec<String> {
    static HOOK_ID_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^- hook id: (\S+)\s*$").unwrap());

    let mut ids = Vec::new();
    for caps in HOOK_ID_RE.captures_iter(output) {
        let id = caps[1].to_string();
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "\
trim trailing whitespace.................................................Passed
black....................................................................Failed
- hook id: black
- files were modified by this hook

reformatted app/main.py

ruff.....................................................................Failed
- hook id: ruff
- exit code: 1
";

    #[test]
    fn extracts_failed_hook_ids_in_order() {
        assert_eq!(failed_hook_ids(SAMPLE), vec!["black", "ruff"]);
    }

    #[test]
    fn dedups_repeated_ids() {
        let output = "- hook id: ruff\nnoise\n- hook id: ruff\n";
        assert_eq!(failed_hook_ids(output), vec!["ruff"]);
    }

    #[test]
    fn clean_output_yields_no_ids() {
        assert!(failed_hook_ids("everything Passed\n").is_empty());
    }

    #[test]
    fn ignores_indented_lookalikes() {
        let output = "  - hook id: not-at-line-start\n";
        assert!(failed_hook_ids(output).is_empty());
    }
}
