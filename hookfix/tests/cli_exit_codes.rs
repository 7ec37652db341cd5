//! Exit-code contract of the installed binary, exercised end to end.

use std::process::Command;

use hookfix::exit_codes;
use hookfix::io::config::{ALL_FILES_ENV, MAX_ITER_ENV};

fn run_binary(dir: &std::path::Path) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_hookfix"))
        .current_dir(dir)
        .env_remove(MAX_ITER_ENV)
        .env_remove(ALL_FILES_ENV)
        .output()
        .expect("spawn hookfix binary")
}

/// A lint command that exits 0 ends the run with the success code and the
/// clean notice on stdout.
#[test]
fn clean_lint_exits_ok() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(temp.path().join("hookfix.toml"), "lint_command = [\"true\"]\n")
        .expect("write config");

    let output = run_binary(temp.path());

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("pre-commit clean."));
}

/// A lint command that cannot be spawned is a fatal error: the failing exit
/// code, with the spawn failure explained on stderr.
#[test]
fn missing_lint_binary_exits_failing_with_detail() {
    let temp = tempfile::tempdir().expect("tempdir");
    std::fs::write(
        temp.path().join("hookfix.toml"),
        "lint_command = [\"hookfix-no-such-lint\"]\n",
    )
    .expect("write config");

    let output = run_binary(temp.path());

    assert_eq!(output.status.code(), Some(exit_codes::FAILING));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("spawn command"));
}
