use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn run_cli(working_dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_produce-fixtures"))
        .args(args)
        .current_dir(working_dir)
        .env_remove("RUST_LOG")
        .output()
        .expect("produce-fixtures should launch")
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).into_owned()
}

#[test]
fn help_lists_the_generation_flags() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(temp.path(), &["--help"]);

    assert!(output.status.success(), "stderr: {}", stderr(&output));
    let stdout = String::from_utf8_lossy(&output.stdout);
    for flag in ["--force", "--no-clean", "--log", "--nums", "--data-dir"] {
        assert!(stdout.contains(flag), "help should mention {flag}");
    }
}

#[test]
fn out_of_range_index_exits_with_input_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(temp.path(), &["--nums=0,99", "--data-dir", "fixtures"]);

    assert_eq!(output.status.code(), Some(2));
    let stderr = stderr(&output);
    assert!(stderr.contains("ERROR: [INPUT.OPTION_INDEX]"), "stderr: {stderr}");
    assert!(stderr.contains("FATAL EXIT CODE: 2"), "stderr: {stderr}");
    assert!(!temp.path().join("fixtures").exists());
}

#[test]
fn unknown_legacy_log_level_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(temp.path(), &["--logVERBOSE"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("[INPUT.CLI_USAGE]"));
}

#[test]
fn unknown_flag_is_a_usage_error() {
    let temp = TempDir::new().expect("tempdir should be created");
    let output = run_cli(temp.path(), &["--frobnicate"]);

    assert_eq!(output.status.code(), Some(2));
    assert!(stderr(&output).contains("FATAL EXIT CODE: 2"));
}

#[test]
fn missing_interpreter_exits_with_io_code() {
    let temp = TempDir::new().expect("tempdir should be created");
    let missing = temp.path().join("no-such-python");
    let output = run_cli(
        temp.path(),
        &[
            "--logDEBUG",
            "--data-dir",
            "fixtures",
            "--cache-dir",
            "cache",
            "--python",
            missing.to_str().expect("temp path should be utf-8"),
        ],
    );

    assert_eq!(output.status.code(), Some(3));
    let stderr = stderr(&output);
    assert!(
        stderr.contains("ERROR: [IO.SIMULATION_BRIDGE_SPAWN]"),
        "stderr: {stderr}"
    );
    assert!(temp.path().join("fixtures").is_dir());
}
