use std::fs;
use std::path::PathBuf;
use std::process::{Command, Stdio};

fn avm_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_avm"))
}

fn scratch_path(name: &str) -> PathBuf {
    let mut path = std::env::temp_dir();
    path.push(format!("avm_cli_test_{}_{}", std::process::id(), name));
    path
}

#[test]
fn exec_runs_the_arithmetic_scenario() {
    let source = scratch_path("arithmetic.avm");
    fs::write(&source, "x = 2 + 3 * 4\n> x").unwrap();

    let output = avm_cmd()
        .args(["exec", source.to_str().unwrap()])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run avm exec");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "14");
}

#[test]
fn exec_runs_the_input_scenario() {
    let source = scratch_path("input.avm");
    let input = scratch_path("input.txt");
    fs::write(&source, "s = 'abc'\n/in s\n> s").unwrap();
    fs::write(&input, "XY\n").unwrap();

    let output = avm_cmd()
        .args([
            "exec",
            source.to_str().unwrap(),
            "--input",
            input.to_str().unwrap(),
        ])
        .output()
        .expect("failed to run avm exec");

    assert!(output.status.success());
    assert_eq!(String::from_utf8_lossy(&output.stdout), "XY");
}

#[test]
fn exec_reports_a_nonzero_exit_on_translation_failure() {
    let source = scratch_path("undeclared.avm");
    fs::write(&source, "/in s").unwrap();

    let output = avm_cmd()
        .args(["exec", source.to_str().unwrap()])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run avm exec");

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("translating source"));
}

#[test]
fn translate_then_run_matches_exec() {
    let source = scratch_path("roundtrip.avm");
    let bytecode = scratch_path("roundtrip.bin");
    fs::write(&source, "> 'hi'").unwrap();

    let translate_status = avm_cmd()
        .args([
            "translate",
            source.to_str().unwrap(),
            "--output",
            bytecode.to_str().unwrap(),
        ])
        .status()
        .expect("failed to run avm translate");
    assert!(translate_status.success());

    let run_output = avm_cmd()
        .args(["run", bytecode.to_str().unwrap()])
        .stdin(Stdio::null())
        .output()
        .expect("failed to run avm run");

    assert!(run_output.status.success());
    assert_eq!(String::from_utf8_lossy(&run_output.stdout), "hi");
}
