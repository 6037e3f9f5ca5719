use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use vcov_model::{DesignBuilder, ExprOp, SignalKind};

const SRC: &str = "module top;\n  wire a, b, x;\n  assign x = a & b;\nendmodule\n";

/// Writes `top.v` and `design.json` into `dir`.
fn write_project(dir: &Path) {
    let mut b = DesignBuilder::new("top.v", SRC);
    let top = b.module("top");
    let [a, bs, x] = ["a", "b", "x"].map(|n| b.signal(top, n, SignalKind::Wire));
    let ex = b.sig(x, 3, 0);
    let ea = b.sig(a, 3, 0);
    let eb = b.sig(bs, 3, 0);
    let and = b.binary(ExprOp::And, ea, eb);
    b.assign(top, ExprOp::Assign, ex, and);
    let design = b.finish();
    fs::write(dir.join("top.v"), SRC).unwrap();
    fs::write(dir.join("design.json"), serde_json::to_string(&design).unwrap()).unwrap();
}

fn vcov(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_vcov"))
        .args(args)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

#[test]
fn instrument_writes_covered_copies() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let out = vcov(dir.path(), &["--color", "never", "instrument", "--design", "design.json"]);
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));

    let written = fs::read_to_string(dir.path().join("covered/verilog/top.v")).unwrap();
    assert!(written.contains("assign x = a & b, \\covered$C3_3_000e0012 = {(a > 0), (b > 0)}"));
    assert!(written.contains("parameter \\covered$inst_id = 0;"));
    let ids = fs::read_to_string(dir.path().join("covered/verilog/covered_instance_ids.v")).unwrap();
    assert_eq!(ids, "defparam top.\\covered$inst_id  = 0;\n");
}

#[test]
fn output_flag_and_config_file_are_honored() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    fs::write(dir.path().join("cov.toml"), "[coverage]\nline = false\ncombinational = false\n").unwrap();
    let out = vcov(
        dir.path(),
        &["--config", "cov.toml", "-q", "instrument", "-d", "design.json", "-o", "out"],
    );
    assert!(out.status.success(), "{}", String::from_utf8_lossy(&out.stderr));
    let written = fs::read_to_string(dir.path().join("out/top.v")).unwrap();
    assert!(written.contains("  assign x = a & b;\n"));
}

#[test]
fn unknown_top_fails_with_diagnostic() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let out = vcov(dir.path(), &["--color", "never", "instrument", "-d", "design.json", "--top", "nope"]);
    assert_eq!(out.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("E300"), "{stderr}");
    assert!(stderr.contains("`nope`"), "{stderr}");
    assert!(!dir.path().join("covered").exists());
}

#[test]
fn check_prints_instance_tree() {
    let dir = tempfile::tempdir().unwrap();
    write_project(dir.path());
    let out = vcov(dir.path(), &["check", "--design", "design.json"]);
    assert!(out.status.success());
    assert_eq!(String::from_utf8_lossy(&out.stdout), "top (top)\n");
}

#[test]
fn malformed_design_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("design.json"), "{ not json").unwrap();
    let out = vcov(dir.path(), &["check", "-d", "design.json"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&out.stderr).contains("malformed design"));
}
