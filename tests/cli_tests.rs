mod common;

use serde_json::Value;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    _dir: TempDir,
    config_path: PathBuf,
    foods_path: PathBuf,
    workspace_path: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let config_path = dir.path().join("config.json");
        let foods_path = dir.path().join("foods.csv");
        let workspace_path = dir.path().join("workspace.json");

        let mut config_file = File::create(&config_path).unwrap();
        writeln!(
            config_file,
            "{}",
            serde_json::to_string_pretty(&common::config_value()).unwrap()
        )
        .unwrap();

        let mut foods_file = File::create(&foods_path).unwrap();
        write!(foods_file, "{}", common::FOODS_CSV).unwrap();

        // Excludes every vegetable at lunch
        let mut ws_file = File::create(&workspace_path).unwrap();
        writeln!(ws_file, r#"{{"locks": {{"lunch": {{"exclude": ["V.*"]}}}}}}"#).unwrap();

        Self {
            _dir: dir,
            config_path,
            foods_path,
            workspace_path,
        }
    }

    fn run(&self, args: &[&str]) -> Output {
        Command::new(env!("CARGO_BIN_EXE_mealforge"))
            .args(args)
            .arg("--config")
            .arg(&self.config_path)
            .arg("--foods")
            .arg(&self.foods_path)
            .output()
            .expect("Failed to execute binary")
    }

    fn stdout(&self, args: &[&str]) -> String {
        let output = self.run(args);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        if !output.status.success() {
            panic!(
                "Command {:?} failed:\n{}\n{}",
                args,
                stdout,
                String::from_utf8_lossy(&output.stderr)
            );
        }
        stdout
    }
}

#[test]
fn test_pools_command() {
    let ctx = TestContext::new();
    let out = ctx.stdout(&["pools"]);
    assert!(out.contains("COMPONENT POOLS (4 resolved)"), "{}", out);
    assert!(out.contains("SO.1D"), "{}", out);
    assert!(!out.contains("warning"), "{}", out);
}

#[test]
fn test_count_command() {
    let ctx = TestContext::new();
    let out = ctx.stdout(&["count", "--meal-type", "lunch", "--template", "soup"]);
    assert!(out.contains("raw:   12"), "{}", out);
    assert!(out.contains("valid: 8"), "{}", out);
}

#[test]
fn test_generate_reports_next_cursor() {
    let ctx = TestContext::new();
    let out = ctx.stdout(&["generate", "-m", "lunch", "-n", "5", "--cursor", "3"]);
    assert!(out.contains("lunch / basic (fail-fast mode)"), "{}", out);
    assert!(out.contains("Next cursor: 8"), "{}", out);
    assert!(out.contains("of 5 candidates passed"), "{}", out);
}

#[test]
fn test_generate_json_output() {
    let ctx = TestContext::new();
    let out = ctx.stdout(&["generate", "-m", "lunch", "-t", "basic", "-n", "4", "--json"]);
    let report: Value = serde_json::from_str(&out).expect("stdout is JSON");
    let passed = report["passed"].as_array().unwrap();
    assert_eq!(passed.len(), 4);
    assert_eq!(passed[0]["items"][0]["code"], "P.1");
    assert_eq!(passed[0]["generation_method"], "exhaustive");
    assert_eq!(report["stats"][0]["stage"], "mutual_exclusion");
}

#[test]
fn test_generate_with_workspace_locks() {
    let ctx = TestContext::new();
    let output = ctx.run(&[
        "generate",
        "-m",
        "lunch",
        "-n",
        "4",
        "--json",
        "--workspace",
        ctx.workspace_path.to_str().unwrap(),
    ]);
    assert!(output.status.success());
    let report: Value = serde_json::from_slice(&output.stdout).unwrap();
    // Only the first candidate has no vegetable.
    assert_eq!(report["passed"].as_array().unwrap().len(), 1);
    assert_eq!(report["rejected"].as_array().unwrap().len(), 3);
    assert_eq!(report["stats"][0]["stage"], "pre_score");
}

#[test]
fn test_evolve_is_reproducible_with_seed() {
    let ctx = TestContext::new();
    let args = ["evolve", "--seed", "42", "--epochs", "2", "--top", "3"];
    let first = ctx.stdout(&args);
    let second = ctx.stdout(&args);
    assert!(first.contains("GENETIC SEARCH"), "{}", first);
    assert!(first.contains("Meal slots: lunch/basic"), "{}", first);
    assert!(first.contains("Finished 2 epochs"), "{}", first);
    assert!(first.contains("GA-"), "{}", first);
    assert_eq!(first, second);
}

#[test]
fn test_missing_config_fails() {
    let ctx = TestContext::new();
    let output = Command::new(env!("CARGO_BIN_EXE_mealforge"))
        .args(["pools", "--config", "does/not/exist.json"])
        .arg("--foods")
        .arg(&ctx.foods_path)
        .output()
        .unwrap();
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("FAILED TO LOAD CONFIG"), "{}", stderr);
}

#[test]
fn test_unknown_template_fails() {
    let ctx = TestContext::new();
    let output = ctx.run(&["count", "-m", "lunch", "-t", "brunch"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("template 'brunch' not found"), "{}", stderr);
}
