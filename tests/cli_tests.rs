use regex::Regex;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

struct TestContext {
    dir: TempDir,
    snapshot: PathBuf,
}

impl TestContext {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        let snapshot = dir.path().join("log.json");
        Self { dir, snapshot }
    }

    /// Writes a session upload for `text`, one key every `gap_ms`.
    fn upload(&self, name: &str, mode: &str, text: &str, gap_ms: f64) -> PathBuf {
        let chars: Vec<char> = text.chars().collect();
        let keystrokes: Vec<serde_json::Value> = chars
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let prev_key = i.checked_sub(1).map(|p| chars[p].to_string());
                serde_json::json!({
                    "key": c.to_string(),
                    "timestamp": i as f64 * gap_ms,
                    "prev_key": prev_key,
                })
            })
            .collect();
        let body = serde_json::json!({
            "mode": mode,
            "raw_text": text,
            "keystrokes": keystrokes,
        });
        let path = self.dir.path().join(name);
        fs::write(&path, body.to_string()).unwrap();
        path
    }

    fn run(&self, args: &[&str]) -> Output {
        let mut full = vec!["--snapshot", self.snapshot.to_str().unwrap()];
        full.extend_from_slice(args);
        Command::new(env!("CARGO_BIN_EXE_keytrace"))
            .args(&full)
            .output()
            .expect("Failed to execute binary")
    }

    fn stdout(&self, args: &[&str]) -> String {
        let out = self.run(args);
        assert!(
            out.status.success(),
            "{:?} failed:\n{}",
            args,
            String::from_utf8_lossy(&out.stderr)
        );
        String::from_utf8_lossy(&out.stdout).to_string()
    }

    fn record(&self, mode: &str, text: &str, gap_ms: f64) {
        let path = self.upload(&format!("{}.json", text.replace(' ', "_")), mode, text, gap_ms);
        let out = self.stdout(&["record", path.to_str().unwrap()]);
        assert!(out.contains("Recorded session"), "{}", out);
    }
}

fn path_str(p: &Path) -> &str {
    p.to_str().unwrap()
}

#[test]
fn test_cli_record_then_patterns() {
    let ctx = TestContext::new();
    ctx.record("top200", "the then", 100.0);

    let out = ctx.stdout(&["patterns"]);
    assert!(out.contains("\"th\""), "{}", out);
    assert!(out.contains("\"the\""), "{}", out);
    assert!(out.contains("100.0"), "{}", out);
}

#[test]
fn test_cli_unknown_mode_fails() {
    let ctx = TestContext::new();
    let out = ctx.run(&["patterns", "--mode", "speedrun"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("speedrun"));
}

#[test]
fn test_cli_details_histogram() {
    let ctx = TestContext::new();
    ctx.record("top200", "on", 100.0);
    ctx.record("top200", "one", 140.0);
    ctx.record("top200", "only", 180.0);

    let out = ctx.stdout(&["details", "on"]);
    assert!(out.contains("Occurrences: 3"), "{}", out);
    assert!(out.contains("Words: on, one, only"), "{}", out);
    let label = Regex::new(r"\d+-\d+ms").unwrap();
    assert!(label.is_match(&out), "{}", out);
}

#[test]
fn test_cli_coverage_on_empty_log() {
    let ctx = TestContext::new();
    let out = ctx.stdout(&["coverage", "--suggest", "--seed", "3"]);
    assert!(out.contains("Pairs covered: 0/64"), "{}", out);
    assert!(out.contains("Gaps: 64"), "{}", out);

    let suggestion = Regex::new(r#"(?m)^\s+"[a-z;/.,]{3}"\s+\(\w+ -> \w+\)$"#).unwrap();
    assert_eq!(suggestion.find_iter(&out).count(), 5, "{}", out);
}

#[test]
fn test_cli_coverage_csv() {
    let ctx = TestContext::new();
    ctx.record("trigraph_test", "fjd", 90.0);
    let csv = ctx.dir.path().join("coverage.csv");
    ctx.stdout(&["coverage", "--csv", path_str(&csv)]);

    let text = fs::read_to_string(&csv).unwrap();
    assert_eq!(text.lines().count(), 65);
    assert!(text.contains("left_index,right_index,1,90.0,low"), "{}", text);
}

#[test]
fn test_cli_crop_and_delete_keystroke() {
    let ctx = TestContext::new();
    ctx.record("nonsense", "abcdef", 100.0);

    let out = ctx.stdout(&["crop", "1", "1", "3"]);
    assert!(out.contains("removed 3 keystrokes"), "{}", out);

    let bad = ctx.run(&["crop", "1", "2", "9"]);
    assert!(!bad.status.success());

    ctx.stdout(&["delete-keystroke", "3"]);
    let missing = ctx.run(&["delete-keystroke", "3"]);
    assert!(!missing.status.success());

    let stats = ctx.stdout(&["stats"]);
    let keys = Regex::new(r"Keystrokes\s+\|\s+2\s").unwrap();
    assert!(keys.is_match(&stats), "{}", stats);
}

#[test]
fn test_cli_features_need_annotations() {
    let ctx = TestContext::new();
    ctx.record("top200", "take", 100.0);

    let out = ctx.stdout(&["features", "1"]);
    assert!(out.contains("missing annotations at positions [2, 3]"), "{}", out);

    let anns = ctx.dir.path().join("anns.json");
    fs::write(
        &anns,
        r#"[{"keystroke_id": 3, "finger": "right_index", "hand": "right"},
            {"keystroke_id": 4, "finger": "left_middle", "hand": "left"}]"#,
    )
    .unwrap();
    let out = ctx.stdout(&["annotate", "1", path_str(&anns), "--compute"]);
    assert!(out.contains("3 transition features"), "{}", out);
}

#[test]
fn test_cli_deviations() {
    let ctx = TestContext::new();
    ctx.record("top200", "key", 100.0);
    let anns = ctx.dir.path().join("anns.json");
    fs::write(
        &anns,
        r#"[{"keystroke_id": 1, "finger": "right_middle", "hand": "right"}]"#,
    )
    .unwrap();
    ctx.stdout(&["annotate", "1", path_str(&anns)]);

    let out = ctx.stdout(&["deviations"]);
    assert!(out.contains("Finger deviations (1 total)"), "{}", out);
    assert!(out.contains("right_index -> right_middle"), "{}", out);

    let out = ctx.stdout(&["deviations", "--patterns"]);
    assert!(out.contains("\"START\""), "{}", out);
}

#[test]
fn test_cli_config_file_and_flag_precedence() {
    let ctx = TestContext::new();
    ctx.record("top200", "abc", 3000.0);

    let cfg = ctx.dir.path().join("params.json");
    fs::write(&cfg, r#"{ "patterns": { "max_duration_ms": 1000.0 } }"#).unwrap();
    let filtered = ctx.stdout(&["--config", path_str(&cfg), "patterns"]);
    assert!(!filtered.contains("\"ab\""), "{}", filtered);

    let overridden = ctx.stdout(&[
        "--config",
        path_str(&cfg),
        "patterns",
        "--max-duration-ms",
        "4000",
    ]);
    assert!(overridden.contains("\"ab\""), "{}", overridden);
}

#[test]
fn test_cli_invalid_config_exits_with_two() {
    let ctx = TestContext::new();
    let out = ctx.run(&["patterns", "--histogram-bins", "0"]);
    assert_eq!(out.status.code(), Some(2));
}
