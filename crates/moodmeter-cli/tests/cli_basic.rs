//! Basic CLI E2E tests.
//!
//! Each test runs the built binary against its own temporary data directory.

use std::path::Path;
use std::process::Command;

use tempfile::TempDir;

const SECRET: &str = "s3cret";

struct Cli {
    dir: TempDir,
}

impl Cli {
    fn new() -> Self {
        Self {
            dir: TempDir::new().expect("temp dir"),
        }
    }

    fn data_dir(&self) -> &Path {
        self.dir.path()
    }

    /// Run a command and return (exit code, stdout, stderr).
    fn run(&self, args: &[&str], token: Option<&str>) -> (i32, String, String) {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_moodmeter"));
        cmd.args(args)
            .env("MOODMETER_DATA_DIR", self.dir.path())
            .env("MOODMETER_SECRET", SECRET)
            .env_remove("MOODMETER_TOKEN")
            .env_remove("RUST_LOG");
        if let Some(token) = token {
            cmd.env("MOODMETER_TOKEN", token);
        }
        let output = cmd.output().expect("Failed to execute CLI command");
        (
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stdout).to_string(),
            String::from_utf8_lossy(&output.stderr).to_string(),
        )
    }

    fn ok(&self, args: &[&str]) -> String {
        let (code, stdout, stderr) = self.run(args, Some(SECRET));
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        stdout
    }

    fn json(&self, args: &[&str], token: Option<&str>) -> serde_json::Value {
        let (code, stdout, stderr) = self.run(args, token);
        assert_eq!(code, 0, "{args:?} failed: {stderr}");
        serde_json::from_str(&stdout).expect("valid JSON output")
    }

    fn add_task(&self, label: &str, extra: &[&str]) -> String {
        let mut args = vec!["task", "add", label];
        args.extend_from_slice(extra);
        let out = self.ok(&args);
        out.trim()
            .strip_prefix("Task added: ")
            .expect("task id in output")
            .to_string()
    }
}

#[test]
fn test_default_tag_catalog() {
    let cli = Cli::new();
    let tags = cli.json(&["tag", "list", "--json"], None);
    assert_eq!(tags[0]["value"], "misc");
}

#[test]
fn test_mutation_without_token_is_rejected() {
    let cli = Cli::new();
    let (code, _, stderr) = cli.run(&["task", "add", "secret plan"], None);
    assert_eq!(code, 1);
    assert!(stderr.contains("Unauthorized"), "stderr: {stderr}");

    let (code, _, _) = cli.run(&["task", "add", "secret plan"], Some("wrong"));
    assert_eq!(code, 1);
}

#[test]
fn test_labels_are_private() {
    let cli = Cli::new();
    cli.add_task("Quarterly report", &[]);

    let public = cli.json(&["task", "list", "--json"], None);
    assert_eq!(public.as_array().unwrap().len(), 1);
    assert!(public[0].get("label").is_none());

    let private = cli.json(&["task", "list", "--json"], Some(SECRET));
    assert_eq!(private[0]["label"], "Quarterly report");
    assert_eq!(private[0]["tag"], "misc");
    assert_eq!(private[0]["importance"], 2);
}

#[test]
fn test_single_heaviest_task_is_calm() {
    let cli = Cli::new();
    cli.add_task("Big", &["--risk", "3", "--urgency", "3", "--importance", "3"]);
    let report = cli.json(&["mood", "--json"], None);
    assert_eq!(report["load"], 9.0);
    assert_eq!(report["mood"], "calm");
    assert_eq!(report["segments"].as_array().unwrap().len(), 1);
    assert_eq!(report["segments"][0]["mood"], "stress");
}

#[test]
fn test_invalid_level_is_rejected() {
    let cli = Cli::new();
    let (code, _, _) = cli.run(&["task", "add", "x", "--risk", "4"], Some(SECRET));
    assert_ne!(code, 0);
}

#[test]
fn test_task_set_and_remove() {
    let cli = Cli::new();
    let id = cli.add_task("Draft", &[]);
    cli.ok(&["task", "set", &id, "--urgency", "3"]);
    let tasks = cli.json(&["task", "list", "--json"], Some(SECRET));
    assert_eq!(tasks[0]["urgency"], 3);

    cli.ok(&["task", "remove", &id]);
    let tasks = cli.json(&["task", "list", "--json"], Some(SECRET));
    assert!(tasks.as_array().unwrap().is_empty());

    let (code, _, stderr) = cli.run(&["task", "remove", &id], Some(SECRET));
    assert_eq!(code, 1);
    assert!(stderr.contains("not found"), "stderr: {stderr}");
}

#[test]
fn test_tag_in_use_cannot_be_deleted() {
    let cli = Cli::new();
    cli.ok(&["tag", "add", "work", "Work"]);
    let id = cli.add_task("Ship it", &["--tag", "work"]);

    let (code, _, stderr) = cli.run(&["tag", "delete", "work"], Some(SECRET));
    assert_eq!(code, 1);
    assert!(stderr.contains("Conflict"), "stderr: {stderr}");

    cli.ok(&["task", "remove", &id]);
    cli.ok(&["tag", "delete", "work"]);
    let tags = cli.json(&["tag", "list", "--json"], None);
    assert!(tags.as_array().unwrap().iter().all(|t| t["value"] != "work"));
}

#[test]
fn test_default_tag_cannot_be_deleted() {
    let cli = Cli::new();
    let (code, _, stderr) = cli.run(&["tag", "delete", "misc"], Some(SECRET));
    assert_eq!(code, 1);
    assert!(stderr.contains("Conflict"), "stderr: {stderr}");

    cli.ok(&["tag", "add", "home"]);
    cli.ok(&["tag", "delete", "home"]);
    let tags = cli.json(&["tag", "list", "--json"], None);
    let values: Vec<&str> = tags
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["value"].as_str().unwrap())
        .collect();
    assert_eq!(values, ["misc"]);

    // Tasks without --tag still get the default tag.
    cli.add_task("Errand", &[]);
}

#[test]
fn test_unknown_tag_is_rejected() {
    let cli = Cli::new();
    let (code, _, _) = cli.run(&["task", "add", "x", "--tag", "nope"], Some(SECRET));
    assert_eq!(code, 1);
    let tasks = cli.json(&["task", "list", "--json"], Some(SECRET));
    assert!(tasks.as_array().unwrap().is_empty());
}

#[test]
fn test_flow_complete_grants_flow() {
    let cli = Cli::new();
    let out = cli.ok(&["flow", "add", "Deep work", "--difficulty", "3"]);
    let id = out.trim().strip_prefix("Flow task added: ").unwrap().to_string();

    let status = cli.json(&["flow", "status", "--json"], None);
    assert_eq!(status["percent"], 0.0);

    cli.ok(&["flow", "complete", &id]);
    let status = cli.json(&["flow", "status", "--json"], None);
    let percent = status["percent"].as_f64().unwrap();
    assert!(percent > 52.9 && percent <= 53.0, "percent {percent}");
    assert_eq!(status["active_completions"], 1);

    let tasks = cli.json(&["flow", "list", "--json"], None);
    assert!(tasks.as_array().unwrap().is_empty());
}

#[test]
fn test_flow_watch_stops_after_deadline() {
    let cli = Cli::new();
    let (code, stdout, stderr) = cli.run(&["flow", "watch", "--for-secs", "1"], None);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("Flow: 0.0%"));
}

#[test]
fn test_usage_totals_never_regress() {
    let cli = Cli::new();
    cli.ok(&["usage", "record", "--tokens", "5000", "--lines", "40"]);
    cli.ok(&["usage", "record", "--tokens", "3000", "--lines", "60"]);
    let totals = cli.json(&["usage", "show", "--json"], None);
    assert_eq!(totals["tokens"], 5000);
    assert_eq!(totals["linesOfCode"], 60);
}

#[test]
fn test_usage_watch_persists_floor() {
    let cli = Cli::new();
    cli.ok(&["usage", "record", "--tokens", "2000000", "--lines", "2000"]);
    let (code, stdout, stderr) = cli.run(&["usage", "watch", "--for-secs", "1"], None);
    assert_eq!(code, 0, "stderr: {stderr}");
    assert!(stdout.contains("tokens"));
    let floor_file = cli.data_dir().join("documents").join("counter_floor.json");
    assert!(floor_file.exists());
}

#[test]
fn test_config_set_get() {
    let cli = Cli::new();
    cli.ok(&["config", "set", "usage.poll_interval_secs", "60"]);
    let value = cli.ok(&["config", "get", "usage.poll_interval_secs"]);
    assert_eq!(value.trim(), "60");

    let (code, _, _) = cli.run(&["config", "set", "usage.poll_interval_secs", "0"], None);
    assert_eq!(code, 1);
    let (code, _, _) = cli.run(&["config", "get", "no.such.key"], None);
    assert_eq!(code, 1);
}

#[test]
fn test_config_init_stores_digest_only() {
    let cli = Cli::new();
    cli.ok(&["config", "init", "--secret", "hunter2", "--force"]);
    let content = std::fs::read_to_string(cli.data_dir().join("config.toml")).unwrap();
    assert!(!content.contains("hunter2"));
    assert!(content.contains("secret_sha256"));
}
