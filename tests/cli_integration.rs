use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{SystemTime, UNIX_EPOCH};

fn temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{}-{nanos}", std::process::id()))
}

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn run_git(repo: &Path, args: &[&str]) {
    let output = Command::new("git")
        .current_dir(repo)
        .args([
            "-c",
            "user.name=Tester",
            "-c",
            "user.email=tester@local",
            "-c",
            "commit.gpgsign=false",
        ])
        .args(args)
        .output()
        .expect("spawn git");
    assert!(
        output.status.success(),
        "git {} failed\nstdout:\n{}\nstderr:\n{}",
        args.join(" "),
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

fn gittrisect_bin() -> String {
    if let Ok(path) = std::env::var("CARGO_BIN_EXE_gittrisect") {
        return path;
    }
    let manifest_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    manifest_dir
        .join("target")
        .join("debug")
        .join("gittrisect")
        .display()
        .to_string()
}

fn init_repo(prefix: &str) -> PathBuf {
    let repo = temp_dir(prefix);
    fs::create_dir_all(&repo).expect("create repo dir");
    run_git(&repo, &["init", "-q", "-b", "main"]);
    fs::write(repo.join("a.txt"), "base\n").expect("write base");
    run_git(&repo, &["add", "a.txt"]);
    run_git(&repo, &["commit", "-q", "-m", "Initial import"]);
    fs::write(repo.join("a.txt"), "base\nchanged\n").expect("mutate file");
    run_git(&repo, &["commit", "-q", "-am", "Change a"]);
    repo
}

#[test]
fn history_json_lists_commits_newest_first() {
    if !git_available() {
        eprintln!("skipping integration test: git binary unavailable");
        return;
    }
    let repo = init_repo("gittrisect-cli-history");

    let output = Command::new(gittrisect_bin())
        .arg("--repo")
        .arg(&repo)
        .arg("--history-json")
        .env_remove("GITTRISECT_LOG")
        .output()
        .expect("run gittrisect --history-json");

    assert!(
        output.status.success(),
        "history-json failed:\nstdout:\n{}\nstderr:\n{}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json["ok"], true);
    assert_eq!(json["branch"], "main");
    let commits = json["commits"].as_array().expect("commits array");
    assert_eq!(commits.len(), 2);
    assert_eq!(commits[0]["message"], "Change a");
    assert_eq!(commits[0]["author"], "Tester");
    assert_eq!(commits[1]["message"], "Initial import");
    assert_eq!(commits[0]["hash"].as_str().map(str::len), Some(40));

    fs::remove_dir_all(&repo).ok();
}

#[test]
fn history_json_honors_limit() {
    if !git_available() {
        eprintln!("skipping integration test: git binary unavailable");
        return;
    }
    let repo = init_repo("gittrisect-cli-limit");

    let output = Command::new(gittrisect_bin())
        .args(["--limit", "1", "--history-json"])
        .current_dir(&repo)
        .env_remove("GITTRISECT_LOG")
        .output()
        .expect("run gittrisect --limit 1 --history-json");

    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json["commits"].as_array().map(Vec::len), Some(1));

    fs::remove_dir_all(&repo).ok();
}

#[test]
fn history_json_reports_failure_outside_repository() {
    if !git_available() {
        eprintln!("skipping integration test: git binary unavailable");
        return;
    }
    let dir = temp_dir("gittrisect-cli-norepo");
    fs::create_dir_all(&dir).expect("create dir");

    let output = Command::new(gittrisect_bin())
        .arg("--history-json")
        .current_dir(&dir)
        .env("GIT_CEILING_DIRECTORIES", std::env::temp_dir())
        .env_remove("GITTRISECT_LOG")
        .output()
        .expect("run gittrisect --history-json");

    assert_eq!(output.status.code(), Some(1));
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).expect("parse json");
    assert_eq!(json["ok"], false);
    assert!(json["error"].as_str().is_some_and(|err| !err.is_empty()));

    fs::remove_dir_all(&dir).ok();
}

#[test]
fn invalid_options_exit_with_usage_error() {
    let output = Command::new(gittrisect_bin())
        .args(["--limit", "0"])
        .env_remove("GITTRISECT_LOG")
        .output()
        .expect("run gittrisect --limit 0");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("history limit"));

    let output = Command::new(gittrisect_bin())
        .args(["--bind", "quit=ctrl+c"])
        .env_remove("GITTRISECT_LOG")
        .output()
        .expect("run gittrisect --bind");
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn unknown_option_fails() {
    let output = Command::new(gittrisect_bin())
        .arg("--bogus")
        .output()
        .expect("run gittrisect --bogus");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("unknown option: --bogus"));
}

#[test]
fn help_prints_usage() {
    let output = Command::new(gittrisect_bin())
        .arg("--help")
        .output()
        .expect("run gittrisect --help");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("USAGE:"));
    assert!(stdout.contains("--history-json"));
}

#[test]
fn refuses_to_start_without_a_terminal() {
    let output = Command::new(gittrisect_bin())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .env_remove("GITTRISECT_LOG")
        .output()
        .expect("run gittrisect");
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("interactive terminal"));
}
