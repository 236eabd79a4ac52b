mod actions;
mod app;
mod config;
mod domain;
mod error;
mod git;
mod logger;
mod panes;
mod render;
mod ui;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow, bail};
use log::info;
use serde::Serialize;

use crate::config::AppConfig;
use crate::domain::CommitRecord;
use crate::git::{CliGitClient, GitClient};

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const HELP_TEXT: &str = "\
gittrisect - pick two commits from git history and compare them

USAGE:
  gittrisect [OPTIONS]

OPTIONS:
  -r, --repo <DIR>           Repository to browse (default: current directory)
  -n, --limit <N>            Load at most N commits
  -b, --bind <ACTION=KEY>    Rebind an action (quit, toggle_pane, confirm_selection,
                             request_diff, refresh, filter); repeatable
      --log-file <PATH>      Write debug logs to PATH
      --history-json         Print the parsed history as JSON and exit
  -h, --help                 Print help and exit
  -V, --version              Print version and exit

ENVIRONMENT:
  GITTRISECT_LOG             Log level (error, warn, info, debug, trace)
";

#[derive(Debug)]
enum CliMode {
    RunTui,
    PrintHelp,
    PrintVersion,
    PrintHistoryJson,
}

#[derive(Debug)]
struct CliArgs {
    mode: CliMode,
    config: AppConfig,
}

fn parse_cli_args<I, S>(args: I) -> Result<CliArgs>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut mode = CliMode::RunTui;
    let mut config = AppConfig::default();
    let mut args = args.into_iter().skip(1).map(Into::into);

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) if flag.starts_with("--") => {
                (flag.to_string(), Some(value.to_string()))
            }
            _ => (arg.clone(), None),
        };
        let mut value = |name: &str| -> Result<String> {
            match inline.clone() {
                Some(value) => Ok(value),
                None => args
                    .next()
                    .ok_or_else(|| anyhow!("missing value for {name}\n\n{HELP_TEXT}")),
            }
        };

        match flag.as_str() {
            "-h" | "--help" => mode = CliMode::PrintHelp,
            "-V" | "--version" => mode = CliMode::PrintVersion,
            "--history-json" => mode = CliMode::PrintHistoryJson,
            "-r" | "--repo" => config.repo = Some(PathBuf::from(value(&flag)?)),
            "-n" | "--limit" => {
                let raw = value(&flag)?;
                let limit = raw
                    .parse::<usize>()
                    .with_context(|| format!("invalid value for {flag}: '{raw}'"))?;
                config.history_limit = Some(limit);
            }
            "-b" | "--bind" => {
                let raw = value(&flag)?;
                let Some((action, key)) = raw.split_once('=') else {
                    bail!("invalid binding '{raw}' (expected ACTION=KEY)");
                };
                config
                    .keybinds
                    .insert(action.trim().to_string(), key.trim().to_string());
            }
            "--log-file" => config.log_file = Some(PathBuf::from(value(&flag)?)),
            other => bail!("unknown option: {other}\n\n{HELP_TEXT}"),
        }
    }

    Ok(CliArgs { mode, config })
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum HistoryReport {
    Loaded {
        ok: bool,
        branch: String,
        commits: Vec<CommitRecord>,
    },
    Failed {
        ok: bool,
        error: String,
    },
}

async fn load_history_report(config: &AppConfig) -> Result<HistoryReport> {
    let cwd = config
        .repo_dir()
        .context("failed reading current directory")?;
    let git = CliGitClient::new(cwd);
    let report = match tokio::try_join!(git.branch(), git.history(config.history_limit)) {
        Ok((branch, raw)) => HistoryReport::Loaded {
            ok: true,
            branch,
            commits: git::parse_history(&raw),
        },
        Err(err) => HistoryReport::Failed {
            ok: false,
            error: err.to_string(),
        },
    };
    Ok(report)
}

async fn run(args: CliArgs) -> Result<ExitCode> {
    let CliArgs { mode, mut config } = args;
    match mode {
        CliMode::PrintHelp => {
            println!("{HELP_TEXT}");
            return Ok(ExitCode::SUCCESS);
        }
        CliMode::PrintVersion => {
            println!("{APP_NAME} {APP_VERSION}");
            return Ok(ExitCode::SUCCESS);
        }
        CliMode::RunTui | CliMode::PrintHistoryJson => {}
    }

    config::apply_env(&mut config, |name| std::env::var(name).ok());
    let issues = config::validate_config(&config);
    if !issues.is_empty() {
        for issue in &issues {
            eprintln!("{APP_NAME}: {issue}");
        }
        return Ok(ExitCode::from(2));
    }

    if let Some(path) = logger::init(&config)? {
        info!("{APP_NAME} {APP_VERSION} logging to {}", path.display());
    }

    if matches!(mode, CliMode::PrintHistoryJson) {
        let report = load_history_report(&config).await?;
        let failed = matches!(report, HistoryReport::Failed { .. });
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(if failed {
            ExitCode::FAILURE
        } else {
            ExitCode::SUCCESS
        });
    }

    if let Some(message) = app::run_app(config).await? {
        println!("{message}");
    }
    Ok(ExitCode::SUCCESS)
}

#[tokio::main]
async fn main() -> ExitCode {
    let result = match parse_cli_args(std::env::args()) {
        Ok(args) => run(args).await,
        Err(err) => Err(err),
    };
    match result {
        Ok(code) => code,
        Err(err) => {
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn parse_help() {
        let args = parse_cli_args(argv(&["gittrisect", "--help"])).expect("help parses");
        assert!(matches!(args.mode, CliMode::PrintHelp));
    }

    #[test]
    fn parse_version() {
        let args = parse_cli_args(argv(&["gittrisect", "-V"])).expect("version parses");
        assert!(matches!(args.mode, CliMode::PrintVersion));
    }

    #[test]
    fn parse_defaults_to_tui() {
        let args = parse_cli_args(argv(&["gittrisect"])).expect("no args parse");
        assert!(matches!(args.mode, CliMode::RunTui));
        assert!(args.config.repo.is_none());
        assert!(args.config.history_limit.is_none());
    }

    #[test]
    fn parse_options_with_separate_and_inline_values() {
        let args = parse_cli_args(argv(&[
            "gittrisect",
            "--repo",
            "/tmp/repo",
            "--limit=50",
            "-b",
            "quit=x",
            "--bind=refresh = F5",
            "--log-file",
            "/tmp/trisect.log",
            "--history-json",
        ]))
        .expect("options parse");
        assert!(matches!(args.mode, CliMode::PrintHistoryJson));
        assert_eq!(args.config.repo, Some(PathBuf::from("/tmp/repo")));
        assert_eq!(args.config.history_limit, Some(50));
        assert_eq!(
            args.config.keybinds.get("quit").map(String::as_str),
            Some("x")
        );
        assert_eq!(
            args.config.keybinds.get("refresh").map(String::as_str),
            Some("F5")
        );
        assert_eq!(
            args.config.log_file,
            Some(PathBuf::from("/tmp/trisect.log"))
        );
    }

    #[test]
    fn parse_rejects_unknown_and_incomplete_options() {
        let err = parse_cli_args(argv(&["gittrisect", "--bogus"])).expect_err("unknown option");
        assert!(err.to_string().contains("unknown option: --bogus"));

        let err = parse_cli_args(argv(&["gittrisect", "--limit"])).expect_err("missing value");
        assert!(err.to_string().contains("missing value for --limit"));

        let err = parse_cli_args(argv(&["gittrisect", "--limit", "many"])).expect_err("bad limit");
        assert!(err.to_string().contains("invalid value for --limit"));

        let err = parse_cli_args(argv(&["gittrisect", "--bind", "quit"])).expect_err("bad bind");
        assert!(err.to_string().contains("expected ACTION=KEY"));
    }

    #[test]
    fn history_report_serializes_flat() {
        let report = HistoryReport::Failed {
            ok: false,
            error: "boom".to_string(),
        };
        let json = serde_json::to_value(&report).expect("json");
        assert_eq!(json, serde_json::json!({"ok": false, "error": "boom"}));
    }
}
