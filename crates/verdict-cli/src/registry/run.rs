use std::fs::{OpenOptions, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;
use verdict_eval::RuleExecution;

use crate::settings::Settings;

use super::{RegistryError, RegistryResult};

/// Metadata captured at run start.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub rules_path: PathBuf,
    pub ruleset_version: String,
    pub rule_count: usize,
    pub settings: Settings,
}

/// JSON config written to each run directory.
#[derive(Debug, Serialize)]
pub struct RunConfig {
    pub run_id: String,
    pub started_at: String,
    pub rules_path: String,
    pub ruleset_version: String,
    pub rule_count: usize,
    pub settings: Settings,
    pub git: GitInfo,
}

/// Git metadata for reproducibility.
#[derive(Debug, Serialize)]
pub struct GitInfo {
    pub commit: Option<String>,
    pub dirty: Option<bool>,
}

/// Paths for run artifacts.
#[derive(Debug, Clone)]
pub struct RunPaths {
    pub root: PathBuf,
    pub config_path: PathBuf,
    pub logs_path: PathBuf,
    pub executions_path: PathBuf,
    pub report_path: PathBuf,
}

/// Create `<run_dir>/<timestamp>__run_<id>/` with `config.json` and an
/// empty `logs.ndjson`.
pub fn start_run(ctx: &RunContext) -> RegistryResult<RunPaths> {
    let timestamp = ctx.started_at.format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let root = ctx
        .settings
        .run_dir
        .join(format!("{timestamp}__run_{}", ctx.run_id));

    create_dir_all(&root)?;

    let paths = RunPaths {
        config_path: root.join("config.json"),
        logs_path: root.join("logs.ndjson"),
        executions_path: root.join("executions.json"),
        report_path: root.join("report.md"),
        root,
    };

    let config = RunConfig {
        run_id: ctx.run_id.to_string(),
        started_at: ctx.started_at.to_rfc3339(),
        rules_path: ctx.rules_path.display().to_string(),
        ruleset_version: ctx.ruleset_version.clone(),
        rule_count: ctx.rule_count,
        settings: ctx.settings.clone(),
        git: collect_git_info(),
    };
    write_json(&paths.config_path, &config)?;

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(&paths.logs_path)?;

    Ok(paths)
}

pub fn write_executions(paths: &RunPaths, executions: &[RuleExecution]) -> RegistryResult<()> {
    write_json(&paths.executions_path, executions)
}

pub fn write_report(paths: &RunPaths, report: &str) -> RegistryResult<()> {
    let mut file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(&paths.report_path)?;
    file.write_all(report.as_bytes())?;
    Ok(())
}

pub fn collect_git_info() -> GitInfo {
    let commit = Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .and_then(|output| {
            if output.status.success() {
                Some(String::from_utf8_lossy(&output.stdout).trim().to_string())
            } else {
                None
            }
        })
        .filter(|value| !value.is_empty());

    let dirty = Command::new("git")
        .args(["status", "--porcelain"])
        .output()
        .ok()
        .filter(|output| output.status.success())
        .map(|output| !output.stdout.is_empty());

    GitInfo { commit, dirty }
}

fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> RegistryResult<()> {
    let file = OpenOptions::new()
        .create(true)
        .truncate(true)
        .write(true)
        .open(path)?;
    serde_json::to_writer_pretty(file, value).map_err(RegistryError::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RunContext {
        let settings = Settings {
            run_dir: std::env::temp_dir().join(format!("verdict_runs_{}", Uuid::new_v4())),
            ..Settings::default()
        };
        RunContext {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            rules_path: PathBuf::from("rules.json"),
            ruleset_version: "0.1".to_string(),
            rule_count: 2,
            settings,
        }
    }

    #[test]
    fn start_run_lays_out_artifacts() {
        let ctx = context();
        let paths = start_run(&ctx).expect("start run");

        let dir_name = paths
            .root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .expect("run dir name");
        assert!(dir_name.ends_with(&format!("__run_{}", ctx.run_id)));
        assert!(paths.logs_path.exists());

        let config: serde_json::Value = serde_json::from_str(
            &std::fs::read_to_string(&paths.config_path).expect("read config"),
        )
        .expect("parse config");
        assert_eq!(config["rule_count"], 2);
        assert_eq!(config["settings"]["source"]["kind"], "mock");
        assert_eq!(config["settings"]["max_persisted_violations"], 10);

        write_executions(&paths, &[]).expect("write executions");
        write_report(&paths, "# report").expect("write report");
        assert_eq!(
            std::fs::read_to_string(&paths.executions_path).expect("read executions"),
            "[]"
        );
        assert_eq!(
            std::fs::read_to_string(&paths.report_path).expect("read report"),
            "# report"
        );
    }
}
