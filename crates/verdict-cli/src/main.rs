mod registry;
mod settings;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use registry::{RunContext, init_run_logging, start_run, write_executions, write_report};
use settings::{Settings, SettingsError, SourceKind};
use thiserror::Error;
use uuid::Uuid;
use verdict_core::{DataSource, Error as CoreError};
use verdict_eval::{
    EvaluateOptions, ExecutionOptions, ExecutionStatus, RuleEvaluator, RuleExecution,
    execute_rule, render_report,
};
use verdict_rules::{
    RuleSet, ValidatedRuleSet, ValidationReport, load_ruleset, ruleset_json_schema,
};
use verdict_source::{CsvSource, MockSource, write_csv};

#[derive(Debug, Error)]
enum CliError {
    #[error("registry error: {0}")]
    Registry(#[from] registry::RegistryError),
    #[error("settings error: {0}")]
    Settings(#[from] SettingsError),
    #[error("data source error: {0}")]
    Source(#[from] CoreError),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("rule set rejected with {0} error(s)")]
    InvalidRuleSet(usize),
    #[error("{0} rule execution(s) failed")]
    ExecutionsFailed(usize),
}

#[derive(Parser, Debug)]
#[command(name = "verdict", version, about = "Verdict data-quality rule runner")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate a rule set and record the run.
    Evaluate(EvaluateArgs),
    /// Validate a rule set without touching data.
    Lint(LintArgs),
    /// Print the JSON Schema for rule-set documents.
    Schema(SchemaArgs),
    /// Write the mock fixture as CSV.
    Sample(SampleArgs),
}

#[derive(Args, Debug)]
struct EvaluateArgs {
    /// Rule-set JSON file.
    #[arg(long)]
    rules: PathBuf,
    /// Settings file (defaults to ./verdict.toml when present).
    #[arg(long)]
    config: Option<PathBuf>,
    /// Data source backend.
    #[arg(long, value_enum)]
    source: Option<SourceKind>,
    /// Root directory for the csv source.
    #[arg(long)]
    data_dir: Option<PathBuf>,
    /// Seed for the mock source.
    #[arg(long)]
    seed: Option<u64>,
    /// Output directory for runs.
    #[arg(long)]
    run_dir: Option<PathBuf>,
    /// Violations kept per execution record.
    #[arg(long)]
    max_violations: Option<usize>,
    /// Exit with an error when any execution fails.
    #[arg(long, default_value_t = false)]
    strict: bool,
}

#[derive(Args, Debug)]
struct LintArgs {
    /// Rule-set JSON file.
    #[arg(long)]
    rules: PathBuf,
}

#[derive(Args, Debug)]
struct SchemaArgs {
    /// Write to a file instead of stdout.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct SampleArgs {
    /// Root directory for the generated CSV files.
    #[arg(long)]
    out: PathBuf,
    #[arg(long, default_value_t = verdict_source::DEFAULT_SEED)]
    seed: u64,
    #[arg(long, default_value_t = 100)]
    rows: u64,
    #[arg(long, default_value = "crm")]
    dataset: String,
    #[arg(long, default_value = "users")]
    table: String,
}

fn main() -> Result<(), CliError> {
    let cli = Cli::parse();

    match cli.command {
        Command::Evaluate(args) => run_evaluate(args),
        Command::Lint(args) => run_lint(args),
        Command::Schema(args) => run_schema(args),
        Command::Sample(args) => run_sample(args),
    }
}

fn run_evaluate(args: EvaluateArgs) -> Result<(), CliError> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(kind) = args.source {
        settings.source.kind = kind;
    }
    if let Some(data_dir) = args.data_dir {
        settings.source.data_dir = data_dir;
    }
    if let Some(seed) = args.seed {
        settings.source.seed = seed;
    }
    if let Some(run_dir) = args.run_dir {
        settings.run_dir = run_dir;
    }
    if let Some(max_violations) = args.max_violations {
        settings.max_persisted_violations = max_violations;
    }
    settings.strict |= args.strict;

    let validated = read_ruleset(&args.rules)?;
    print_issues(&validated.warnings);
    let ruleset = validated.ruleset;

    let run_id = Uuid::new_v4();
    let run_ctx = RunContext {
        run_id,
        started_at: chrono::Utc::now(),
        rules_path: args.rules.clone(),
        ruleset_version: ruleset.ruleset_version.clone(),
        rule_count: ruleset.rules.len(),
        settings: settings.clone(),
    };
    let run_paths = start_run(&run_ctx)?;
    let _run_span = init_run_logging(&run_paths.logs_path, run_id)?;

    let source = build_source(&settings, &ruleset);
    tracing::info!(
        event = "run_started",
        run_id = %run_id,
        source = source.name(),
        rules = ruleset.rules.len()
    );
    let timer = Instant::now();

    let evaluator = RuleEvaluator::new(EvaluateOptions::default());
    let options = ExecutionOptions {
        max_persisted_violations: settings.max_persisted_violations,
    };
    let executions = ruleset
        .rules
        .iter()
        .map(|rule| execute_rule(&evaluator, rule, source.as_ref(), &options))
        .collect::<Vec<_>>();

    for execution in &executions {
        println!("{}", summary_line(execution));
    }

    write_executions(&run_paths, &executions)?;
    tracing::info!(event = "executions_written", path = %run_paths.executions_path.display());
    write_report(&run_paths, &render_report(&executions))?;
    tracing::info!(event = "report_written", path = %run_paths.report_path.display());

    let failed = executions
        .iter()
        .filter(|execution| execution.status == ExecutionStatus::Failed)
        .count();
    let duration_ms = timer.elapsed().as_millis() as u64;
    tracing::info!(
        event = "run_finished",
        failed_executions = failed,
        duration_ms = duration_ms
    );
    println!("run written to {}", run_paths.root.display());

    if settings.strict && failed > 0 {
        return Err(CliError::ExecutionsFailed(failed));
    }
    Ok(())
}

fn run_lint(args: LintArgs) -> Result<(), CliError> {
    let validated = read_ruleset(&args.rules)?;
    print_issues(&validated.warnings);
    println!(
        "{}: {} rule(s) ok, {} warning(s)",
        args.rules.display(),
        validated.ruleset.rules.len(),
        validated.warnings.len()
    );
    Ok(())
}

fn run_schema(args: SchemaArgs) -> Result<(), CliError> {
    let schema = serde_json::to_string_pretty(&ruleset_json_schema())?;
    match args.out {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, schema)?;
        }
        None => println!("{schema}"),
    }
    Ok(())
}

fn run_sample(args: SampleArgs) -> Result<(), CliError> {
    let mock = MockSource::new(args.seed).with_rows(args.rows);
    let path = CsvSource::new(&args.out).table_path(&args.dataset, &args.table);
    let written = write_csv(&path, &MockSource::schema(), &mock.records())?;
    println!("wrote {written} row(s) to {}", path.display());
    Ok(())
}

/// Parse, schema-check and lint a rule-set file; issues are printed on rejection.
fn read_ruleset(path: &Path) -> Result<ValidatedRuleSet, CliError> {
    let contents = fs::read_to_string(path)?;
    let ruleset_json: serde_json::Value = serde_json::from_str(&contents)?;
    let schema_json = serde_json::to_value(ruleset_json_schema())?;

    load_ruleset(&ruleset_json, &schema_json).map_err(|report: ValidationReport| {
        print_issues(&report.errors);
        print_issues(&report.warnings);
        CliError::InvalidRuleSet(report.errors.len())
    })
}

fn print_issues(issues: &[verdict_rules::ValidationIssue]) {
    for issue in issues {
        eprintln!("{issue}");
    }
}

fn build_source(settings: &Settings, ruleset: &RuleSet) -> Box<dyn DataSource> {
    match settings.source.kind {
        SourceKind::Mock => Box::new(MockSource::new(settings.source.seed)),
        SourceKind::Csv => {
            let source = ruleset
                .datasets
                .iter()
                .fold(CsvSource::new(&settings.source.data_dir), |source, table| {
                    source.with_schema(&table.dataset_name, &table.table_name, table.columns.clone())
                });
            Box::new(source)
        }
    }
}

fn summary_line(execution: &RuleExecution) -> String {
    match execution.status {
        ExecutionStatus::Completed => format!(
            "{:<24} {:<12} {:>7.2}%  {} failed / {} checked",
            execution.rule_id,
            execution.category.to_string(),
            execution.success_rate,
            execution.records_failed,
            execution.records_checked
        ),
        ExecutionStatus::Failed => format!(
            "{:<24} {:<12} FAILED   {}",
            execution.rule_id,
            execution.category.to_string(),
            execution.error_message.as_deref().unwrap_or("unknown error")
        ),
        status => format!(
            "{:<24} {:<12} {}",
            execution.rule_id,
            execution.category.to_string(),
            status
        ),
    }
}
