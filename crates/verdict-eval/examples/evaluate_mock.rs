use std::env;

use verdict_core::{Rule, RuleCategory, RuleTarget};
use verdict_eval::RuleEvaluator;
use verdict_source::MockSource;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut args = env::args().skip(1);
    let mut seed = verdict_source::DEFAULT_SEED;
    let mut column = "Name".to_string();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--seed" => seed = args.next().ok_or("missing --seed value")?.parse()?,
            "--column" => column = args.next().ok_or("missing --column value")?,
            _ => return Err(format!("unexpected argument '{arg}'").into()),
        }
    }

    let rule = Rule::new(
        "completeness_demo",
        RuleCategory::Completeness,
        RuleTarget::new("demo", "crm", "users").with_column(column),
    );
    let result = RuleEvaluator::default().evaluate_source(&rule, &MockSource::new(seed))?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
