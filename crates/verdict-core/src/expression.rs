//! Expression mini-language for validity rules.
//!
//! | prefix    | operand | predicate                                  |
//! |-----------|---------|--------------------------------------------|
//! | `regex:`  | text    | value matches the regular expression       |
//! | `length:` | text    | `>N`, `<N`, `>=N`, `<=N` or bare `N`       |
//! | `in:`     | text    | value is one of the comma-separated items  |
//! | `range:`  | numeric | `min,max`, inclusive on both ends          |
//!
//! Expressions that cannot be interpreted never fail a record: they parse to
//! [`Predicate::PassThrough`] and accept every value. A value whose runtime
//! type does not fit the predicate is accepted as well.

use std::collections::HashSet;
use std::fmt;

use regex::Regex;

use crate::value::Value;

const REGEX_PREFIX: &str = "regex:";
const LENGTH_PREFIX: &str = "length:";
const IN_PREFIX: &str = "in:";
const RANGE_PREFIX: &str = "range:";

/// Parsed expression together with its source text.
#[derive(Debug, Clone)]
pub struct Expression {
    raw: String,
    predicate: Predicate,
}

/// Typed predicate descriptor.
#[derive(Debug, Clone)]
pub enum Predicate {
    Regex(Regex),
    Length { op: LengthOp, bound: i64 },
    OneOf(HashSet<String>),
    Range { min: f64, max: f64 },
    /// Accepts every value.
    PassThrough(PassReason),
}

/// Comparison used by `length:` clauses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LengthOp {
    Gt,
    Lt,
    Ge,
    Le,
    Eq,
}

impl LengthOp {
    fn compare(self, left: i64, right: i64) -> bool {
        match self {
            LengthOp::Gt => left > right,
            LengthOp::Lt => left < right,
            LengthOp::Ge => left >= right,
            LengthOp::Le => left <= right,
            LengthOp::Eq => left == right,
        }
    }
}

/// Why an expression degraded to [`Predicate::PassThrough`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassReason {
    /// No recognized `regex:`/`length:`/`in:`/`range:` prefix.
    UnknownPrefix,
    /// Prefix recognized but the operand could not be parsed.
    InvalidOperand(String),
}

impl fmt::Display for PassReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassReason::UnknownPrefix => f.write_str("unrecognized expression prefix"),
            PassReason::InvalidOperand(detail) => write!(f, "invalid operand: {detail}"),
        }
    }
}

impl Expression {
    /// Parse an expression. Never fails; see [`Predicate::PassThrough`].
    pub fn parse(raw: &str) -> Self {
        Self {
            raw: raw.to_string(),
            predicate: parse_predicate(raw),
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    /// Reason the expression accepts everything, if it does.
    pub fn pass_reason(&self) -> Option<&PassReason> {
        match &self.predicate {
            Predicate::PassThrough(reason) => Some(reason),
            _ => None,
        }
    }

    /// Decide whether `value` satisfies the expression.
    pub fn accepts(&self, value: &Value) -> bool {
        match (&self.predicate, value) {
            (Predicate::Regex(re), Value::Text(text)) => re.is_match(text),
            (Predicate::Length { op, bound }, Value::Text(text)) => {
                op.compare(text.chars().count() as i64, *bound)
            }
            (Predicate::OneOf(values), Value::Text(text)) => values.contains(text.as_str()),
            (Predicate::Range { min, max }, Value::Int(_) | Value::Float(_)) => value
                .as_f64()
                .map(|number| number >= *min && number <= *max)
                .unwrap_or(true),
            // Type mismatch or uninterpretable expression.
            _ => true,
        }
    }
}

fn parse_predicate(raw: &str) -> Predicate {
    if let Some(pattern) = raw.strip_prefix(REGEX_PREFIX) {
        return match Regex::new(pattern) {
            Ok(re) => Predicate::Regex(re),
            Err(err) => Predicate::PassThrough(PassReason::InvalidOperand(err.to_string())),
        };
    }
    if let Some(operand) = raw.strip_prefix(LENGTH_PREFIX) {
        return parse_length(operand);
    }
    if let Some(operand) = raw.strip_prefix(IN_PREFIX) {
        return Predicate::OneOf(parse_in_list(operand));
    }
    if let Some(operand) = raw.strip_prefix(RANGE_PREFIX) {
        return parse_range(operand);
    }
    Predicate::PassThrough(PassReason::UnknownPrefix)
}

fn parse_length(operand: &str) -> Predicate {
    let operand = operand.trim();
    // Two-character operators first so `>=5` is not read as `>` + `=5`.
    let (op, bound) = if let Some(rest) = operand.strip_prefix(">=") {
        (LengthOp::Ge, rest)
    } else if let Some(rest) = operand.strip_prefix("<=") {
        (LengthOp::Le, rest)
    } else if let Some(rest) = operand.strip_prefix('>') {
        (LengthOp::Gt, rest)
    } else if let Some(rest) = operand.strip_prefix('<') {
        (LengthOp::Lt, rest)
    } else {
        (LengthOp::Eq, operand)
    };

    match bound.trim().parse::<i64>() {
        Ok(bound) => Predicate::Length { op, bound },
        Err(_) => Predicate::PassThrough(PassReason::InvalidOperand(format!(
            "length bound '{}' is not an integer",
            bound.trim()
        ))),
    }
}

fn parse_in_list(operand: &str) -> HashSet<String> {
    operand
        .split(',')
        .map(|item| item.trim().to_string())
        .collect()
}

fn parse_range(operand: &str) -> Predicate {
    let parts = operand.split(',').collect::<Vec<_>>();
    if parts.len() != 2 {
        return Predicate::PassThrough(PassReason::InvalidOperand(format!(
            "range expects 'min,max', found {} part(s)",
            parts.len()
        )));
    }

    match (parts[0].trim().parse::<f64>(), parts[1].trim().parse::<f64>()) {
        (Ok(min), Ok(max)) => Predicate::Range { min, max },
        _ => Predicate::PassThrough(PassReason::InvalidOperand(format!(
            "range bounds '{}' are not numeric",
            operand.trim()
        ))),
    }
}

/// Split a consistency expression `left == right` into trimmed column names.
///
/// Returns `None` unless the text splits on `==` into exactly two parts.
pub fn equality_operands(expression: &str) -> Option<(String, String)> {
    let parts = expression.split("==").map(str::trim).collect::<Vec<_>>();
    match parts.as_slice() {
        [left, right] => Some((left.to_string(), right.to_string())),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(value: &str) -> Value {
        Value::Text(value.to_string())
    }

    #[test]
    fn regex_is_unanchored_search() {
        let expr = Expression::parse(r"regex:^user\d+@example\.com$");
        assert!(expr.accepts(&text("user7@example.com")));
        assert!(!expr.accepts(&text("admin@example.com")));

        let expr = Expression::parse("regex:abc");
        assert!(expr.accepts(&text("xxabcxx")));
    }

    #[test]
    fn length_operators() {
        let cases = [
            ("length:>5", "abcdef", true),
            ("length:>5", "abcde", false),
            ("length:<3", "ab", true),
            ("length:<3", "abc", false),
            ("length:>=5", "abcde", true),
            ("length:>=5", "abcd", false),
            ("length:<=2", "ab", true),
            ("length:<=2", "abc", false),
            ("length:5", "abcde", true),
            ("length:5", "abcdef", false),
            ("length: >= 3 ", "abc", true),
        ];
        for (raw, value, expected) in cases {
            let expr = Expression::parse(raw);
            assert_eq!(expr.accepts(&text(value)), expected, "{raw} on '{value}'");
        }
    }

    #[test]
    fn length_counts_characters() {
        let expr = Expression::parse("length:4");
        assert!(expr.accepts(&text("ñañá")));
    }

    #[test]
    fn in_list_trims_entries() {
        let expr = Expression::parse("in: Active , Inactive,Pending ");
        assert!(expr.accepts(&text("Active")));
        assert!(expr.accepts(&text("Inactive")));
        assert!(expr.accepts(&text("Pending")));
        assert!(!expr.accepts(&text("active")));
        assert!(!expr.accepts(&text(" Active")));
    }

    #[test]
    fn range_is_inclusive_for_ints_and_floats() {
        let expr = Expression::parse("range:18,65");
        assert!(expr.accepts(&Value::Int(18)));
        assert!(expr.accepts(&Value::Int(65)));
        assert!(!expr.accepts(&Value::Int(70)));
        assert!(!expr.accepts(&Value::Int(17)));
        assert!(expr.accepts(&Value::Float(64.9)));
        assert!(!expr.accepts(&Value::Float(65.01)));

        let expr = Expression::parse("range:0.0,100.0");
        assert!(expr.accepts(&Value::Float(99.99)));
        assert!(!expr.accepts(&Value::Float(-0.5)));
    }

    // Lenient defaults. Whether an uninterpretable expression should pass
    // or fail records is unresolved; these tests pin the current "pass"
    // behavior so any change to it is deliberate.

    #[test]
    fn type_mismatch_passes() {
        let range = Expression::parse("range:18,65");
        assert!(range.accepts(&text("unknown")));
        assert!(range.accepts(&Value::Null));
        assert!(range.accepts(&Value::Bool(true)));

        let regex = Expression::parse("regex:^x$");
        assert!(regex.accepts(&Value::Int(5)));
        assert!(regex.accepts(&Value::Null));

        let length = Expression::parse("length:>100");
        assert!(length.accepts(&Value::Float(1.0)));
    }

    #[test]
    fn unknown_prefix_passes() {
        let expr = Expression::parse("daterange:2020-01-01,2025-12-31");
        assert_eq!(expr.pass_reason(), Some(&PassReason::UnknownPrefix));
        assert!(expr.accepts(&text("1999-01-01")));

        // Prefixes are case-sensitive.
        let expr = Expression::parse("REGEX:^x$");
        assert_eq!(expr.pass_reason(), Some(&PassReason::UnknownPrefix));
        assert!(expr.accepts(&text("nope")));
    }

    #[test]
    fn unparseable_operands_pass() {
        for raw in [
            "length:>abc",
            "length:",
            "range:1",
            "range:1,2,3",
            "range:low,high",
            "regex:(unclosed",
        ] {
            let expr = Expression::parse(raw);
            assert!(
                matches!(expr.pass_reason(), Some(PassReason::InvalidOperand(_))),
                "{raw} should degrade to pass-through"
            );
            assert!(expr.accepts(&text("anything")), "{raw} should accept text");
            assert!(expr.accepts(&Value::Int(1_000)), "{raw} should accept ints");
        }
    }

    #[test]
    fn equality_operands_require_exactly_two_parts() {
        assert_eq!(
            equality_operands(" Status == Status2 "),
            Some(("Status".to_string(), "Status2".to_string()))
        );
        assert_eq!(equality_operands("a==b==c"), None);
        assert_eq!(equality_operands("a != b"), None);
        assert_eq!(equality_operands(""), None);
        assert_eq!(
            equality_operands("==b"),
            Some((String::new(), "b".to_string()))
        );
    }
}
