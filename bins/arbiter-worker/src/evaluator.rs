/// Test Evaluator - Lenient Output Equivalence and Scoring
///
/// **Core Responsibility:**
/// Decide whether a program's printed output matches the expected value, and
/// turn judge results into the caller-facing report.
///
/// **Critical Properties:**
/// - Knows nothing about HTTP or credentials
/// - Knows nothing about Redis
/// - Comparison is total: every pair of values yields a verdict
/// - Comparison is symmetric: `compare(a, b).passed == compare(b, a).passed`
///
/// **Equivalence cascade (first match wins):**
/// 1. Loose equality with type coercion (`"42"` vs `42`, `1` vs `1.0`)
/// 2. Canonical text equality
/// 3. Expected is a string: empty/null, literal words, JSON or host-literal
///    decoding, then compare again
/// 4. Mirror of 3 for an actual string
/// 5. Single-element array unwrapping, either side
/// 6. Alphanumeric token streams, lowercased

use crate::engine::JudgeResult;
use crate::literal;
use arbiter_common::types::{
    test_status, NormalizedTestCase, OverallStatus, SubmissionReport, TestCaseReport,
};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;
use uuid::Uuid;

/// Nested decoding never goes deeper than this
const MAX_DEPTH: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    LooseEquality,
    CanonicalText,
    DecodedExpected,
    DecodedActual,
    SingleElementUnwrap,
    TokenStream,
}

impl MatchStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            MatchStrategy::LooseEquality => "loose-equality",
            MatchStrategy::CanonicalText => "canonical-text",
            MatchStrategy::DecodedExpected => "decoded-expected",
            MatchStrategy::DecodedActual => "decoded-actual",
            MatchStrategy::SingleElementUnwrap => "single-element-unwrap",
            MatchStrategy::TokenStream => "token-stream",
        }
    }
}

/// Outcome of one comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ComparisonVerdict {
    pub passed: bool,
    /// The strategy that matched, if any
    pub strategy: Option<MatchStrategy>,
}

type Strategy = fn(&Value, &Value, usize) -> Option<MatchStrategy>;

const CASCADE: &[Strategy] = &[
    loose_equality,
    canonical_text,
    decoded_expected,
    decoded_actual,
    single_element_unwrap,
    token_stream,
];

fn cascade(actual: &Value, expected: &Value, depth: usize) -> Option<MatchStrategy> {
    if depth > MAX_DEPTH {
        return None;
    }
    CASCADE.iter().find_map(|strategy| strategy(actual, expected, depth))
}

/// Compare actual output against the expected value
pub fn compare(actual: &Value, expected: &Value) -> ComparisonVerdict {
    let strategy = cascade(actual, expected, 0);
    let verdict = ComparisonVerdict {
        passed: strategy.is_some(),
        strategy,
    };
    debug!(
        passed = verdict.passed,
        strategy = strategy.map(|s| s.name()).unwrap_or("none"),
        "Compared output"
    );
    verdict
}

pub fn equivalent(actual: &Value, expected: &Value) -> bool {
    compare(actual, expected).passed
}

// ------------------------------------------------------------ strategies

fn numeric_text(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed.parse::<f64>().ok().filter(|n| n.is_finite())
}

fn bool_number(b: bool) -> f64 {
    if b {
        1.0
    } else {
        0.0
    }
}

fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(n), Value::String(s)) | (Value::String(s), Value::Number(n)) => {
            matches!((n.as_f64(), numeric_text(s)), (Some(x), Some(y)) if x == y)
        }
        (Value::Bool(b), Value::Number(n)) | (Value::Number(n), Value::Bool(b)) => {
            n.as_f64() == Some(bool_number(*b))
        }
        (Value::Array(x), Value::Array(y)) => {
            x.len() == y.len() && x.iter().zip(y).all(|(a, b)| loose_eq(a, b))
        }
        (Value::Object(x), Value::Object(y)) => {
            x.len() == y.len() && x.iter().all(|(k, v)| y.get(k).is_some_and(|w| loose_eq(v, w)))
        }
        _ => false,
    }
}

fn loose_equality(actual: &Value, expected: &Value, _depth: usize) -> Option<MatchStrategy> {
    loose_eq(actual, expected).then_some(MatchStrategy::LooseEquality)
}

fn canonical_text(actual: &Value, expected: &Value, _depth: usize) -> Option<MatchStrategy> {
    (literal::canonical_text(actual) == literal::canonical_text(expected))
        .then_some(MatchStrategy::CanonicalText)
}

fn is_null_word(s: &str) -> bool {
    matches!(s, "" | "null" | "None" | "nil" | "undefined")
}

fn literal_word(s: &str) -> Option<Value> {
    match s {
        "true" | "True" => Some(Value::Bool(true)),
        "false" | "False" => Some(Value::Bool(false)),
        "null" | "None" => Some(Value::Null),
        _ => None,
    }
}

/// Match a string against any value by decoding the string
fn string_against(text: &str, other: &Value, depth: usize) -> bool {
    let trimmed = text.trim();

    let other_is_empty = match other {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    };
    if is_null_word(trimmed) && other_is_empty {
        return true;
    }

    if let (Some(n), Value::Number(m)) = (numeric_text(trimmed), other) {
        if m.as_f64() == Some(n) {
            return true;
        }
    }

    if let Some(word) = literal_word(trimmed) {
        if loose_eq(&word, other) {
            return true;
        }
    }

    // Decoding must change the value, or recursion would not shrink it
    let decoded = literal::parse_json(trimmed)
        .filter(|v| v.as_str() != Some(text))
        .or_else(|| literal::parse_lenient(trimmed).filter(|v| v.as_str() != Some(text)));
    match decoded {
        Some(value) => cascade(&value, other, depth + 1).is_some(),
        None => false,
    }
}

fn decoded_expected(actual: &Value, expected: &Value, depth: usize) -> Option<MatchStrategy> {
    let text = expected.as_str()?;
    string_against(text, actual, depth).then_some(MatchStrategy::DecodedExpected)
}

fn decoded_actual(actual: &Value, expected: &Value, depth: usize) -> Option<MatchStrategy> {
    let text = actual.as_str()?;
    string_against(text, expected, depth).then_some(MatchStrategy::DecodedActual)
}

fn single_element_unwrap(actual: &Value, expected: &Value, depth: usize) -> Option<MatchStrategy> {
    let unwrap = |v: &Value| match v {
        Value::Array(items) if items.len() == 1 => Some(items[0].clone()),
        _ => None,
    };

    let matched = unwrap(actual).is_some_and(|inner| cascade(&inner, expected, depth + 1).is_some())
        || unwrap(expected).is_some_and(|inner| cascade(actual, &inner, depth + 1).is_some());
    matched.then_some(MatchStrategy::SingleElementUnwrap)
}

/// Lowercased alphanumeric tokens separated by single spaces
pub fn token_text(value: &Value) -> String {
    let replaced: String = literal::canonical_text(value)
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect();
    replaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn token_stream(actual: &Value, expected: &Value, _depth: usize) -> Option<MatchStrategy> {
    let a = token_text(actual);
    let b = token_text(expected);
    // Punctuation-only values would all collapse to the empty stream
    (!a.is_empty() && a == b).then_some(MatchStrategy::TokenStream)
}

// ------------------------------------------------------------- reporting

/// Decode program stdout into a value
///
/// The whole trimmed text is tried as JSON or host literal first, then the
/// last non-empty line; otherwise the trimmed text is kept as a string.
pub fn parse_actual_output(stdout: &str) -> Value {
    let trimmed = stdout.trim();
    if let Some(value) = literal::parse_lenient(trimmed) {
        return value;
    }
    if let Some(last) = trimmed.lines().rev().map(str::trim).find(|l| !l.is_empty()) {
        if last != trimmed {
            if let Some(value) = literal::parse_lenient(last) {
                return value;
            }
        }
    }
    Value::String(trimmed.to_string())
}

fn inputs_value(case: &NormalizedTestCase) -> Value {
    Value::Array(case.formatted_inputs.clone())
}

/// Evaluate one judged test case
///
/// Only accepted runs are compared; any other judge status is surfaced
/// verbatim as the test status.
pub fn evaluate_result(case: &NormalizedTestCase, result: &JudgeResult) -> TestCaseReport {
    let stdout = result.stdout.as_deref().unwrap_or_default();
    let actual = parse_actual_output(stdout);

    let (passed, status, error) = if result.is_accepted() {
        let verdict = compare(&actual, &case.expected_output);
        debug!(
            test_id = case.id,
            passed = verdict.passed,
            strategy = verdict.strategy.map(|s| s.name()).unwrap_or("none"),
            "Evaluated test"
        );
        let status = if verdict.passed {
            test_status::ACCEPTED
        } else {
            test_status::WRONG_ANSWER
        };
        (verdict.passed, status.to_string(), None)
    } else {
        (
            false,
            result.status.description.clone(),
            result.diagnostic().map(str::to_string),
        )
    };

    TestCaseReport {
        input: inputs_value(case),
        expected_output: case.expected_output.clone(),
        actual_output: actual,
        passed,
        execution_time: result.time,
        memory_used: result.memory,
        status,
        error,
    }
}

/// Report for a test case the judge could not run
pub fn error_report(case: &NormalizedTestCase, message: &str) -> TestCaseReport {
    TestCaseReport {
        input: inputs_value(case),
        expected_output: case.expected_output.clone(),
        actual_output: Value::Null,
        passed: false,
        execution_time: None,
        memory_used: None,
        status: test_status::ERROR.to_string(),
        error: Some(message.to_string()),
    }
}

/// Aggregate per-test reports into the submission report
///
/// `total_tests` counts every submitted case, including those never executed.
pub fn aggregate_results(
    submission_id: Uuid,
    total_tests: usize,
    test_results: Vec<TestCaseReport>,
    api_limit_reached: bool,
) -> SubmissionReport {
    let passed_tests = test_results.iter().filter(|r| r.passed).count();
    let failed_tests = test_results.len() - passed_tests;
    let not_executed = total_tests.saturating_sub(test_results.len());

    let success_rate = if total_tests == 0 {
        0.0
    } else {
        let rate = passed_tests as f64 / total_tests as f64 * 100.0;
        (rate * 100.0).round() / 100.0
    };

    let overall_status = if api_limit_reached && not_executed > 0 {
        OverallStatus::Incomplete
    } else if total_tests > 0 && passed_tests == total_tests {
        OverallStatus::Passed
    } else if passed_tests > 0 {
        OverallStatus::Partial
    } else {
        OverallStatus::Failed
    };

    SubmissionReport {
        submission_id,
        success_rate,
        total_tests,
        passed_tests,
        failed_tests,
        test_results,
        overall_status,
        api_limit_reached: api_limit_reached.then_some(true),
        tests_not_executed: api_limit_reached.then_some(not_executed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::JudgeStatus;
    use serde_json::json;

    fn both_ways(a: Value, b: Value) -> bool {
        let forward = equivalent(&a, &b);
        let backward = equivalent(&b, &a);
        assert_eq!(forward, backward, "asymmetric verdict for {a} vs {b}");
        forward
    }

    #[test]
    fn test_documented_equivalences() {
        assert!(both_ways(json!([5]), json!(5)));
        assert!(both_ways(json!("42"), json!(42)));
        assert!(both_ways(json!("['a','b']"), json!(["a", "b"])));
        assert!(both_ways(json!("None"), Value::Null));
        assert!(both_ways(json!("True"), json!(true)));
        assert!(both_ways(json!([1, 2, 3]), json!("[1, 2, 3]")));
    }

    #[test]
    fn test_numbers_compare_by_value() {
        let verdict = compare(&json!(1), &json!(1.0));
        assert!(verdict.passed);
        assert_eq!(verdict.strategy, Some(MatchStrategy::LooseEquality));
        assert!(both_ways(json!([0.5, 2]), json!([0.5, 2.0])));
    }

    #[test]
    fn test_mismatches() {
        assert!(!both_ways(json!([0, 1]), json!([1, 0])));
        assert!(!both_ways(json!(42), json!(43)));
        assert!(!both_ways(json!("abc"), json!("abd")));
        assert!(!both_ways(json!([1, 2]), json!([12])));
        assert!(!both_ways(json!([]), json!({})));
        assert!(!both_ways(json!(null), json!(0)));
    }

    #[test]
    fn test_strategy_reported() {
        assert_eq!(
            compare(&json!(["a", "b"]), &json!("['a','b']")).strategy,
            Some(MatchStrategy::DecodedExpected)
        );
        assert_eq!(
            compare(&json!("['a','b']"), &json!(["a", "b"])).strategy,
            Some(MatchStrategy::DecodedActual)
        );
        assert_eq!(
            compare(&json!([[1, 2]]), &json!([1, 2])).strategy,
            Some(MatchStrategy::SingleElementUnwrap)
        );
        assert_eq!(
            compare(&json!("Hello,  World!"), &json!("hello world")).strategy,
            Some(MatchStrategy::TokenStream)
        );
    }

    #[test]
    fn test_empty_and_null_equivalence() {
        assert!(both_ways(json!(""), Value::Null));
        assert!(both_ways(json!("null"), Value::Null));
        assert!(!both_ways(json!("null"), json!([])));
    }

    #[test]
    fn test_nested_string_decoding_terminates() {
        assert!(both_ways(json!("\"[1,2]\""), json!([1, 2])));
        assert!(!both_ways(json!("\"x\""), json!("y")));
    }

    #[test]
    fn test_parse_actual_output() {
        assert_eq!(parse_actual_output("[0, 1]\n"), json!([0, 1]));
        assert_eq!(parse_actual_output("['a', 'b']"), json!(["a", "b"]));
        assert_eq!(parse_actual_output("debug line\n42\n"), json!(42));
        assert_eq!(parse_actual_output("  hello world \n"), json!("hello world"));
        assert_eq!(parse_actual_output(""), json!(""));
    }

    fn case(expected: Value) -> NormalizedTestCase {
        NormalizedTestCase {
            id: 1,
            formatted_inputs: vec![json!([2, 7, 11, 15]), json!(9)],
            expected_output: expected,
            parsing_reasoning: String::new(),
        }
    }

    fn judged(id: u32, description: &str, stdout: Option<&str>) -> JudgeResult {
        JudgeResult {
            token: "tok".to_string(),
            status: JudgeStatus {
                id,
                description: description.to_string(),
            },
            stdout: stdout.map(str::to_string),
            stderr: None,
            compile_output: (id == 6).then(|| "SyntaxError".to_string()),
            message: None,
            time: Some(0.01),
            memory: Some(3100),
        }
    }

    #[test]
    fn test_evaluate_accepted_and_wrong() {
        let report = evaluate_result(&case(json!([0, 1])), &judged(3, "Accepted", Some("[0, 1]\n")));
        assert!(report.passed);
        assert_eq!(report.status, "Accepted");
        assert_eq!(report.actual_output, json!([0, 1]));
        assert_eq!(report.input, json!([[2, 7, 11, 15], 9]));
        assert_eq!(report.execution_time, Some(0.01));

        let report = evaluate_result(&case(json!([0, 1])), &judged(3, "Accepted", Some("[1, 2]")));
        assert!(!report.passed);
        assert_eq!(report.status, "Wrong Answer");
        assert!(report.error.is_none());
    }

    #[test]
    fn test_evaluate_judge_failure_status_verbatim() {
        let report = evaluate_result(&case(json!([0, 1])), &judged(6, "Compilation Error", None));
        assert!(!report.passed);
        assert_eq!(report.status, "Compilation Error");
        assert_eq!(report.error.as_deref(), Some("SyntaxError"));
    }

    #[test]
    fn test_aggregate_results() {
        let id = Uuid::new_v4();
        let pass = evaluate_result(&case(json!(1)), &judged(3, "Accepted", Some("1")));
        let fail = error_report(&case(json!(1)), "judge unavailable");

        let report = aggregate_results(id, 2, vec![pass.clone(), pass.clone()], false);
        assert_eq!(report.overall_status, OverallStatus::Passed);
        assert_eq!(report.success_rate, 100.0);
        assert_eq!(report.api_limit_reached, None);

        let report = aggregate_results(id, 3, vec![pass.clone(), fail.clone(), fail.clone()], false);
        assert_eq!(report.overall_status, OverallStatus::Partial);
        assert_eq!(report.passed_tests, 1);
        assert_eq!(report.failed_tests, 2);
        assert_eq!(report.success_rate, 33.33);

        let report = aggregate_results(id, 5, vec![pass.clone(), pass], true);
        assert_eq!(report.overall_status, OverallStatus::Incomplete);
        assert_eq!(report.api_limit_reached, Some(true));
        assert_eq!(report.tests_not_executed, Some(3));
        assert_eq!(report.success_rate, 40.0);

        let report = aggregate_results(id, 1, vec![fail], false);
        assert_eq!(report.overall_status, OverallStatus::Failed);
    }
}
