/// Test Case Normalizer
///
/// **Core Responsibility:**
/// Turn a stored test case into positional function arguments whose count
/// matches the target function's parameter map.
///
/// **Critical Properties:**
/// - Never fails: unresolvable inputs are padded/truncated with `null`
/// - `formatted_inputs.len() == arity` for every output
/// - Knows nothing about harnesses, judges or comparison
///
/// The only reliable signal is usually the arity, not the types, so the
/// mapping is an ordered cascade of strategies; the first one that applies
/// wins and explains itself in `parsing_reasoning`.

use crate::literal::{self, matrix_dimensions, parse_lenient, split_top_level};
use arbiter_common::types::{NormalizedTestCase, ParameterMap, ProblemMetadata, RawTestCase};
use serde_json::{Map, Value};
use tracing::debug;

/// A mechanical argument-mapping rule
///
/// Rules are what the oracle path learns once and replays on every case.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappingRule {
    /// Input array elements are the arguments in order
    Positional,
    /// Input is a one-element array wrapping the real input
    UnwrapSingle,
    /// The whole input is the single argument
    WholeAsSingle,
    /// Input is an object keyed by parameter name
    ByName,
}

impl MappingRule {
    /// Candidate order used when inferring a rule from examples
    pub const ALL: [MappingRule; 4] = [
        MappingRule::ByName,
        MappingRule::Positional,
        MappingRule::UnwrapSingle,
        MappingRule::WholeAsSingle,
    ];

    /// Apply the rule to a decoded input, if it fits the input's shape
    pub fn apply(&self, input: &Value, params: &[String]) -> Option<Vec<Value>> {
        let arity = params.len();
        match self {
            MappingRule::ByName => {
                let object = input.as_object()?;
                if !params.iter().any(|p| object.contains_key(p)) {
                    return None;
                }
                Some(
                    params
                        .iter()
                        .map(|p| object.get(p).cloned().unwrap_or(Value::Null))
                        .collect(),
                )
            }
            MappingRule::Positional => match input {
                Value::Array(items) if items.len() == arity && arity > 1 => Some(items.clone()),
                _ => None,
            },
            MappingRule::UnwrapSingle => {
                let items = input.as_array()?;
                if items.len() != 1 {
                    return None;
                }
                let inner = &items[0];
                if arity == 1 {
                    return Some(vec![inner.clone()]);
                }
                match inner {
                    Value::Array(nested) if nested.len() == arity => Some(nested.clone()),
                    _ => None,
                }
            }
            MappingRule::WholeAsSingle => (arity == 1).then(|| vec![input.clone()]),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            MappingRule::Positional => "positional",
            MappingRule::UnwrapSingle => "unwrap-single",
            MappingRule::WholeAsSingle => "whole-as-single",
            MappingRule::ByName => "by-name",
        }
    }
}

/// Input decoded from storage, plus how it was decoded
struct DecodedInput {
    value: Value,
    note: &'static str,
}

type Strategy = fn(&Value, &[String], &ProblemMetadata) -> Option<(Vec<Value>, String)>;

/// Ordered heuristic cascade; the last entry always applies
const STRATEGIES: &[Strategy] = &[
    by_name,
    single_known_matrix,
    single_unwrap,
    single_whole,
    positional,
    unwrap_nested,
    pad_or_truncate,
];

/// Normalize one stored test case with the heuristic cascade
pub fn normalize(
    raw: &RawTestCase,
    params: &ParameterMap,
    problem: &ProblemMetadata,
) -> NormalizedTestCase {
    let names = params.params();
    let decoded = decode_input(&raw.input_data, names);
    let expected_output = decode_expected(&raw.expected_output);

    if names.is_empty() {
        return NormalizedTestCase {
            id: raw.id,
            formatted_inputs: Vec::new(),
            expected_output,
            parsing_reasoning: format!(
                "{}; parameter map declares no arguments, input ignored",
                decoded.note
            ),
        };
    }

    let (formatted_inputs, reasoning) = STRATEGIES
        .iter()
        .find_map(|strategy| strategy(&decoded.value, names, problem))
        .unwrap_or_else(|| pad(&decoded.value, names.len()));

    debug!(test_id = raw.id, arity = names.len(), reasoning = %reasoning, "Normalized test case");

    NormalizedTestCase {
        id: raw.id,
        formatted_inputs,
        expected_output,
        parsing_reasoning: format!("{}; {}", decoded.note, reasoning),
    }
}

/// Normalize one stored test case with a rule learned elsewhere
///
/// Falls back to the heuristic cascade when the rule does not fit this
/// case's shape.
pub fn normalize_with_rule(
    raw: &RawTestCase,
    params: &ParameterMap,
    problem: &ProblemMetadata,
    rule: MappingRule,
) -> NormalizedTestCase {
    let names = params.params();
    let decoded = decode_input(&raw.input_data, names);

    match rule.apply(&decoded.value, names) {
        Some(formatted_inputs) if formatted_inputs.len() == names.len() => NormalizedTestCase {
            id: raw.id,
            formatted_inputs,
            expected_output: decode_expected(&raw.expected_output),
            parsing_reasoning: format!("{}; replayed inferred {} mapping", decoded.note, rule.name()),
        },
        _ => {
            let mut case = normalize(raw, params, problem);
            case.parsing_reasoning.push_str(&format!(
                "; inferred {} mapping did not fit (heuristic)",
                rule.name()
            ));
            case
        }
    }
}

/// Decode stored input into a value the strategies can inspect
///
/// Exposed so the oracle path can compare decoded inputs against the
/// oracle's formatted arguments.
pub fn decoded_input(input: &Value, params: &ParameterMap) -> Value {
    decode_input(input, params.params()).value
}

fn decode_input(input: &Value, names: &[String]) -> DecodedInput {
    let text = match input {
        Value::String(text) => text,
        other => {
            return DecodedInput {
                value: other.clone(),
                note: "structured input",
            }
        }
    };

    if let Some(value) = literal::parse_json(text) {
        return DecodedInput {
            value,
            note: "parsed JSON string input",
        };
    }
    if let Some(value) = parse_lenient(text) {
        return DecodedInput {
            value,
            note: "parsed host-literal string input",
        };
    }
    if let Some(value) = parse_assignments(text, names) {
        return DecodedInput {
            value,
            note: "parsed name = value input",
        };
    }
    if let Some(value) = parse_comma_separated(text) {
        return DecodedInput {
            value,
            note: "parsed comma-separated arguments",
        };
    }
    if let Some(value) = parse_lines(text) {
        return DecodedInput {
            value,
            note: "parsed one argument per line",
        };
    }

    DecodedInput {
        value: Value::String(text.clone()),
        note: "kept raw string input",
    }
}

/// `nums = [2,7,11,15], target = 9` into an object keyed by name
fn parse_assignments(text: &str, names: &[String]) -> Option<Value> {
    let mut object = Map::new();
    for part in split_top_level(text, ',') {
        let (name, value) = part.split_once('=')?;
        let name = name.trim();
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return None;
        }
        let value = value.trim();
        let parsed = parse_lenient(value).unwrap_or_else(|| Value::String(value.to_string()));
        object.insert(name.to_string(), parsed);
    }

    let matches_params = object.keys().any(|k| names.iter().any(|n| n == k));
    (matches_params || names.is_empty()).then_some(Value::Object(object))
}

/// `[2,7,11,15], 9` into a positional array
fn parse_comma_separated(text: &str) -> Option<Value> {
    let parts = split_top_level(text, ',');
    if parts.len() < 2 {
        return None;
    }
    let values = parts
        .iter()
        .map(|part| parse_lenient(part))
        .collect::<Option<Vec<_>>>()?;
    Some(Value::Array(values))
}

/// `"[2,7,11,15]\n9"` into a positional array
fn parse_lines(text: &str) -> Option<Value> {
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();
    if lines.len() < 2 {
        return None;
    }
    let values = lines
        .iter()
        .map(|line| parse_lenient(line))
        .collect::<Option<Vec<_>>>()?;
    Some(Value::Array(values))
}

/// Decode a stored expected output into a typed value when possible
pub fn decode_expected(expected: &Value) -> Value {
    match expected {
        Value::String(text) => {
            parse_lenient(text).unwrap_or_else(|| Value::String(text.trim().to_string()))
        }
        other => other.clone(),
    }
}

fn by_name(input: &Value, names: &[String], _: &ProblemMetadata) -> Option<(Vec<Value>, String)> {
    let values = MappingRule::ByName.apply(input, names)?;
    let missing: Vec<&str> = names
        .iter()
        .filter(|n| input.get(n.as_str()).is_none())
        .map(String::as_str)
        .collect();
    let reasoning = if missing.is_empty() {
        "mapped object fields by parameter name".to_string()
    } else {
        format!(
            "mapped object fields by parameter name, missing {} filled with null (heuristic)",
            missing.join(", ")
        )
    };
    Some((values, reasoning))
}

fn single_known_matrix(
    input: &Value,
    names: &[String],
    problem: &ProblemMetadata,
) -> Option<(Vec<Value>, String)> {
    if names.len() != 1 {
        return None;
    }
    let known = problem.matrix_dimensions?;
    (matrix_dimensions(input) == Some(known)).then(|| {
        (
            vec![input.clone()],
            format!("input is already the {}x{} board, kept whole", known.0, known.1),
        )
    })
}

fn single_unwrap(input: &Value, names: &[String], _: &ProblemMetadata) -> Option<(Vec<Value>, String)> {
    if names.len() != 1 {
        return None;
    }
    let values = MappingRule::UnwrapSingle.apply(input, names)?;
    let reasoning = if literal::is_matrix(&values[0]) {
        "unwrapped single-element array, inner matrix kept as one argument"
    } else {
        "unwrapped single-element array"
    };
    Some((values, reasoning.to_string()))
}

fn single_whole(input: &Value, names: &[String], _: &ProblemMetadata) -> Option<(Vec<Value>, String)> {
    let values = MappingRule::WholeAsSingle.apply(input, names)?;
    Some((values, "whole input is the single argument".to_string()))
}

fn positional(input: &Value, names: &[String], _: &ProblemMetadata) -> Option<(Vec<Value>, String)> {
    let values = MappingRule::Positional.apply(input, names)?;
    Some((values, format!("{} positional arguments", names.len())))
}

fn unwrap_nested(input: &Value, names: &[String], _: &ProblemMetadata) -> Option<(Vec<Value>, String)> {
    if names.len() < 2 {
        return None;
    }
    let values = MappingRule::UnwrapSingle.apply(input, names)?;
    Some((values, "unwrapped one nesting level to reach positional arguments".to_string()))
}

fn pad_or_truncate(input: &Value, names: &[String], _: &ProblemMetadata) -> Option<(Vec<Value>, String)> {
    Some(pad(input, names.len()))
}

fn pad(input: &Value, arity: usize) -> (Vec<Value>, String) {
    let mut values = match input {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let found = values.len();
    values.resize(arity, Value::Null);

    let reasoning = if found > arity {
        format!("ambiguous input: {} values for {} parameters, truncated (heuristic)", found, arity)
    } else if found < arity {
        format!("ambiguous input: {} values for {} parameters, padded with null (heuristic)", found, arity)
    } else {
        format!("{} values used positionally (heuristic)", arity)
    };
    (values, reasoning)
}
