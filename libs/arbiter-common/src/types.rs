use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

/// Name of the trailing parameter-map slot that holds the expected output
pub const OUTPUT_SLOT: &str = "output";

/// Strongly-typed language enum
/// Serialized lowercase, parsed case-insensitively with common aliases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[serde(alias = "py", alias = "python3")]
    Python,
    #[serde(alias = "js", alias = "node")]
    JavaScript,
    Java,
    #[serde(alias = "c++")]
    Cpp,
    C,
    #[serde(alias = "golang")]
    Go,
    Rust,
}

impl Language {
    /// Returns all language variants
    pub fn all_variants() -> &'static [Language] {
        &[
            Language::Python,
            Language::JavaScript,
            Language::Java,
            Language::Cpp,
            Language::C,
            Language::Go,
            Language::Rust,
        ]
    }

    /// Parse a language from string (case-insensitive)
    pub fn from_str(s: &str) -> Option<Language> {
        match s.trim().to_lowercase().as_str() {
            "python" | "python3" | "py" => Some(Language::Python),
            "javascript" | "js" | "node" => Some(Language::JavaScript),
            "java" => Some(Language::Java),
            "cpp" | "c++" => Some(Language::Cpp),
            "c" => Some(Language::C),
            "go" | "golang" => Some(Language::Go),
            "rust" => Some(Language::Rust),
            _ => None,
        }
    }

    /// Judge0 language identifier
    pub fn judge_language_id(&self) -> u32 {
        match self {
            Language::Python => 71,
            Language::JavaScript => 63,
            Language::Java => 62,
            Language::Cpp => 54,
            Language::C => 50,
            Language::Go => 60,
            Language::Rust => 73,
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::Python => "python",
            Language::JavaScript => "javascript",
            Language::Java => "java",
            Language::Cpp => "cpp",
            Language::C => "c",
            Language::Go => "go",
            Language::Rust => "rust",
        };
        write!(f, "{}", name)
    }
}

/// Stored test case (immutable input)
///
/// `input_data` may itself be a JSON-encoded string; `expected_output` may be
/// structured or a string in any serialization convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawTestCase {
    #[serde(default)]
    pub id: u32,
    pub input_data: Value,
    #[serde(default)]
    pub expected_output: Value,
}

/// Ordered parameter names of the target function
///
/// A trailing `"output"` entry marks the expected-output slot and is not an
/// argument.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterMap(Vec<String>);

impl ParameterMap {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(Into::into).collect())
    }

    /// Argument names, with the trailing output slot stripped
    pub fn params(&self) -> &[String] {
        match self.0.split_last() {
            Some((last, rest)) if last.trim().eq_ignore_ascii_case(OUTPUT_SLOT) => rest,
            _ => &self.0,
        }
    }

    /// Number of positional arguments the harness must pass
    pub fn arity(&self) -> usize {
        self.params().len()
    }
}

/// Problem-level information available to the normalizer and synthesizer
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemMetadata {
    #[serde(default)]
    pub title: String,
    /// Declared entry-point name, if the problem record carries one
    #[serde(default)]
    pub function_name: Option<String>,
    /// Declared signature text, passed to the mapping oracle verbatim
    #[serde(default)]
    pub signature: Option<String>,
    pub parameter_map: ParameterMap,
    /// Known board dimensions (rows, cols) for grid problems
    #[serde(default)]
    pub matrix_dimensions: Option<(usize, usize)>,
}

/// Test case after normalization
///
/// `formatted_inputs.len()` always equals the parameter map's arity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedTestCase {
    pub id: u32,
    pub formatted_inputs: Vec<Value>,
    pub expected_output: Value,
    pub parsing_reasoning: String,
}

/// Queue payload: one solution judged against one problem's test cases
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: Uuid,
    pub language: Language,
    pub source_code: String,
    pub problem: ProblemMetadata,
    pub test_cases: Vec<RawTestCase>,
    pub submitted_at: DateTime<Utc>,
}

/// Per-test status labels surfaced to callers
pub mod test_status {
    pub const ACCEPTED: &str = "Accepted";
    pub const WRONG_ANSWER: &str = "Wrong Answer";
    pub const ERROR: &str = "Error";
}

/// Per-test outcome in the caller-facing report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestCaseReport {
    pub input: Value,
    pub expected_output: Value,
    pub actual_output: Value,
    pub passed: bool,
    /// Seconds, as reported by the judge
    pub execution_time: Option<f64>,
    /// Kilobytes, as reported by the judge
    pub memory_used: Option<u64>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregate state of a judged submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Passed,
    Partial,
    Failed,
    Incomplete,
}

/// Caller-facing result of judging a submission
///
/// `api_limit_reached` and `tests_not_executed` are only present when the
/// judge's rate limit stopped execution early.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmissionReport {
    pub submission_id: Uuid,
    pub success_rate: f64,
    pub total_tests: usize,
    pub passed_tests: usize,
    pub failed_tests: usize,
    pub test_results: Vec<TestCaseReport>,
    pub overall_status: OverallStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_limit_reached: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests_not_executed: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_language_serialization() {
        let json = serde_json::to_string(&Language::JavaScript).unwrap();
        assert_eq!(json, "\"javascript\"");

        let deserialized: Language = serde_json::from_str("\"py\"").unwrap();
        assert_eq!(deserialized, Language::Python);
    }

    #[test]
    fn test_language_from_str() {
        assert_eq!(Language::from_str("Python"), Some(Language::Python));
        assert_eq!(Language::from_str("C++"), Some(Language::Cpp));
        assert_eq!(Language::from_str("golang"), Some(Language::Go));
        assert_eq!(Language::from_str("cobol"), None);
        assert_eq!(Language::from_str(""), None);
    }

    #[test]
    fn test_judge_language_ids() {
        assert_eq!(Language::Python.judge_language_id(), 71);
        assert_eq!(Language::Java.judge_language_id(), 62);
        assert_eq!(Language::Cpp.judge_language_id(), 54);
        assert_eq!(Language::JavaScript.judge_language_id(), 63);
        assert_eq!(Language::C.judge_language_id(), 50);
        assert_eq!(Language::Go.judge_language_id(), 60);
        assert_eq!(Language::Rust.judge_language_id(), 73);
    }

    #[test]
    fn test_parameter_map_strips_output_slot() {
        let map = ParameterMap::new(["nums", "target", "output"]);
        assert_eq!(map.params(), &["nums".to_string(), "target".to_string()]);
        assert_eq!(map.arity(), 2);
    }

    #[test]
    fn test_parameter_map_without_output_slot() {
        let map = ParameterMap::new(["board"]);
        assert_eq!(map.arity(), 1);

        let map: ParameterMap = serde_json::from_value(json!(["s", "Output"])).unwrap();
        assert_eq!(map.arity(), 1);
    }

    #[test]
    fn test_raw_test_case_defaults() {
        let case: RawTestCase = serde_json::from_value(json!({
            "input_data": "[[2,7,11,15], 9]"
        }))
        .unwrap();
        assert_eq!(case.id, 0);
        assert_eq!(case.expected_output, Value::Null);
    }

    #[test]
    fn test_report_omits_rate_limit_fields_when_absent() {
        let report = SubmissionReport {
            submission_id: Uuid::new_v4(),
            success_rate: 100.0,
            total_tests: 1,
            passed_tests: 1,
            failed_tests: 0,
            test_results: vec![],
            overall_status: OverallStatus::Passed,
            api_limit_reached: None,
            tests_not_executed: None,
        };

        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("api_limit_reached").is_none());
        assert!(json.get("tests_not_executed").is_none());
        assert_eq!(json["overall_status"], "passed");
    }
}
