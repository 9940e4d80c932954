/// Oracle-assisted argument mapping
///
/// A text-generation collaborator is slow and expensive, so it only sees a
/// small sample of cases. The mapping it produces is reduced to one
/// `MappingRule`, which is then replayed mechanically on every other case.
/// Anything malformed sends the whole problem back to the heuristic cascade.

use crate::normalizer::{self, MappingRule};
use arbiter_common::config::OracleConfig;
use arbiter_common::types::{NormalizedTestCase, ProblemMetadata, RawTestCase};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle request failed: {0}")]
    Request(String),
    #[error("oracle response malformed: {0}")]
    Malformed(String),
}

/// Send a prompt, get text back
#[async_trait]
pub trait MappingOracle: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError>;
}

/// One validated entry of the oracle's answer
#[derive(Debug, Clone, PartialEq)]
pub struct OracleSuggestion {
    pub id: Option<u32>,
    pub formatted_inputs: Vec<Value>,
    pub expected_output: Value,
    pub parsing_reasoning: String,
}

/// Build the strict mapping prompt for a sample of raw cases
pub fn build_prompt(problem: &ProblemMetadata, sample: &[RawTestCase]) -> String {
    let params = problem.parameter_map.params().join(", ");
    let signature = problem
        .signature
        .as_deref()
        .or(problem.function_name.as_deref())
        .unwrap_or("(not provided)");
    let cases: Vec<Value> = sample
        .iter()
        .map(|c| json!({ "id": c.id, "input_data": c.input_data, "expected_output": c.expected_output }))
        .collect();
    let cases = serde_json::to_string_pretty(&cases).unwrap_or_else(|_| "[]".to_string());

    format!(
        "Problem: {title}\n\
         Function signature: {signature}\n\
         Parameters in order: {params}\n\n\
         Raw test cases:\n{cases}\n\n\
         For each raw test case, produce the exact positional arguments to pass to the \
         function, one entry per parameter, in parameter order.\n\
         Respond with ONLY a JSON array. Each element must be an object with the keys \
         \"id\", \"formatted_inputs\" (array with exactly {arity} elements), \
         \"expected_output\", and \"parsing_reasoning\". No prose, no markdown.",
        title = problem.title,
        signature = signature,
        params = params,
        cases = cases,
        arity = problem.parameter_map.arity(),
    )
}

/// Remove a surrounding markdown code fence, if any
pub fn strip_code_fences(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (```json)
    let body = match rest.find('\n') {
        Some(idx) => &rest[idx + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Parse and validate the oracle's answer
///
/// Must be a JSON array of objects, each with non-null `formatted_inputs`
/// (an array of exactly `arity` values) and non-null `expected_output`.
pub fn parse_suggestions(text: &str, arity: usize) -> Result<Vec<OracleSuggestion>, OracleError> {
    let value: Value = serde_json::from_str(strip_code_fences(text))
        .map_err(|e| OracleError::Malformed(format!("not JSON: {}", e)))?;
    let entries = value
        .as_array()
        .ok_or_else(|| OracleError::Malformed("top level is not an array".to_string()))?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let object = entry
                .as_object()
                .ok_or_else(|| OracleError::Malformed(format!("entry {} is not an object", idx)))?;
            let formatted_inputs = match object.get("formatted_inputs") {
                Some(Value::Array(items)) => items.clone(),
                _ => {
                    return Err(OracleError::Malformed(format!(
                        "entry {} has no formatted_inputs array",
                        idx
                    )))
                }
            };
            if formatted_inputs.len() != arity {
                return Err(OracleError::Malformed(format!(
                    "entry {} has {} formatted inputs, expected {}",
                    idx,
                    formatted_inputs.len(),
                    arity
                )));
            }
            let expected_output = match object.get("expected_output") {
                Some(v) if !v.is_null() => v.clone(),
                _ => {
                    return Err(OracleError::Malformed(format!(
                        "entry {} has null expected_output",
                        idx
                    )))
                }
            };
            let id = object.get("id").and_then(|id| match id {
                Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()),
                Value::String(s) => s.trim().parse().ok(),
                _ => None,
            });
            let parsing_reasoning = object
                .get("parsing_reasoning")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();

            Ok(OracleSuggestion {
                id,
                formatted_inputs,
                expected_output,
                parsing_reasoning,
            })
        })
        .collect()
}

/// Pair each sampled case with its suggestion, by id first, then position
///
/// A suggestion whose id names a sampled case is never paired by position.
fn pair_suggestions<'a>(
    sample: &'a [RawTestCase],
    suggestions: &'a [OracleSuggestion],
) -> Vec<(&'a RawTestCase, &'a OracleSuggestion)> {
    let claimed_by_id =
        |s: &OracleSuggestion| s.id.is_some_and(|id| sample.iter().any(|case| case.id == id));

    sample
        .iter()
        .enumerate()
        .filter_map(|(idx, case)| {
            suggestions
                .iter()
                .find(|s| s.id == Some(case.id))
                .or_else(|| suggestions.get(idx).filter(|s| !claimed_by_id(s)))
                .map(|s| (case, s))
        })
        .collect()
}

/// Find the one rule that reproduces the oracle's mapping on every sampled case
pub fn infer_rule(
    problem: &ProblemMetadata,
    pairs: &[(&RawTestCase, &OracleSuggestion)],
) -> Option<MappingRule> {
    if pairs.is_empty() {
        return None;
    }
    let names = problem.parameter_map.params();

    MappingRule::ALL.into_iter().find(|rule| {
        pairs.iter().all(|(case, suggestion)| {
            let decoded = normalizer::decoded_input(&case.input_data, &problem.parameter_map);
            rule.apply(&decoded, names).as_deref() == Some(suggestion.formatted_inputs.as_slice())
        })
    })
}

/// Normalize every case of a problem, consulting the oracle when available
///
/// The oracle sees at most `sample_size` cases. Stored expected outputs stay
/// authoritative; the oracle's `expected_output` is only validated.
pub async fn normalize_cases(
    cases: &[RawTestCase],
    problem: &ProblemMetadata,
    oracle: Option<&dyn MappingOracle>,
    sample_size: usize,
) -> Vec<NormalizedTestCase> {
    let params = &problem.parameter_map;
    let heuristic = || {
        cases
            .iter()
            .map(|c| normalizer::normalize(c, params, problem))
            .collect::<Vec<_>>()
    };

    let Some(oracle) = oracle else {
        return heuristic();
    };
    if cases.is_empty() || sample_size == 0 || params.arity() == 0 {
        return heuristic();
    }

    let sample = &cases[..sample_size.min(cases.len())];
    let prompt = build_prompt(problem, sample);

    let suggestions = match oracle.complete(&prompt).await {
        Ok(text) => match parse_suggestions(&text, params.arity()) {
            Ok(suggestions) => suggestions,
            Err(e) => {
                warn!(error = %e, "Oracle mapping rejected, using heuristics");
                return heuristic();
            }
        },
        Err(e) => {
            warn!(error = %e, "Oracle unavailable, using heuristics");
            return heuristic();
        }
    };

    let pairs = pair_suggestions(sample, &suggestions);
    let rule = infer_rule(problem, &pairs);
    info!(
        sampled = sample.len(),
        suggestions = suggestions.len(),
        rule = rule.map(|r| r.name()).unwrap_or("none"),
        "Oracle mapping inferred"
    );

    cases
        .iter()
        .map(|case| {
            if let Some((_, suggestion)) = pairs.iter().find(|(c, _)| std::ptr::eq(*c, case)) {
                debug!(test_id = case.id, "Using oracle arguments for sampled case");
                return NormalizedTestCase {
                    id: case.id,
                    formatted_inputs: suggestion.formatted_inputs.clone(),
                    expected_output: normalizer::decode_expected(&case.expected_output),
                    parsing_reasoning: format!("oracle: {}", suggestion.parsing_reasoning),
                };
            }
            match rule {
                Some(rule) => normalizer::normalize_with_rule(case, params, problem, rule),
                None => normalizer::normalize(case, params, problem),
            }
        })
        .collect()
}

/// Chat-completions style HTTP oracle
pub struct ChatCompletionsOracle {
    client: reqwest::Client,
    url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    content: String,
}

impl ChatCompletionsOracle {
    pub fn new(config: &OracleConfig) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| OracleError::Request(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl MappingOracle for ChatCompletionsOracle {
    async fn complete(&self, prompt: &str) -> Result<String, OracleError> {
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut request = self.client.post(&self.url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| OracleError::Request(e.to_string()))?;
        if !response.status().is_success() {
            return Err(OracleError::Request(format!("HTTP {}", response.status())));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| OracleError::Malformed(e.to_string()))?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| OracleError::Malformed("no choices".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_common::types::ParameterMap;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct ScriptedOracle {
        reply: Result<String, String>,
        calls: AtomicUsize,
    }

    impl ScriptedOracle {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl MappingOracle for ScriptedOracle {
        async fn complete(&self, _prompt: &str) -> Result<String, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.reply.clone().map_err(OracleError::Request)
        }
    }

    fn two_sum_problem() -> ProblemMetadata {
        ProblemMetadata {
            title: "Two Sum".to_string(),
            function_name: Some("twoSum".to_string()),
            parameter_map: ParameterMap::new(["nums", "target", "output"]),
            ..Default::default()
        }
    }

    fn wrapped_cases() -> Vec<RawTestCase> {
        vec![
            RawTestCase { id: 1, input_data: json!([[[2, 7, 11, 15], 9]]), expected_output: json!([0, 1]) },
            RawTestCase { id: 2, input_data: json!([[[3, 2, 4], 6]]), expected_output: json!("[1,2]") },
            RawTestCase { id: 3, input_data: json!([[[3, 3], 6]]), expected_output: json!([0, 1]) },
        ]
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n[1]\n```"), "[1]");
        assert_eq!(strip_code_fences("```\n[1]\n```\n"), "[1]");
        assert_eq!(strip_code_fences("  [1]  "), "[1]");
    }

    #[test]
    fn test_parse_suggestions_valid() {
        let text = r#"```json
[{"id": 1, "formatted_inputs": [[2,7,11,15], 9], "expected_output": [0,1], "parsing_reasoning": "two args"}]
```"#;
        let suggestions = parse_suggestions(text, 2).unwrap();
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].id, Some(1));
        assert_eq!(suggestions[0].formatted_inputs, vec![json!([2, 7, 11, 15]), json!(9)]);
    }

    #[test]
    fn test_parse_suggestions_rejects_malformed() {
        assert!(parse_suggestions("not json", 2).is_err());
        assert!(parse_suggestions(r#"{"formatted_inputs": []}"#, 2).is_err());
        assert!(parse_suggestions(r#"[1, 2]"#, 2).is_err());
        assert!(parse_suggestions(r#"[{"formatted_inputs": null, "expected_output": 1}]"#, 2).is_err());
        assert!(parse_suggestions(r#"[{"formatted_inputs": [1, 2], "expected_output": null}]"#, 2).is_err());
        assert!(parse_suggestions(r#"[{"formatted_inputs": [1], "expected_output": 1}]"#, 2).is_err());
    }

    fn suggestion(id: Option<u32>, inputs: Vec<Value>) -> OracleSuggestion {
        OracleSuggestion {
            id,
            formatted_inputs: inputs,
            expected_output: json!([0, 1]),
            parsing_reasoning: String::new(),
        }
    }

    #[test]
    fn test_pairing_never_reuses_a_suggestion() {
        let cases = wrapped_cases();
        let sample = &cases[..2];

        // The only suggestion names case 2; case 1 must stay unpaired
        let suggestions = vec![suggestion(Some(2), vec![json!([3, 2, 4]), json!(6)])];
        let pairs = pair_suggestions(sample, &suggestions);
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].0.id, 2);

        // Suggestions without ids still pair by position
        let suggestions = vec![
            suggestion(None, vec![json!([2, 7, 11, 15]), json!(9)]),
            suggestion(None, vec![json!([3, 2, 4]), json!(6)]),
        ];
        let pairs = pair_suggestions(sample, &suggestions);
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].1.formatted_inputs[1], json!(6));

        // Ids win over position
        let suggestions = vec![
            suggestion(Some(2), vec![json!([3, 2, 4]), json!(6)]),
            suggestion(Some(1), vec![json!([2, 7, 11, 15]), json!(9)]),
        ];
        let pairs = pair_suggestions(sample, &suggestions);
        assert_eq!(pairs[0].1.id, Some(1));
        assert_eq!(pairs[1].1.id, Some(2));
    }

    #[test]
    fn test_prompt_mentions_parameters_and_arity() {
        let problem = two_sum_problem();
        let prompt = build_prompt(&problem, &wrapped_cases()[..1]);
        assert!(prompt.contains("Two Sum"));
        assert!(prompt.contains("nums, target"));
        assert!(prompt.contains("exactly 2 elements"));
    }

    #[tokio::test]
    async fn test_oracle_rule_is_replayed_on_remaining_cases() {
        let oracle = ScriptedOracle::replying(
            r#"[
                {"id": 1, "formatted_inputs": [[2,7,11,15], 9], "expected_output": [0,1], "parsing_reasoning": "unwrapped"},
                {"id": 2, "formatted_inputs": [[3,2,4], 6], "expected_output": [1,2], "parsing_reasoning": "unwrapped"}
            ]"#,
        );
        let problem = two_sum_problem();
        let cases = wrapped_cases();

        let normalized = normalize_cases(&cases, &problem, Some(&oracle), 2).await;

        assert_eq!(oracle.calls.load(Ordering::SeqCst), 1);
        assert_eq!(normalized.len(), 3);
        assert!(normalized[0].parsing_reasoning.starts_with("oracle"));
        assert_eq!(normalized[1].expected_output, json!([1, 2]));
        assert_eq!(normalized[2].formatted_inputs, vec![json!([3, 3]), json!(6)]);
        assert!(normalized[2].parsing_reasoning.contains("replayed inferred unwrap-single"));
    }

    #[tokio::test]
    async fn test_malformed_oracle_answer_falls_back_to_heuristics() {
        let oracle = ScriptedOracle::replying("Sure! Here are the mappings you asked for.");
        let problem = two_sum_problem();
        let cases = wrapped_cases();

        let normalized = normalize_cases(&cases, &problem, Some(&oracle), 2).await;

        assert_eq!(normalized.len(), 3);
        for case in &normalized {
            assert!(!case.parsing_reasoning.starts_with("oracle"));
            assert_eq!(case.formatted_inputs.len(), 2);
        }
        assert_eq!(normalized[2].formatted_inputs, vec![json!([3, 3]), json!(6)]);
    }

    #[tokio::test]
    async fn test_oracle_failure_falls_back_to_heuristics() {
        let oracle = ScriptedOracle {
            reply: Err("connection refused".to_string()),
            calls: AtomicUsize::new(0),
        };
        let problem = two_sum_problem();
        let normalized = normalize_cases(&wrapped_cases(), &problem, Some(&oracle), 3).await;
        assert_eq!(normalized.len(), 3);
        assert!(normalized.iter().all(|c| c.formatted_inputs.len() == 2));
    }

    #[tokio::test]
    async fn test_without_oracle_uses_heuristics() {
        let problem = two_sum_problem();
        let normalized = normalize_cases(&wrapped_cases(), &problem, None, 3).await;
        assert_eq!(normalized[0].formatted_inputs, vec![json!([2, 7, 11, 15]), json!(9)]);
    }

    #[test]
    fn test_infer_rule_requires_agreement_on_every_sample() {
        let problem = two_sum_problem();
        let cases = vec![
            RawTestCase { id: 1, input_data: json!([[1, 2], 3]), expected_output: json!(0) },
            RawTestCase { id: 2, input_data: json!([[[1, 2], 3]]), expected_output: json!(0) },
        ];
        let suggestion = OracleSuggestion {
            id: None,
            formatted_inputs: vec![json!([1, 2]), json!(3)],
            expected_output: json!(0),
            parsing_reasoning: String::new(),
        };
        let pairs = vec![(&cases[0], &suggestion), (&cases[1], &suggestion)];
        assert_eq!(infer_rule(&problem, &pairs), None);
        assert_eq!(infer_rule(&problem, &pairs[..1]), Some(MappingRule::Positional));
    }
}
