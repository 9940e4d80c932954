// CLI commands for exercising the judging pipeline locally
use anyhow::{bail, Context, Result};
use arbiter_common::config::Config;
use arbiter_common::types::{
    Language, ProblemMetadata, RawTestCase, Submission, SubmissionReport,
};
use arbiter_worker::engine::Judge0Engine;
use arbiter_worker::evaluator;
use arbiter_worker::harness::Harness;
use arbiter_worker::literal;
use arbiter_worker::oracle::{self, ChatCompletionsOracle, MappingOracle};
use serde::Deserialize;
use serde_json::Value;
use std::fs;
use std::path::Path;
use uuid::Uuid;

/// Problem file: metadata plus stored test cases
#[derive(Debug, Deserialize)]
pub struct ProblemFile {
    pub problem: ProblemMetadata,
    pub test_cases: Vec<RawTestCase>,
}

pub fn load_problem_file(path: &Path) -> Result<ProblemFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let mut file: ProblemFile = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    for (idx, case) in file.test_cases.iter_mut().enumerate() {
        if case.id == 0 {
            case.id = (idx + 1) as u32;
        }
    }
    if file.test_cases.is_empty() {
        bail!("{} contains no test cases", path.display());
    }
    Ok(file)
}

fn load_source(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

fn parse_language(name: &str) -> Result<Language> {
    match Language::from_str(name) {
        Some(language) => Ok(language),
        None => bail!(
            "Unknown language '{}'. Valid options: {}",
            name,
            Language::all_variants()
                .iter()
                .map(|l| l.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        ),
    }
}

fn oracle_from_env(config: &Config) -> Result<Option<ChatCompletionsOracle>> {
    match &config.oracle {
        Some(oracle_config) => Ok(Some(ChatCompletionsOracle::new(oracle_config)?)),
        None => Ok(None),
    }
}

/// Show how every stored case maps onto the entry point's arguments
pub async fn normalize(problem_path: &Path, use_oracle: bool) -> Result<()> {
    let file = load_problem_file(problem_path)?;
    let config = Config::from_env();

    let oracle = if use_oracle { oracle_from_env(&config)? } else { None };
    if use_oracle && oracle.is_none() {
        println!("⚠️  ORACLE_URL is not set - using heuristics only\n");
    }
    let sample_size = config.oracle.as_ref().map(|o| o.sample_size).unwrap_or(0);

    let cases = oracle::normalize_cases(
        &file.test_cases,
        &file.problem,
        oracle.as_ref().map(|o| o as &dyn MappingOracle),
        sample_size,
    )
    .await;

    println!(
        "📋 {} ({} parameter(s): {})\n",
        file.problem.title,
        file.problem.parameter_map.arity(),
        file.problem.parameter_map.params().join(", ")
    );
    for case in &cases {
        println!("Test {}", case.id);
        println!("  inputs:    {}", Value::Array(case.formatted_inputs.clone()));
        println!("  expected:  {}", case.expected_output);
        println!("  reasoning: {}", case.parsing_reasoning);
    }
    println!("\n✅ Normalized {} test case(s)", cases.len());
    Ok(())
}

/// Print the program that would be submitted for one test case
pub async fn harness(
    problem_path: &Path,
    source_path: &Path,
    language: &str,
    case_id: Option<u32>,
) -> Result<()> {
    let file = load_problem_file(problem_path)?;
    let source = load_source(source_path)?;
    let language = parse_language(language)?;

    let cases = oracle::normalize_cases(&file.test_cases, &file.problem, None, 0).await;
    let case = match case_id {
        Some(id) => cases
            .iter()
            .find(|c| c.id == id)
            .with_context(|| format!("No test case with id {}", id))?,
        None => &cases[0],
    };

    let harness = Harness::prepare(&source, &file.problem, language);
    let program = harness.render(&case.formatted_inputs);

    eprintln!("# entry point: {}", program.entry_point);
    eprintln!("# structures:  {:?}", harness.requirement().param_kinds);
    for note in &program.notes {
        eprintln!("# note: {}", note);
    }
    println!("{}", program.source);
    Ok(())
}

/// Judge a solution against the remote judge and print the report
pub async fn run(
    problem_path: &Path,
    source_path: &Path,
    language: &str,
    json_output: bool,
) -> Result<()> {
    let file = load_problem_file(problem_path)?;
    let source = load_source(source_path)?;
    let language = parse_language(language)?;

    let config = Config::from_env();
    let engine = Judge0Engine::new(&config.judge)
        .context("Judge client unavailable - set JUDGE_API_KEYS")?;
    let oracle = oracle_from_env(&config)?;
    let sample_size = config.oracle.as_ref().map(|o| o.sample_size).unwrap_or(0);

    let submission = Submission {
        id: Uuid::new_v4(),
        language,
        source_code: source,
        problem: file.problem,
        test_cases: file.test_cases,
        submitted_at: chrono::Utc::now(),
    };

    if !json_output {
        println!(
            "🚀 Judging {} ({}) against {} test case(s)...\n",
            submission.problem.title,
            submission.language,
            submission.test_cases.len()
        );
    }

    let report = arbiter_worker::executor::run_submission(
        &submission,
        &engine,
        oracle.as_ref().map(|o| o as &dyn MappingOracle),
        sample_size,
    )
    .await;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", format_report(&report));
    }
    Ok(())
}

/// Compare two values with the equivalence cascade
pub fn compare(actual: &str, expected: &str) -> Result<()> {
    let actual_value = evaluator::parse_actual_output(actual);
    let expected_value =
        literal::parse_lenient(expected).unwrap_or_else(|| Value::String(expected.to_string()));

    let verdict = evaluator::compare(&actual_value, &expected_value);
    println!("actual:   {}", actual_value);
    println!("expected: {}", expected_value);
    match verdict.strategy {
        Some(strategy) => println!("✅ equivalent ({})", strategy.name()),
        None => println!("❌ not equivalent"),
    }
    Ok(())
}

/// Human-readable report table
pub fn format_report(report: &SubmissionReport) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<6} {:<22} {:<10} {:<10}\n",
        "TEST", "STATUS", "TIME (s)", "MEMORY"
    ));
    out.push_str(&format!("{}\n", "─".repeat(52)));

    for (idx, result) in report.test_results.iter().enumerate() {
        let mark = if result.passed { "✅" } else { "❌" };
        out.push_str(&format!(
            "{:<6} {} {:<19} {:<10} {:<10}\n",
            idx + 1,
            mark,
            result.status,
            result
                .execution_time
                .map(|t| format!("{:.3}", t))
                .unwrap_or_else(|| "-".to_string()),
            result
                .memory_used
                .map(|m| format!("{} KB", m))
                .unwrap_or_else(|| "-".to_string()),
        ));
        if !result.passed {
            out.push_str(&format!("       expected: {}\n", result.expected_output));
            out.push_str(&format!("       actual:   {}\n", result.actual_output));
            if let Some(error) = &result.error {
                let first_line = error.lines().next().unwrap_or_default();
                out.push_str(&format!("       error:    {}\n", first_line));
            }
        }
    }

    out.push_str(&format!(
        "\n📊 {}/{} passed ({:.2}%) - {:?}\n",
        report.passed_tests, report.total_tests, report.success_rate, report.overall_status
    ));
    if report.api_limit_reached == Some(true) {
        out.push_str(&format!(
            "⚠️  Judge rate limit reached: {} test(s) not executed\n",
            report.tests_not_executed.unwrap_or(0)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbiter_common::types::{OverallStatus, TestCaseReport};
    use serde_json::json;

    fn write_temp(name: &str, content: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("arbiter-cli-{}-{}", Uuid::new_v4(), name));
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_load_problem_file_numbers_cases() {
        let path = write_temp(
            "problem.json",
            r#"{
                "problem": { "title": "Two Sum", "parameter_map": ["nums", "target", "output"] },
                "test_cases": [
                    { "input_data": "nums = [2,7,11,15], target = 9", "expected_output": "[0,1]" },
                    { "id": 9, "input_data": [[3, 3], 6], "expected_output": [0, 1] }
                ]
            }"#,
        );
        let file = load_problem_file(&path).unwrap();
        assert_eq!(file.problem.title, "Two Sum");
        assert_eq!(file.test_cases[0].id, 1);
        assert_eq!(file.test_cases[1].id, 9);
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_load_problem_file_rejects_empty() {
        let path = write_temp(
            "empty.json",
            r#"{ "problem": { "title": "x", "parameter_map": [] }, "test_cases": [] }"#,
        );
        assert!(load_problem_file(&path).is_err());
        fs::remove_file(path).ok();
    }

    #[test]
    fn test_parse_language() {
        assert_eq!(parse_language("Python").unwrap(), Language::Python);
        let err = parse_language("cobol").unwrap_err().to_string();
        assert!(err.contains("python, javascript"));
    }

    #[test]
    fn test_format_report() {
        let report = SubmissionReport {
            submission_id: Uuid::new_v4(),
            success_rate: 40.0,
            total_tests: 5,
            passed_tests: 2,
            failed_tests: 0,
            test_results: vec![
                TestCaseReport {
                    input: json!([[2, 7], 9]),
                    expected_output: json!([0, 1]),
                    actual_output: json!([0, 1]),
                    passed: true,
                    execution_time: Some(0.012),
                    memory_used: Some(3200),
                    status: "Accepted".to_string(),
                    error: None,
                },
                TestCaseReport {
                    input: json!([[3, 3], 6]),
                    expected_output: json!([0, 1]),
                    actual_output: json!([1, 0]),
                    passed: false,
                    execution_time: None,
                    memory_used: None,
                    status: "Wrong Answer".to_string(),
                    error: None,
                },
            ],
            overall_status: OverallStatus::Incomplete,
            api_limit_reached: Some(true),
            tests_not_executed: Some(3),
        };

        let text = format_report(&report);
        assert!(text.contains("0.012"));
        assert!(text.contains("3200 KB"));
        assert!(text.contains("actual:   [1,0]"));
        assert!(text.contains("2/5 passed (40.00%)"));
        assert!(text.contains("3 test(s) not executed"));
    }
}
