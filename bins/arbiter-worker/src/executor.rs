/// Submission Executor - High-Level Orchestration
///
/// **Responsibility:**
/// Run one submission end to end: normalize test cases, synthesize a program
/// per case, judge it, evaluate the output and aggregate the report.
///
/// **Execution model:**
/// - Test cases run strictly one after another
/// - Classification happens once per submission, rendering once per case
/// - A rate limit stops the run; partial results are returned with
///   `api_limit_reached` and `tests_not_executed`
/// - Any other judge failure becomes an `"Error"` result for that case only

use crate::engine::{JudgeBackend, JudgeError};
use crate::evaluator;
use crate::harness::Harness;
use crate::oracle::{self, MappingOracle};
use arbiter_common::types::{Submission, SubmissionReport};
use tracing::{debug, info, instrument, warn};

#[instrument(
    skip_all,
    fields(
        submission_id = %submission.id,
        language = %submission.language,
        test_cases = submission.test_cases.len()
    )
)]
pub async fn run_submission(
    submission: &Submission,
    backend: &dyn JudgeBackend,
    mapping_oracle: Option<&dyn MappingOracle>,
    oracle_sample_size: usize,
) -> SubmissionReport {
    let cases = oracle::normalize_cases(
        &submission.test_cases,
        &submission.problem,
        mapping_oracle,
        oracle_sample_size,
    )
    .await;

    let harness = Harness::prepare(&submission.source_code, &submission.problem, submission.language);
    let language_id = submission.language.judge_language_id();

    info!(
        entry_point = %harness.entry_point().name,
        language_id,
        "Executing {} test cases",
        cases.len()
    );

    let mut results = Vec::with_capacity(cases.len());
    let mut api_limit_reached = false;

    for case in &cases {
        let program = harness.render(&case.formatted_inputs);
        debug!(
            test_id = case.id,
            reasoning = %case.parsing_reasoning,
            notes = ?program.notes,
            program_bytes = program.source.len(),
            "Submitting test case"
        );

        match backend.execute(&program.source, language_id).await {
            Ok(result) => {
                let report = evaluator::evaluate_result(case, &result);
                debug!(test_id = case.id, status = %report.status, passed = report.passed, "Test judged");
                results.push(report);
            }
            Err(JudgeError::RateLimitExceeded { retry_after }) => {
                warn!(
                    test_id = case.id,
                    retry_after_secs = retry_after.map(|d| d.as_secs()),
                    executed = results.len(),
                    "Judge rate limit reached, stopping"
                );
                api_limit_reached = true;
                break;
            }
            Err(e) => {
                warn!(test_id = case.id, error = %e, "Test case could not be judged");
                results.push(evaluator::error_report(case, &e.to_string()));
            }
        }
    }

    let report = evaluator::aggregate_results(submission.id, cases.len(), results, api_limit_reached);

    info!(
        status = ?report.overall_status,
        passed = report.passed_tests,
        total = report.total_tests,
        success_rate = report.success_rate,
        "Submission judged"
    );

    report
}
