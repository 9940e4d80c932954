// HTTP route handlers for the Arbiter API

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use arbiter_common::redis;
use arbiter_common::types::{Language, ProblemMetadata, RawTestCase, Submission};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::metrics;
use crate::AppState;

/// Safety limit to keep pathological sources away from the judge
pub const MAX_SOURCE_CODE_BYTES: usize = 1024 * 1024; // 1MB

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    /// Free-form language name; unknown names fall back to Python
    pub language: String,
    pub source_code: String,
    #[serde(default)]
    pub problem: ProblemMetadata,
    pub test_cases: Vec<RawTestCase>,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub job_id: String,
}

/// Why a submission was refused before queuing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptySource,
    SourceTooLarge,
    EmptyTestCases,
}

impl Rejection {
    /// Metric label
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::EmptySource => "empty_source",
            Rejection::SourceTooLarge => "source_too_large",
            Rejection::EmptyTestCases => "empty_test_cases",
        }
    }

    pub fn message(&self) -> String {
        match self {
            Rejection::EmptySource => "source_code must not be empty".to_string(),
            Rejection::SourceTooLarge => format!(
                "source_code exceeds the {} byte limit",
                MAX_SOURCE_CODE_BYTES
            ),
            Rejection::EmptyTestCases => "at least one test case is required".to_string(),
        }
    }
}

pub fn validate_submission(request: &SubmitRequest) -> Result<(), Rejection> {
    if request.source_code.trim().is_empty() {
        return Err(Rejection::EmptySource);
    }
    if request.source_code.len() > MAX_SOURCE_CODE_BYTES {
        return Err(Rejection::SourceTooLarge);
    }
    if request.test_cases.is_empty() {
        return Err(Rejection::EmptyTestCases);
    }
    Ok(())
}

/// Resolve a free-form language name, defaulting to Python
pub fn resolve_language(name: &str) -> Language {
    Language::from_str(name).unwrap_or_else(|| {
        warn!(language = %name, "Unrecognized language, defaulting to python");
        Language::Python
    })
}

/// Build the queue payload; test cases without ids are numbered from 1
pub fn build_submission(request: SubmitRequest) -> Submission {
    let test_cases = request
        .test_cases
        .into_iter()
        .enumerate()
        .map(|(idx, mut tc)| {
            if tc.id == 0 {
                tc.id = (idx + 1) as u32;
            }
            tc
        })
        .collect();

    Submission {
        id: Uuid::new_v4(),
        language: resolve_language(&request.language),
        source_code: request.source_code,
        problem: request.problem,
        test_cases,
        submitted_at: chrono::Utc::now(),
    }
}

fn error_body(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(serde_json::json!({ "error": message.into() }))).into_response()
}

/// POST /execute - Queue a submission for judging
pub async fn submit_job(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubmitRequest>,
) -> Response {
    if let Err(rejection) = validate_submission(&payload) {
        warn!(reason = rejection.reason(), "Submission rejected");
        metrics::record_submission_rejected(rejection.reason());
        metrics::record_request("/execute", "POST", 400);
        return error_body(StatusCode::BAD_REQUEST, rejection.message());
    }

    let submission = build_submission(payload);
    let job_id = submission.id;

    let mut conn = state.redis.clone();
    match redis::push_submission(&mut conn, &submission).await {
        Ok(_) => {
            info!(
                job_id = %job_id,
                language = %submission.language,
                problem = %submission.problem.title,
                test_cases = submission.test_cases.len(),
                "Submission queued"
            );
            metrics::record_submission_queued(&submission.language.to_string());
            metrics::record_request("/execute", "POST", 201);

            (
                StatusCode::CREATED,
                Json(SubmitResponse {
                    job_id: job_id.to_string(),
                }),
            )
                .into_response()
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to queue submission");
            metrics::record_request("/execute", "POST", 500);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to queue submission: {}", e),
            )
        }
    }
}

/// GET /health - Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// GET /metrics - Prometheus text exposition
pub async fn metrics_handler(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut conn = state.redis.clone();
    metrics::update_queue_depth(&mut conn).await;
    (
        StatusCode::OK,
        [("content-type", "text/plain; version=0.0.4")],
        metrics::render_metrics(),
    )
}

/// GET /job/{job_id} - Query the submission report
pub async fn get_job_result(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let Ok(job_uuid) = Uuid::parse_str(&job_id) else {
        metrics::record_request("/job", "GET", 400);
        return error_body(StatusCode::BAD_REQUEST, "Invalid job ID format");
    };

    let mut conn = state.redis.clone();
    match redis::get_report(&mut conn, &job_uuid).await {
        Ok(Some(report)) => {
            info!(job_id = %job_id, status = ?report.overall_status, "Report retrieved");
            let status = serde_json::to_value(report.overall_status)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            metrics::record_report_served(&status);
            metrics::record_request("/job", "GET", 200);
            (StatusCode::OK, Json(report)).into_response()
        }
        Ok(None) => {
            info!(job_id = %job_id, "Submission still pending");
            metrics::record_request("/job", "GET", 202);
            (
                StatusCode::ACCEPTED,
                Json(serde_json::json!({
                    "job_id": job_id,
                    "status": "pending",
                    "message": "Submission is queued or still being judged"
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to fetch report");
            metrics::record_request("/job", "GET", 500);
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to query submission status: {}", e),
            )
        }
    }
}

/// GET /job/{job_id}/status - Overall status only
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Response {
    let Ok(job_uuid) = Uuid::parse_str(&job_id) else {
        return error_body(StatusCode::BAD_REQUEST, "Invalid job ID format");
    };

    let mut conn = state.redis.clone();
    match redis::get_status(&mut conn, &job_uuid).await {
        Ok(Some(status)) => (
            StatusCode::OK,
            Json(serde_json::json!({ "job_id": job_id, "status": status })),
        )
            .into_response(),
        Ok(None) => (
            StatusCode::ACCEPTED,
            Json(serde_json::json!({ "job_id": job_id, "status": "pending" })),
        )
            .into_response(),
        Err(e) => {
            error!(job_id = %job_id, error = %e, "Failed to fetch status");
            error_body(
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Failed to query submission status: {}", e),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request(body: serde_json::Value) -> SubmitRequest {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_validation_rejections() {
        let empty_tests = request(json!({
            "language": "python",
            "source_code": "print(1)",
            "test_cases": []
        }));
        assert_eq!(validate_submission(&empty_tests), Err(Rejection::EmptyTestCases));

        let empty_source = request(json!({
            "language": "python",
            "source_code": "   \n",
            "test_cases": [{ "input_data": "1" }]
        }));
        assert_eq!(validate_submission(&empty_source), Err(Rejection::EmptySource));

        let huge = request(json!({
            "language": "python",
            "source_code": "x".repeat(MAX_SOURCE_CODE_BYTES + 1),
            "test_cases": [{ "input_data": "1" }]
        }));
        assert_eq!(validate_submission(&huge), Err(Rejection::SourceTooLarge));
    }

    #[test]
    fn test_build_submission() {
        let req = request(json!({
            "language": "C++",
            "source_code": "int main() {}",
            "problem": {
                "title": "Two Sum",
                "parameter_map": ["nums", "target", "output"]
            },
            "test_cases": [
                { "input_data": "[[2,7,11,15],9]", "expected_output": "[0,1]" },
                { "id": 7, "input_data": "[[3,3],6]", "expected_output": "[0,1]" }
            ]
        }));
        assert!(validate_submission(&req).is_ok());

        let submission = build_submission(req);
        assert_eq!(submission.language, Language::Cpp);
        assert_eq!(submission.problem.parameter_map.arity(), 2);
        assert_eq!(submission.test_cases[0].id, 1);
        assert_eq!(submission.test_cases[1].id, 7);
    }

    #[test]
    fn test_unknown_language_defaults_to_python() {
        assert_eq!(resolve_language("brainfuck"), Language::Python);
        assert_eq!(resolve_language("js"), Language::JavaScript);
    }
}
