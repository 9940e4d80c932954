use crate::types::{OverallStatus, Submission, SubmissionReport};
use redis::{AsyncCommands, RedisResult};

/// Redis queue semantics - defines only semantics, not runtime logic
/// Keeps API and worker agreeing on key names

pub const QUEUE_NAME: &str = "arbiter:queue:submissions";
pub const RESULT_PREFIX: &str = "arbiter:result";
pub const STATUS_PREFIX: &str = "arbiter:status";

/// Reports expire after 24 hours
pub const RESULT_TTL_SECONDS: u64 = 86400;

/// Generate result key for a submission
pub fn result_key(submission_id: &uuid::Uuid) -> String {
    format!("{}:{}", RESULT_PREFIX, submission_id)
}

/// Generate status key for a submission
pub fn status_key(submission_id: &uuid::Uuid) -> String {
    format!("{}:{}", STATUS_PREFIX, submission_id)
}

fn encode_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, "serialization error", e.to_string()))
}

fn decode_error(e: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((redis::ErrorKind::TypeError, "deserialization error", e.to_string()))
}

/// Push a submission onto the queue
/// Uses RPUSH for FIFO semantics
pub async fn push_submission(
    conn: &mut redis::aio::ConnectionManager,
    submission: &Submission,
) -> RedisResult<()> {
    let payload = serde_json::to_string(submission).map_err(encode_error)?;
    conn.rpush(QUEUE_NAME, payload).await
}

/// Pop a submission from the queue
/// Uses BLPOP with timeout for graceful shutdown
pub async fn pop_submission(
    conn: &mut redis::aio::ConnectionManager,
    timeout_seconds: f64,
) -> RedisResult<Option<Submission>> {
    let result: Option<(String, String)> = conn.blpop(QUEUE_NAME, timeout_seconds).await?;

    match result {
        Some((_key, payload)) => {
            let submission: Submission = serde_json::from_str(&payload).map_err(decode_error)?;
            Ok(Some(submission))
        }
        None => Ok(None),
    }
}

/// Current number of queued submissions
pub async fn queue_depth(conn: &mut redis::aio::ConnectionManager) -> RedisResult<i64> {
    conn.llen(QUEUE_NAME).await
}

/// Store a submission report with a 24-hour TTL
pub async fn store_report(
    conn: &mut redis::aio::ConnectionManager,
    report: &SubmissionReport,
) -> RedisResult<()> {
    let key = result_key(&report.submission_id);
    let payload = serde_json::to_string(report).map_err(encode_error)?;
    let _: () = conn.set_ex(&key, payload, RESULT_TTL_SECONDS).await?;

    // Status is stored separately for quick lookup
    let status = serde_json::to_string(&report.overall_status).map_err(encode_error)?;
    let _: () = conn
        .set_ex(status_key(&report.submission_id), status, RESULT_TTL_SECONDS)
        .await?;

    Ok(())
}

/// Retrieve a submission report
pub async fn get_report(
    conn: &mut redis::aio::ConnectionManager,
    submission_id: &uuid::Uuid,
) -> RedisResult<Option<SubmissionReport>> {
    let payload: Option<String> = conn.get(result_key(submission_id)).await?;

    match payload {
        Some(data) => {
            let report: SubmissionReport = serde_json::from_str(&data).map_err(decode_error)?;
            Ok(Some(report))
        }
        None => Ok(None),
    }
}

/// Retrieve only the overall status of a judged submission
pub async fn get_status(
    conn: &mut redis::aio::ConnectionManager,
    submission_id: &uuid::Uuid,
) -> RedisResult<Option<OverallStatus>> {
    let payload: Option<String> = conn.get(status_key(submission_id)).await?;

    match payload {
        Some(data) => {
            let status: OverallStatus = serde_json::from_str(&data).map_err(decode_error)?;
            Ok(Some(status))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_result_key_deterministic() {
        let id = Uuid::new_v4();
        let key1 = result_key(&id);
        let key2 = result_key(&id);
        assert_eq!(key1, key2);
        assert!(key1.starts_with("arbiter:result:"));
    }

    #[test]
    fn test_status_key_format() {
        let id = Uuid::new_v4();
        let key = status_key(&id);
        assert!(key.starts_with("arbiter:status:"));
        assert!(key.contains(&id.to_string()));
    }

    /// Requires a running Redis instance
    #[tokio::test]
    #[ignore]
    async fn test_queue_and_report_round_trip() {
        use crate::types::{Language, OverallStatus, ProblemMetadata};

        let client = redis::Client::open("redis://127.0.0.1:6379").unwrap();
        let mut conn = redis::aio::ConnectionManager::new(client).await.unwrap();

        let submission = Submission {
            id: Uuid::new_v4(),
            language: Language::Python,
            source_code: "print(1)".to_string(),
            problem: ProblemMetadata::default(),
            test_cases: Vec::new(),
            submitted_at: chrono::Utc::now(),
        };
        push_submission(&mut conn, &submission).await.unwrap();
        let popped = pop_submission(&mut conn, 1.0).await.unwrap().unwrap();
        assert_eq!(popped.id, submission.id);

        let report = SubmissionReport {
            submission_id: submission.id,
            success_rate: 100.0,
            total_tests: 0,
            passed_tests: 0,
            failed_tests: 0,
            test_results: Vec::new(),
            overall_status: OverallStatus::Passed,
            api_limit_reached: None,
            tests_not_executed: None,
        };
        store_report(&mut conn, &report).await.unwrap();
        assert_eq!(get_report(&mut conn, &submission.id).await.unwrap(), Some(report));
        assert_eq!(
            get_status(&mut conn, &submission.id).await.unwrap(),
            Some(OverallStatus::Passed)
        );
    }
}
