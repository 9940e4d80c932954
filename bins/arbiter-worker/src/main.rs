use anyhow::Context;
use arbiter_common::config::Config;
use arbiter_common::redis;
use arbiter_worker::engine::Judge0Engine;
use arbiter_worker::executor;
use arbiter_worker::oracle::{ChatCompletionsOracle, MappingOracle};
use tokio::signal;
use tracing::{debug, error, info, instrument, warn};

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    // LOG_FORMAT=json for log shippers, human-readable otherwise
    if std::env::var("LOG_FORMAT").map(|f| f == "json").unwrap_or(false) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_thread_ids(true)
            .with_line_number(true)
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    info!("Arbiter worker booting...");

    let config = Config::from_env();

    let engine = Judge0Engine::new(&config.judge)
        .context("failed to initialize judge client (is JUDGE_API_KEYS set?)")?;

    let oracle = match &config.oracle {
        Some(oracle_config) => {
            info!(url = %oracle_config.url, model = %oracle_config.model, "Mapping oracle enabled");
            Some(ChatCompletionsOracle::new(oracle_config)?)
        }
        None => {
            info!("Mapping oracle disabled (ORACLE_URL unset)");
            None
        }
    };
    let sample_size = config.oracle.as_ref().map(|o| o.sample_size).unwrap_or(0);

    let client = ::redis::Client::open(config.redis_url.as_str())?;
    let mut redis_conn = ::redis::aio::ConnectionManager::new(client)
        .await
        .with_context(|| format!("failed to connect to Redis at {}", config.redis_url))?;

    info!("Connected to Redis: {}", config.redis_url);
    info!("Queue: {}", redis::QUEUE_NAME);

    // Setup graceful shutdown
    let shutdown = async {
        signal::ctrl_c().await.expect("failed to install CTRL+C signal handler");
        warn!("Received shutdown signal, finishing up...");
    };

    let oracle_ref = oracle.as_ref().map(|o| o as &dyn MappingOracle);

    tokio::select! {
        result = worker_loop(&mut redis_conn, &engine, oracle_ref, sample_size) => {
            if let Err(e) = result {
                error!(error = %e, "Worker loop exited");
            }
        },
        _ = shutdown => {},
    }

    info!("Worker shutdown complete");
    Ok(())
}

#[instrument(skip_all)]
async fn worker_loop(
    redis_conn: &mut ::redis::aio::ConnectionManager,
    engine: &Judge0Engine,
    oracle: Option<&dyn MappingOracle>,
    sample_size: usize,
) -> anyhow::Result<()> {
    loop {
        // BLPOP with 5 second timeout for graceful shutdown
        match redis::pop_submission(redis_conn, 5.0).await {
            Ok(Some(submission)) => {
                let submission_id = submission.id;
                info!(
                    submission_id = %submission_id,
                    language = %submission.language,
                    problem = %submission.problem.title,
                    test_cases = submission.test_cases.len(),
                    source_size = submission.source_code.len(),
                    "Received submission"
                );

                let start = std::time::Instant::now();
                let report = executor::run_submission(&submission, engine, oracle, sample_size).await;

                info!(
                    submission_id = %submission_id,
                    status = ?report.overall_status,
                    passed = report.passed_tests,
                    total = report.total_tests,
                    execution_ms = start.elapsed().as_millis() as u64,
                    "Execution completed"
                );

                for (idx, result) in report.test_results.iter().enumerate() {
                    debug!(
                        submission_id = %submission_id,
                        test_num = idx + 1,
                        status = %result.status,
                        passed = result.passed,
                        "Test result"
                    );
                }

                // Persist report to Redis
                match redis::store_report(redis_conn, &report).await {
                    Ok(_) => {
                        info!(submission_id = %submission_id, "Report persisted to Redis");
                    }
                    Err(e) => {
                        error!(submission_id = %submission_id, error = %e, "Failed to persist report");
                        // Non-fatal - worker continues
                    }
                }
            }
            Ok(None) => {
                // Timeout - check for shutdown
                continue;
            }
            Err(e) => {
                error!(error = %e, "Redis error");
                tokio::time::sleep(tokio::time::Duration::from_secs(1)).await;
            }
        }
    }
}
