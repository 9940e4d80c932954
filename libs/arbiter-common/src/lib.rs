pub mod types;
pub mod redis;
pub mod config;

// Re-export commonly used types for convenience
pub use types::{
    Language, NormalizedTestCase, ParameterMap, ProblemMetadata, RawTestCase, Submission,
    SubmissionReport,
};
pub use config::{Config, Credential, JudgeConfig, OracleConfig};
