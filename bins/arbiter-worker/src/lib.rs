pub mod engine;
pub mod evaluator;
pub mod executor;
pub mod harness;
pub mod literal;
pub mod normalizer;
pub mod oracle;


pub use engine::{Judge0Engine, JudgeBackend, JudgeError, JudgeResult};
pub use evaluator::{compare, equivalent, ComparisonVerdict, MatchStrategy};
pub use executor::run_submission;
pub use harness::{synthesize, Harness, SynthesizedProgram};
pub use oracle::{ChatCompletionsOracle, MappingOracle};
