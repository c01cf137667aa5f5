//! NeoGPT Agent - bounded-retry task sessions over a pluggable executor.

mod developer;
mod error;
mod executor;
mod runner;
mod session;

pub use developer::{parse_review, DeveloperReviewerExecutor, Review};
pub use error::{AgentError, AgentResult, ExecutorError};
pub use executor::TaskExecutor;
pub use runner::{AgentLoop, DEFAULT_ATTEMPT_TIMEOUT};
pub use session::{
    AgentAttempt, AgentSession, AttemptOutcome, ExecutionStatus, ExecutorOutput, SessionStatus,
    TaskInput,
};
