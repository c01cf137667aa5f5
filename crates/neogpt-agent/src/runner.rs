//! Agent Task Loop.

use crate::error::{AgentError, AgentResult};
use crate::executor::TaskExecutor;
use crate::session::{
    AgentAttempt, AgentSession, AttemptOutcome, ExecutionStatus, SessionStatus, TaskInput,
};
use neogpt_config::AgentConfig;
use neogpt_core::Usage;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(300);

/// Runs a task through an executor until it completes, the budget is spent
/// or the executor fails fatally.
#[derive(Clone)]
pub struct AgentLoop {
    executor: Arc<dyn TaskExecutor>,
    attempt_timeout: Duration,
}

impl AgentLoop {
    pub fn new(executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            executor,
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
        }
    }

    pub fn from_config(executor: Arc<dyn TaskExecutor>, config: &AgentConfig) -> Self {
        Self::new(executor).with_attempt_timeout(Duration::from_secs(config.attempt_timeout_seconds))
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        self.attempt_timeout
    }

    /// Validation errors are returned before the executor is called; every
    /// other outcome is a session in a terminal state.
    pub async fn run(&self, task: &str, max_tries: i64) -> AgentResult<AgentSession> {
        let task = task.trim();
        if task.is_empty() {
            return Err(AgentError::EmptyTask);
        }
        let budget = attempt_budget(max_tries).ok_or(AgentError::InvalidBudget(max_tries))?;

        let mut session = AgentSession::start(task);
        info!("Agent session {} started (max_tries = {})", session.id, budget);

        let mut prior_feedback = None;
        for attempt_number in 1..=budget {
            let input = TaskInput {
                task: task.to_string(),
                attempt_number,
                prior_feedback: prior_feedback.take(),
            };

            let attempt = self.attempt(input).await;
            debug!(
                "Attempt {}/{} finished in {:?}",
                attempt_number, budget, attempt.elapsed
            );

            let terminal = match &attempt.outcome {
                AttemptOutcome::Completed { .. } => Some(SessionStatus::Succeeded),
                AttemptOutcome::Fatal { message } => {
                    warn!("Attempt {} failed fatally: {}", attempt_number, message);
                    Some(SessionStatus::FatalError)
                }
                other => {
                    prior_feedback = other.feedback();
                    None
                }
            };
            session.attempts.push(attempt);

            if let Some(status) = terminal {
                info!("Agent session {} {}", session.id, status);
                return Ok(session.finish(status));
            }
        }

        info!("Agent session {} exhausted {} attempts", session.id, budget);
        Ok(session.finish(SessionStatus::Exhausted))
    }

    async fn attempt(&self, input: TaskInput) -> AgentAttempt {
        let started = Instant::now();
        let result = tokio::time::timeout(self.attempt_timeout, self.executor.execute(&input)).await;

        let (outcome, usage) = match result {
            Ok(Ok(output)) => {
                let outcome = match output.status {
                    ExecutionStatus::Completed => AttemptOutcome::Completed {
                        output: output.output,
                    },
                    ExecutionStatus::Incomplete => AttemptOutcome::Incomplete {
                        output: output.output,
                        feedback: output.feedback,
                    },
                };
                (outcome, output.usage)
            }
            Ok(Err(err)) if err.is_fatal() => (
                AttemptOutcome::Fatal {
                    message: err.to_string(),
                },
                Usage::default(),
            ),
            Ok(Err(err)) => {
                debug!("Attempt {} failed: {}", input.attempt_number, err);
                (
                    AttemptOutcome::Failed {
                        message: err.to_string(),
                    },
                    Usage::default(),
                )
            }
            Err(_) => {
                warn!(
                    "Attempt {} timed out after {:?}",
                    input.attempt_number, self.attempt_timeout
                );
                (
                    AttemptOutcome::TimedOut {
                        seconds: self.attempt_timeout.as_secs(),
                    },
                    Usage::default(),
                )
            }
        };

        AgentAttempt {
            attempt_number: input.attempt_number,
            task: input.task,
            prior_feedback: input.prior_feedback,
            outcome,
            usage,
            elapsed: started.elapsed(),
        }
    }
}

/// Positive budgets beyond `u32::MAX` are clamped; nothing runs that long.
fn attempt_budget(max_tries: i64) -> Option<u32> {
    (max_tries > 0).then(|| u32::try_from(max_tries).unwrap_or(u32::MAX))
}
