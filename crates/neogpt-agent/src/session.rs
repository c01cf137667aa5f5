//! Attempt and session records.

use chrono::{DateTime, Utc};
use neogpt_core::{new_id, SessionId, Usage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Session lifecycle. A returned session is always in a terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Pending,
    Running,
    Succeeded,
    Exhausted,
    FatalError,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Pending => "pending",
            SessionStatus::Running => "running",
            SessionStatus::Succeeded => "succeeded",
            SessionStatus::Exhausted => "exhausted",
            SessionStatus::FatalError => "fatal_error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Succeeded | SessionStatus::Exhausted | SessionStatus::FatalError
        )
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What the executor is asked to do on one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskInput {
    pub task: String,
    /// 1-based.
    pub attempt_number: u32,
    /// Feedback from the previous attempt, if there was one.
    pub prior_feedback: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Completed,
    Incomplete,
}

/// A successful executor call; `Incomplete` still consumes budget.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorOutput {
    pub status: ExecutionStatus,
    pub output: String,
    pub feedback: Option<String>,
    pub usage: Usage,
}

impl ExecutorOutput {
    pub fn completed(output: impl Into<String>, usage: Usage) -> Self {
        Self {
            status: ExecutionStatus::Completed,
            output: output.into(),
            feedback: None,
            usage,
        }
    }

    pub fn incomplete(output: impl Into<String>, feedback: impl Into<String>, usage: Usage) -> Self {
        Self {
            status: ExecutionStatus::Incomplete,
            output: output.into(),
            feedback: Some(feedback.into()),
            usage,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AttemptOutcome {
    Completed { output: String },
    Incomplete { output: String, feedback: Option<String> },
    Failed { message: String },
    TimedOut { seconds: u64 },
    Fatal { message: String },
}

impl AttemptOutcome {
    /// Text handed to the next attempt as `prior_feedback`.
    pub fn feedback(&self) -> Option<String> {
        match self {
            AttemptOutcome::Incomplete { feedback, .. } => feedback.clone(),
            AttemptOutcome::Failed { message } => Some(format!("Previous attempt failed: {}", message)),
            AttemptOutcome::TimedOut { seconds } => {
                Some(format!("Previous attempt timed out after {} seconds", seconds))
            }
            AttemptOutcome::Completed { .. } | AttemptOutcome::Fatal { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentAttempt {
    pub attempt_number: u32,
    pub task: String,
    pub prior_feedback: Option<String>,
    pub outcome: AttemptOutcome,
    pub usage: Usage,
    pub elapsed: Duration,
}

/// One bounded-retry run of a task. Owns its attempts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSession {
    pub id: SessionId,
    pub task: String,
    pub attempts: Vec<AgentAttempt>,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl AgentSession {
    pub(crate) fn start(task: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            task: task.into(),
            attempts: Vec::new(),
            status: SessionStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    pub(crate) fn finish(mut self, status: SessionStatus) -> Self {
        self.status = status;
        self.finished_at = Some(Utc::now());
        self
    }

    /// Output of the completing attempt.
    pub fn final_output(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            AttemptOutcome::Completed { output } => Some(output.as_str()),
            _ => None,
        })
    }

    /// Last draft produced, completed or not.
    pub fn last_output(&self) -> Option<&str> {
        self.attempts.iter().rev().find_map(|a| match &a.outcome {
            AttemptOutcome::Completed { output } | AttemptOutcome::Incomplete { output, .. } => {
                Some(output.as_str())
            }
            _ => None,
        })
    }

    pub fn usage(&self) -> Usage {
        let mut total = Usage::default();
        for attempt in &self.attempts {
            total += attempt.usage;
        }
        total
    }
}
