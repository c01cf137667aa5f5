//! The executor seam the loop drives.

use crate::error::ExecutorError;
use crate::session::{ExecutorOutput, TaskInput};
use async_trait::async_trait;

/// Performs one attempt at a task.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, input: &TaskInput) -> Result<ExecutorOutput, ExecutorError>;
}
