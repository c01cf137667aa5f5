//! Developer/reviewer executor: one model call drafts a solution, a second
//! call reviews it.

use crate::error::ExecutorError;
use crate::executor::TaskExecutor;
use crate::session::{ExecutorOutput, TaskInput};
use async_trait::async_trait;
use neogpt_core::{LanguageModel, Usage};
use neogpt_retrieve::{RetrievalOptions, RetrievalRequest, Selector};
use std::sync::Arc;
use tracing::debug;

const DEVELOPER_SYSTEM: &str = "You are a senior software engineer. Solve the task you are given \
completely and precisely. Return the full solution, including code where it is needed.";

const REVIEWER_SYSTEM: &str = "You are a meticulous QA engineer reviewing a colleague's work. \
Start your reply with APPROVED if the solution fully solves the task. Otherwise start with \
REJECTED: followed by the concrete changes that are required.";

/// Parsed reviewer verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Review {
    Approved,
    Rejected(String),
}

/// Reads the verdict from the start of the reply, ignoring markdown emphasis.
pub fn parse_review(reply: &str) -> Result<Review, ExecutorError> {
    let text = reply.trim_start_matches(|c: char| c.is_whitespace() || c == '*' || c == '#' || c == '_');
    let upper = text.get(..8).map(str::to_ascii_uppercase).unwrap_or_default();

    match upper.as_str() {
        "APPROVED" => Ok(Review::Approved),
        "REJECTED" => {
            let notes = text[8..]
                .trim_start_matches(|c: char| c == '*' || c == '_')
                .trim_start()
                .trim_start_matches(':')
                .trim();
            Ok(Review::Rejected(if notes.is_empty() {
                "The reviewer rejected the solution without comments.".to_string()
            } else {
                notes.to_string()
            }))
        }
        _ => Err(ExecutorError::Recoverable(
            "reviewer reply did not start with APPROVED or REJECTED:".to_string(),
        )),
    }
}

struct ContextSource {
    selector: Selector,
    strategy: String,
    options: RetrievalOptions,
}

pub struct DeveloperReviewerExecutor {
    model: Arc<dyn LanguageModel>,
    context: Option<ContextSource>,
}

impl DeveloperReviewerExecutor {
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self {
            model,
            context: None,
        }
    }

    /// Retrieve context for the task with `strategy` before drafting.
    pub fn with_context(
        mut self,
        selector: Selector,
        strategy: impl Into<String>,
        options: RetrievalOptions,
    ) -> Self {
        self.context = Some(ContextSource {
            selector,
            strategy: strategy.into(),
            options,
        });
        self
    }

    async fn gather_context(&self, task: &str, usage: &mut Usage) -> Result<Option<String>, ExecutorError> {
        let Some(source) = &self.context else {
            return Ok(None);
        };

        let request = RetrievalRequest::new(task, source.strategy.as_str()).with_options(source.options);
        let result = source.selector.retrieve(&request).await?;
        *usage += result.usage();
        debug!("Gathered {} context hits for the task", result.hits().len());

        if result.is_empty() {
            return Ok(None);
        }
        let blocks = result
            .hits()
            .iter()
            .enumerate()
            .map(|(i, hit)| format!("[{}] {}\n{}", i + 1, hit.source_location, hit.content))
            .collect::<Vec<_>>()
            .join("\n\n");
        Ok(Some(blocks))
    }
}

pub(crate) fn developer_prompt(input: &TaskInput, context: Option<&str>) -> String {
    let mut prompt = format!("Task:\n{}\n", input.task);
    if let Some(context) = context {
        prompt.push_str(&format!("\nRelevant context:\n{}\n", context));
    }
    if let Some(feedback) = &input.prior_feedback {
        prompt.push_str(&format!(
            "\nYour previous attempt was reviewed. Address this feedback:\n{}\n",
            feedback
        ));
    }
    prompt.push_str("\nSolution:");
    prompt
}

pub(crate) fn review_prompt(task: &str, draft: &str) -> String {
    format!(
        "Task:\n{}\n\nProposed solution:\n{}\n\n\
         Reply with APPROVED if the solution fully solves the task, otherwise reply with \
         REJECTED: followed by what must change.",
        task, draft
    )
}

#[async_trait]
impl TaskExecutor for DeveloperReviewerExecutor {
    async fn execute(&self, input: &TaskInput) -> Result<ExecutorOutput, ExecutorError> {
        let mut usage = Usage::default();
        let context = self.gather_context(&input.task, &mut usage).await?;

        let draft = self
            .model
            .generate(&developer_prompt(input, context.as_deref()), Some(DEVELOPER_SYSTEM))
            .await?;
        usage += draft.usage;
        let draft = draft.text.trim().to_string();
        if draft.is_empty() {
            return Err(ExecutorError::Recoverable("developer returned an empty draft".to_string()));
        }

        let review = self
            .model
            .generate(&review_prompt(&input.task, &draft), Some(REVIEWER_SYSTEM))
            .await?;
        usage += review.usage;

        match parse_review(&review.text)? {
            Review::Approved => Ok(ExecutorOutput::completed(draft, usage)),
            Review::Rejected(notes) => Ok(ExecutorOutput::incomplete(draft, notes, usage)),
        }
    }
}
