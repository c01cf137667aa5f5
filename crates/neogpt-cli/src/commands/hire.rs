//! Hire command - run a task through the developer/reviewer agent.

use super::{load, print_rule, retrieval_options, runtime, spinner, Services};
use anyhow::{Context, Result};
use colored::Colorize;
use neogpt_agent::{AgentLoop, AgentSession, AttemptOutcome, DeveloperReviewerExecutor, SessionStatus};
use neogpt_core::LanguageModel;
use std::sync::Arc;

pub fn run(
    task: &str,
    tries: Option<i64>,
    strategy: Option<String>,
    no_context: bool,
    json: bool,
) -> Result<()> {
    let (paths, config) = load()?;
    let rt = runtime()?;
    let services = Services::connect(&rt, &paths, &config)?;

    let model: Arc<dyn LanguageModel> = services.model.clone();
    let mut executor = DeveloperReviewerExecutor::new(model);
    if config.agent.use_context && !no_context {
        let strategy = strategy.unwrap_or_else(|| config.retrieval.strategy.clone());
        executor = executor.with_context(
            services.selector(&config),
            strategy,
            retrieval_options(&config, None),
        );
    }

    let agent = AgentLoop::from_config(Arc::new(executor), &config.agent);
    let max_tries = tries.unwrap_or(i64::from(config.agent.max_tries));

    let pb = if json {
        None
    } else {
        println!("{} {}", "Task:".cyan().bold(), task);
        print_rule();
        Some(spinner(&format!("Working (up to {} attempts)...", max_tries))?)
    };
    let session = rt.block_on(agent.run(task, max_tries));
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }
    let session = session.context("Agent task rejected")?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        print_session(&session);
    }

    match session.status {
        SessionStatus::FatalError => anyhow::bail!("Agent stopped after a fatal error"),
        _ => Ok(()),
    }
}

fn print_session(session: &AgentSession) {
    for attempt in &session.attempts {
        let label = format!("Attempt {}", attempt.attempt_number);
        let detail = match &attempt.outcome {
            AttemptOutcome::Completed { .. } => "approved".green(),
            AttemptOutcome::Incomplete { .. } => "rejected by reviewer".yellow(),
            AttemptOutcome::Failed { message } => format!("failed: {}", message).yellow(),
            AttemptOutcome::TimedOut { seconds } => format!("timed out after {}s", seconds).yellow(),
            AttemptOutcome::Fatal { message } => format!("fatal: {}", message).red(),
        };
        println!(
            "  {} {} {}",
            label.white().bold(),
            detail,
            format!("({:.1}s)", attempt.elapsed.as_secs_f64()).dimmed()
        );
        if let AttemptOutcome::Incomplete {
            feedback: Some(feedback),
            ..
        } = &attempt.outcome
        {
            println!("    {}", feedback.dimmed());
        }
    }
    println!();

    let status = match session.status {
        SessionStatus::Succeeded => session.status.as_str().green().bold(),
        SessionStatus::Exhausted => session.status.as_str().yellow().bold(),
        _ => session.status.as_str().red().bold(),
    };
    println!("{} {}", "Status:".cyan().bold(), status);

    let output = match session.status {
        SessionStatus::Succeeded => session.final_output(),
        _ => session.last_output(),
    };
    if let Some(output) = output {
        if session.status != SessionStatus::Succeeded {
            println!("{}", "Last draft (not approved):".yellow());
        }
        println!();
        println!("{}", output);
        println!();
    }

    let usage = session.usage();
    let elapsed = session
        .finished_at
        .map(|end| (end - session.started_at).num_seconds())
        .unwrap_or_default();
    println!(
        "{}",
        format!(
            "{} attempts, {} model calls, {} tokens, {}s",
            session.attempts.len(),
            usage.calls,
            usage.total_tokens(),
            elapsed
        )
        .dimmed()
    );
}
