//! Ask command - retrieve with a strategy, then answer from the hits.

use super::{load, print_rule, retrieval_options, runtime, spinner, Services};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use colored::Colorize;
use neogpt_core::{LanguageModel, Usage};
use neogpt_retrieve::{
    answer, build_answer_prompt, source_references, RetrievalOptions, RetrievalRequest,
    RetrievalResult, Selector, SourceReference, ANSWER_SYSTEM_PROMPT,
};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tokio::runtime::Runtime;

/// Notes file used by `--write` without a path.
pub const DEFAULT_NOTES_FILE: &str = "notes.md";

/// How a reply is shown and kept.
#[derive(Debug, Clone, Default)]
pub struct ReplyOptions {
    pub show_sources: bool,
    pub stream: bool,
    /// Skip the selector and ask the model directly.
    pub no_retrieval: bool,
    /// Append each exchange to this markdown file.
    pub notes: Option<PathBuf>,
}

pub fn run(
    question: &str,
    strategy: Option<String>,
    k: Option<usize>,
    reply: ReplyOptions,
) -> Result<()> {
    let (paths, config) = load()?;
    let rt = runtime()?;
    let services = Services::connect(&rt, &paths, &config)?;

    println!("{} {}", "Question:".cyan().bold(), question);
    print_rule();
    println!();

    if reply.no_retrieval {
        return respond_direct(&rt, &services, question, &reply);
    }

    let selector = services.selector(&config);
    let strategy = strategy.unwrap_or_else(|| config.retrieval.strategy.clone());
    let options = retrieval_options(&config, k);
    respond(&rt, &services, &selector, question, &strategy, options, &reply)
}

/// Retrieve and answer one question. Shared with `chat`.
pub fn respond(
    rt: &Runtime,
    services: &Services,
    selector: &Selector,
    question: &str,
    strategy: &str,
    options: RetrievalOptions,
    reply: &ReplyOptions,
) -> Result<()> {
    let request = RetrievalRequest::new(question, strategy).with_options(options);

    let pb = spinner(&format!("Retrieving ({})...", strategy))?;
    let result = rt.block_on(selector.retrieve(&request));
    pb.finish_and_clear();
    let result = result.context("Retrieval failed")?;

    if result.is_empty() {
        println!(
            "{} No relevant content found for this question with the {} strategy.",
            "Note:".yellow(),
            strategy
        );
        println!();
        println!("Suggestions:");
        println!("  • Try rephrasing your question");
        println!("  • Check that relevant content was ingested with 'neogpt build'");
        println!("  • Try another strategy, e.g. --strategy web");
        return Ok(());
    }

    let text = if reply.stream {
        let prompt = build_answer_prompt(question, &result);
        stream_reply(rt, services, &prompt, Some(ANSWER_SYSTEM_PROMPT))?
    } else {
        let pb = spinner("Thinking...")?;
        let generated = rt.block_on(answer(services.model.as_ref(), question, &result));
        pb.finish_and_clear();
        let generated = generated.context("Failed to generate answer")?;
        print_reply(&generated.text, &generated.usage);
        generated.text
    };

    let sources = source_references(&result);
    if reply.show_sources {
        print_sources(&sources);
    }
    if let Some(path) = &reply.notes {
        save_note(path, question, &text, &sources)?;
    }
    Ok(())
}

/// Send the question to the model without any retrieved context.
pub fn respond_direct(
    rt: &Runtime,
    services: &Services,
    question: &str,
    reply: &ReplyOptions,
) -> Result<()> {
    let text = if reply.stream {
        stream_reply(rt, services, question, None)?
    } else {
        let pb = spinner("Thinking...")?;
        let generated = rt.block_on(services.model.generate(question, None));
        pb.finish_and_clear();
        let generated = generated.context("Failed to generate answer")?;
        print_reply(&generated.text, &generated.usage);
        generated.text
    };

    if let Some(path) = &reply.notes {
        save_note(path, question, &text, &[])?;
    }
    Ok(())
}

/// Print fragments as they arrive and return the full text.
fn stream_reply(
    rt: &Runtime,
    services: &Services,
    prompt: &str,
    system: Option<&str>,
) -> Result<String> {
    let request = services.model.request(prompt, system);
    let mut rx = rt
        .block_on(services.client.generate_stream(request))
        .context("Failed to generate answer")?;

    print!("{} ", "Answer:".green().bold());
    io::stdout().flush()?;

    let text = rt.block_on(async {
        let mut text = String::new();
        while let Some(fragment) = rx.recv().await {
            print!("{}", fragment);
            io::stdout().flush().ok();
            text.push_str(&fragment);
        }
        text
    });

    println!();
    println!();
    Ok(text)
}

fn print_reply(text: &str, usage: &Usage) {
    println!("{}", "Answer:".green().bold());
    println!();
    println!("{}", text);
    println!();
    if usage.calls > 0 {
        println!(
            "{}",
            format!("{} model calls, {} tokens", usage.calls, usage.total_tokens()).dimmed()
        );
    }
}

fn print_sources(sources: &[SourceReference]) {
    if sources.is_empty() {
        return;
    }
    print_rule();
    println!("{}", "Sources:".cyan().bold());
    for (i, source) in sources.iter().enumerate() {
        println!(
            "  {}. {} {}",
            i + 1,
            source.location.white(),
            format!("(score: {:.2})", source.score).dimmed()
        );
    }
}

/// One markdown section per exchange.
fn format_note(
    question: &str,
    answer: &str,
    sources: &[SourceReference],
    asked_at: DateTime<Local>,
) -> String {
    let mut note = format!(
        "## {}\n\n_{}_\n\n{}\n",
        question.trim(),
        asked_at.format("%Y-%m-%d %H:%M"),
        answer.trim()
    );
    if !sources.is_empty() {
        note.push_str("\n**Sources**\n\n");
        for source in sources {
            note.push_str(&format!("- {} ({:.2})\n", source.location, source.score));
        }
    }
    note.push('\n');
    note
}

fn append_note(path: &Path, note: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Failed to open notes file {}", path.display()))?;
    file.write_all(note.as_bytes())
        .with_context(|| format!("Failed to write notes file {}", path.display()))?;
    Ok(())
}

fn save_note(path: &Path, question: &str, answer: &str, sources: &[SourceReference]) -> Result<()> {
    append_note(path, &format_note(question, answer, sources, Local::now()))?;
    println!("{} {}", "Saved to".dimmed(), path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn asked_at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 14, 5, 0).unwrap()
    }

    fn source(location: &str, score: f32) -> SourceReference {
        SourceReference {
            location: location.to_string(),
            excerpt: String::new(),
            score,
        }
    }

    #[test]
    fn test_format_note_with_sources() {
        let note = format_note(
            " What is Rust? ",
            "A systems language.\n",
            &[source("docs/rust.md", 0.91), source("https://rust-lang.org", 0.5)],
            asked_at(),
        );

        assert_eq!(
            note,
            "## What is Rust?\n\n_2024-03-09 14:05_\n\nA systems language.\n\n\
             **Sources**\n\n- docs/rust.md (0.91)\n- https://rust-lang.org (0.50)\n\n"
        );
    }

    #[test]
    fn test_format_note_without_sources() {
        let note = format_note("hi", "hello", &[], asked_at());
        assert!(!note.contains("Sources"));
        assert!(note.ends_with("hello\n\n"));
    }

    #[test]
    fn test_append_note_creates_then_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("journal").join(DEFAULT_NOTES_FILE);

        append_note(&path, "## first\n\n").unwrap();
        append_note(&path, "## second\n\n").unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "## first\n\n## second\n\n");
    }
}
