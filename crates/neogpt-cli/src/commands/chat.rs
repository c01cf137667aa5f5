//! Chat command - interactive REPL over the index.

use super::ask::{self, ReplyOptions};
use super::{load, retrieval_options, runtime, Services};
use anyhow::Result;
use colored::Colorize;
use neogpt_retrieve::StrategyName;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

/// What a line typed at the prompt asks for.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    SetStrategy(&'a str),
    SetK(&'a str),
    SetRetrieval(&'a str),
    Help,
    Exit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    let (command, arg) = match line.split_once(char::is_whitespace) {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };
    match command {
        "" => Input::Empty,
        "/exit" | "/quit" | "exit" | "quit" => Input::Exit,
        "/help" | "help" => Input::Help,
        "/strategy" => Input::SetStrategy(arg),
        "/k" => Input::SetK(arg),
        "/retrieval" => Input::SetRetrieval(arg),
        _ => Input::Question(line),
    }
}

/// `on`/`off` for `/retrieval`.
fn parse_switch(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "on" | "true" | "yes" => Some(true),
        "off" | "false" | "no" => Some(false),
        _ => None,
    }
}

pub fn run(strategy: Option<String>, k: Option<usize>, mut reply: ReplyOptions) -> Result<()> {
    let (paths, config) = load()?;
    let rt = runtime()?;
    let services = Services::connect(&rt, &paths, &config)?;
    let selector = services.selector(&config);

    let mut strategy: StrategyName = strategy
        .as_deref()
        .unwrap_or(&config.retrieval.strategy)
        .parse()?;
    let mut options = retrieval_options(&config, k);
    reply.show_sources = true;
    reply.stream = true;

    let mut rl = DefaultEditor::new()?;
    let history_path = paths.data_dir.join("chat_history");
    let _ = rl.load_history(&history_path);

    println!("{}", "NeoGPT Chat".cyan().bold());
    println!("{}", "─".repeat(50));
    if reply.no_retrieval {
        println!("Retrieval off, questions go straight to the model.");
    } else {
        println!("Strategy {}, k = {}.", strategy.as_str().cyan(), options.k);
    }
    println!("Type {} for commands, {} to exit.", "/help".cyan(), "/exit".cyan());
    println!();

    loop {
        let readline = rl.readline(&format!("{} ", "neogpt>".green().bold()));
        match readline {
            Ok(line) => {
                let input = parse_input(&line);
                if input != Input::Empty {
                    let _ = rl.add_history_entry(line.trim());
                }

                match input {
                    Input::Empty => continue,
                    Input::Exit => break,
                    Input::Help => print_help(),
                    Input::SetStrategy(name) => match name.parse::<StrategyName>() {
                        Ok(parsed) => {
                            strategy = parsed;
                            println!("Strategy set to {}", strategy.as_str().cyan());
                        }
                        Err(e) => eprintln!("{} {}", "Error:".red(), e),
                    },
                    Input::SetK(value) => match value.parse::<usize>() {
                        Ok(k) if k > 0 => {
                            options.k = k;
                            println!("k set to {}", k);
                        }
                        _ => eprintln!("{} k must be a positive integer", "Error:".red()),
                    },
                    Input::SetRetrieval(value) => match parse_switch(value) {
                        Some(enabled) => {
                            reply.no_retrieval = !enabled;
                            println!("Retrieval {}", if enabled { "on" } else { "off" });
                        }
                        None => eprintln!("{} expected /retrieval on|off", "Error:".red()),
                    },
                    Input::Question(question) => {
                        let outcome = if reply.no_retrieval {
                            ask::respond_direct(&rt, &services, question, &reply)
                        } else {
                            ask::respond(
                                &rt,
                                &services,
                                &selector,
                                question,
                                strategy.as_str(),
                                options,
                                &reply,
                            )
                        };
                        if let Err(e) = outcome {
                            eprintln!("{} {:#}", "Error:".red(), e);
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{} {:?}", "Error:".red(), err);
                break;
            }
        }
    }

    println!("Goodbye!");
    if let Some(parent) = history_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let _ = rl.save_history(&history_path);

    Ok(())
}

fn print_help() {
    println!("{}", "Commands:".cyan().bold());
    println!("  {}   Switch retrieval strategy", "/strategy <name>".white());
    println!("  {}              Change the number of retrieved chunks", "/k <n>".white());
    println!("  {}  Ask the model directly when off", "/retrieval on|off".white());
    println!("  {}                 Leave the chat", "/exit".white());
    println!();
    println!(
        "Strategies: {}",
        StrategyName::ALL
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), Input::Empty);
        assert_eq!(parse_input("/exit"), Input::Exit);
        assert_eq!(parse_input("/strategy  hybrid "), Input::SetStrategy("hybrid"));
        assert_eq!(parse_input("/k 8"), Input::SetK("8"));
        assert_eq!(
            parse_input(" what is rust? "),
            Input::Question("what is rust?")
        );
        assert_eq!(parse_input("/strategy"), Input::SetStrategy(""));
        assert_eq!(parse_input("/retrieval off"), Input::SetRetrieval("off"));
    }

    #[test]
    fn test_parse_switch() {
        assert_eq!(parse_switch("ON"), Some(true));
        assert_eq!(parse_switch("off"), Some(false));
        assert_eq!(parse_switch("maybe"), None);
    }
}
