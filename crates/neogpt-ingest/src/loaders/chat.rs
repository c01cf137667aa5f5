//! WhatsApp chat exports.

use super::{file_title, read_text, DocumentParser, ParsedDocument};
use crate::error::IngestResult;
use regex::Regex;
use std::path::Path;
use std::sync::OnceLock;

// `12/31/23, 9:15 PM - Ada: text` or `[12/31/23, 21:15:02] Ada: text`
const MESSAGE_PATTERN: &str = r"^\[?(\d{1,2}[/.]\d{1,2}[/.]\d{2,4},?\s\d{1,2}:\d{2}(?::\d{2})?(?:[\s\u{202f}]?[APap]\.?[Mm]\.?)?)\]?\s?(?:-\s)?([^:]+?):\s(.*)$";

// Timestamped lines without a sender are system notices.
const NOTICE_PATTERN: &str = r"^\[?\d{1,2}[/.]\d{1,2}[/.]\d{2,4},?\s\d{1,2}:\d{2}";

struct ChatPatterns {
    message: Regex,
    notice: Regex,
}

static PATTERNS: OnceLock<ChatPatterns> = OnceLock::new();

fn patterns() -> &'static ChatPatterns {
    PATTERNS.get_or_init(|| ChatPatterns {
        message: Regex::new(MESSAGE_PATTERN).expect("chat message regex must compile"),
        notice: Regex::new(NOTICE_PATTERN).expect("chat notice regex must compile"),
    })
}

#[derive(Debug, Clone, PartialEq)]
struct Message {
    sender: String,
    timestamp: String,
    text: String,
}

fn parse_messages(raw: &str) -> Vec<Message> {
    let p = patterns();
    let mut messages: Vec<Message> = Vec::new();
    for line in raw.lines() {
        let line = line.trim_start_matches(['\u{feff}', '\u{200e}']).trim_end();
        if line.is_empty() {
            continue;
        }
        match p.message.captures(line) {
            Some(caps) => messages.push(Message {
                timestamp: caps[1].to_string(),
                sender: caps[2].trim().to_string(),
                text: caps[3].trim().to_string(),
            }),
            None if p.notice.is_match(line) => {}
            None => {
                // Multi-line messages continue on the following lines.
                if let Some(last) = messages.last_mut() {
                    last.text.push('\n');
                    last.text.push_str(line);
                }
            }
        }
    }
    messages
}

/// Renders each message as `sender on timestamp: text`.
pub struct WhatsAppChatParser;

impl WhatsAppChatParser {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WhatsAppChatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl DocumentParser for WhatsAppChatParser {
    fn parse(&self, path: &Path) -> IngestResult<Vec<ParsedDocument>> {
        let raw = read_text(path)?;
        let messages = parse_messages(&raw);

        let mut senders: Vec<&str> = Vec::new();
        for m in &messages {
            if !senders.contains(&m.sender.as_str()) {
                senders.push(&m.sender);
            }
        }

        let content = messages
            .iter()
            .map(|m| format!("{} on {}: {}", m.sender, m.timestamp, m.text))
            .collect::<Vec<_>>()
            .join("\n\n");

        let metadata = serde_json::json!({
            "format": "whatsapp",
            "messages": messages.len(),
            "participants": senders,
        });
        let mut doc = ParsedDocument::new(content).with_metadata(metadata);
        if let Some(t) = file_title(path) {
            doc = doc.with_title(t);
        }
        Ok(vec![doc])
    }

    fn extensions(&self) -> &[&str] {
        &["txt"]
    }
}
