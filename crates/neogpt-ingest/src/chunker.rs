//! Content chunking for retrieval.
//!
//! Prose is split on paragraph and then sentence boundaries, falling back to
//! a fixed character window when neither exists. Code is first cut at
//! top-level declarations for its language, and oversized pieces go through
//! the prose splitter.

use neogpt_config::BuilderConfig;
use neogpt_core::Language;

/// Configuration for chunking.
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Target size of each chunk in characters.
    pub chunk_size: usize,
    /// Number of characters to overlap between chunks.
    pub chunk_overlap: usize,
    /// Minimum chunk size (won't create chunks smaller than this).
    pub min_chunk_size: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 100,
            min_chunk_size: 100,
        }
    }
}

impl ChunkConfig {
    /// Create config from builder settings.
    pub fn from_builder_config(config: &BuilderConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap.min(config.chunk_size.saturating_sub(1)),
            min_chunk_size: (config.chunk_size / 10).min(100),
        }
    }
}

/// Declaration prefixes that start a new code piece, per language.
fn code_separators(language: Language) -> &'static [&'static str] {
    match language {
        Language::Rust => &["\nfn ", "\npub fn ", "\nimpl ", "\nstruct ", "\npub struct ", "\nenum ", "\npub enum ", "\ntrait ", "\nmod "],
        Language::Python => &["\nclass ", "\ndef ", "\nasync def "],
        Language::Go => &["\nfunc ", "\ntype ", "\nvar ", "\nconst "],
        Language::Java | Language::CSharp | Language::Kotlin | Language::Scala => {
            &["\nclass ", "\npublic ", "\nprivate ", "\nprotected ", "\ninterface ", "\nobject ", "\nfun ", "\ndef "]
        }
        Language::Js | Language::Ts => &["\nfunction ", "\nclass ", "\nexport ", "\nconst ", "\nlet "],
        Language::Cpp => &["\nclass ", "\nstruct ", "\nnamespace ", "\ntemplate", "\nvoid ", "\nint "],
        Language::Php => &["\nfunction ", "\nclass ", "\ninterface ", "\ntrait "],
        Language::Ruby => &["\ndef ", "\nclass ", "\nmodule "],
        Language::Swift => &["\nfunc ", "\nclass ", "\nstruct ", "\nenum ", "\nprotocol ", "\nextension "],
        Language::Proto => &["\nmessage ", "\nservice ", "\nenum "],
        Language::Sol => &["\ncontract ", "\nfunction ", "\nevent ", "\nmodifier "],
        Language::Markdown | Language::Rst => &["\n# ", "\n## ", "\n### ", "\n```"],
        Language::Latex => &["\n\\chapter", "\n\\section", "\n\\subsection", "\n\\begin"],
        Language::Html => &["\n<body", "\n<div", "\n<section", "\n<table", "\n<h1", "\n<h2"],
        Language::Cobol => &["\n       IDENTIFICATION DIVISION", "\n       PROCEDURE DIVISION", "\n       DATA DIVISION"],
    }
}

/// Content chunker for splitting text.
pub struct Chunker {
    config: ChunkConfig,
}

impl Chunker {
    /// Create a new chunker with the given configuration.
    pub fn new(config: ChunkConfig) -> Self {
        Self { config }
    }

    /// Create a chunker with default configuration.
    pub fn default_chunker() -> Self {
        Self::new(ChunkConfig::default())
    }

    /// Split text, choosing the code splitter when a language is known.
    pub fn split(&self, text: &str, language: Option<Language>) -> Vec<String> {
        match language {
            Some(language) => self.split_code(text, language),
            None => self.split_text(text),
        }
    }

    /// Split source code at declaration boundaries.
    pub fn split_code(&self, text: &str, language: Language) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }
        if trimmed.chars().count() <= self.config.chunk_size {
            return vec![trimmed.to_string()];
        }

        let separators = code_separators(language);
        let mut pieces: Vec<&str> = Vec::new();
        let mut start = 0;
        let mut search_from = 0;
        while search_from < trimmed.len() {
            let next = separators
                .iter()
                .filter_map(|sep| trimmed[search_from..].find(sep).map(|i| search_from + i))
                .filter(|&i| i > start)
                .min();
            match next {
                Some(i) => {
                    pieces.push(&trimmed[start..i]);
                    start = i;
                    search_from = i + 1;
                }
                None => break,
            }
        }
        pieces.push(&trimmed[start..]);

        let mut chunks = Vec::new();
        let mut current = String::new();
        for piece in pieces {
            let piece = piece.trim_matches('\n');
            if piece.trim().is_empty() {
                continue;
            }
            let piece_len = piece.chars().count();
            let current_len = current.chars().count();

            if current_len > 0 && current_len + piece_len + 1 > self.config.chunk_size {
                chunks.push(std::mem::take(&mut current));
            }

            if piece_len > self.config.chunk_size {
                chunks.extend(self.split_text(piece));
                continue;
            }

            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(piece);
        }
        if !current.trim().is_empty() {
            chunks.push(current);
        }

        chunks
    }

    /// Split text into chunks.
    /// Works by splitting on paragraph/sentence boundaries where possible.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return vec![];
        }

        if trimmed.chars().count() <= self.config.chunk_size {
            return vec![trimmed.to_string()];
        }

        let mut chunks = Vec::new();
        let mut current_chunk = String::new();

        for para in trimmed.split("\n\n") {
            let para = para.trim();
            if para.is_empty() {
                continue;
            }

            let current_len = current_chunk.chars().count();
            let para_len = para.chars().count();

            if current_len > 0 && current_len + para_len + 2 > self.config.chunk_size {
                self.flush(&mut chunks, &current_chunk);
                current_chunk = self.overlap_tail(&current_chunk);
            }

            if !current_chunk.is_empty() {
                current_chunk.push_str("\n\n");
            }

            if para_len <= self.config.chunk_size {
                current_chunk.push_str(para);
                continue;
            }

            // Paragraph itself is too long.
            let sentences = self.split_sentences(para);
            let (pieces, carry_overlap): (Vec<String>, bool) = if sentences.len() <= 1 {
                // No sentence breaks (e.g. minified JSON): force a character split.
                (self.force_split_by_chars(para), false)
            } else {
                (sentences.into_iter().map(str::to_string).collect(), true)
            };

            for piece in pieces {
                let piece_len = piece.chars().count();
                let current_len = current_chunk.trim().chars().count();

                if current_len > 0 && current_len + piece_len + 1 > self.config.chunk_size {
                    self.flush(&mut chunks, &current_chunk);
                    current_chunk = if carry_overlap {
                        self.overlap_tail(&current_chunk)
                    } else {
                        String::new()
                    };
                }

                if !current_chunk.trim().is_empty() {
                    current_chunk.push(' ');
                }
                current_chunk.push_str(&piece);
            }
        }

        let last = current_chunk.trim();
        if !last.is_empty() {
            chunks.push(last.to_string());
        }

        chunks
    }

    fn flush(&self, chunks: &mut Vec<String>, current: &str) {
        let text = current.trim();
        if text.chars().count() >= self.config.min_chunk_size || chunks.is_empty() {
            chunks.push(text.to_string());
        }
    }

    fn overlap_tail(&self, current: &str) -> String {
        if self.config.chunk_overlap == 0 {
            return String::new();
        }
        let chars: Vec<char> = current.chars().collect();
        let skip = chars.len().saturating_sub(self.config.chunk_overlap);
        chars[skip..].iter().collect()
    }

    /// Force split text by character limit (for content without natural breaks like JSON).
    fn force_split_by_chars(&self, text: &str) -> Vec<String> {
        let chars: Vec<char> = text.chars().collect();
        let mut result = Vec::new();
        let mut start = 0;

        while start < chars.len() {
            let end = std::cmp::min(start + self.config.chunk_size, chars.len());
            result.push(chars[start..end].iter().collect());
            if end == chars.len() {
                break;
            }
            // Move forward with overlap
            start = end.saturating_sub(self.config.chunk_overlap).max(start + 1);
        }

        result
    }

    /// Split text into sentences.
    fn split_sentences<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let mut sentences = Vec::new();
        let mut start = 0;

        for (i, c) in text.char_indices() {
            if c == '.' || c == '!' || c == '?' {
                let next_idx = i + c.len_utf8();
                if next_idx >= text.len()
                    || text[next_idx..].starts_with(' ')
                    || text[next_idx..].starts_with('\n')
                {
                    sentences.push(&text[start..next_idx]);
                    start = next_idx;
                    if start < text.len() && text[start..].starts_with(' ') {
                        start += 1;
                    }
                }
            }
        }

        if start < text.len() {
            let remaining = text[start..].trim();
            if !remaining.is_empty() {
                sentences.push(remaining);
            }
        }

        if sentences.is_empty() && !text.trim().is_empty() {
            sentences.push(text.trim());
        }

        sentences
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small(chunk_size: usize, chunk_overlap: usize) -> Chunker {
        Chunker::new(ChunkConfig {
            chunk_size,
            chunk_overlap,
            min_chunk_size: 10,
        })
    }

    #[test]
    fn test_small_text_single_chunk() {
        let chunker = Chunker::default_chunker();
        let chunks = chunker.split_text("This is a small piece of text.");

        assert_eq!(chunks, vec!["This is a small piece of text.".to_string()]);
    }

    #[test]
    fn test_large_text_multiple_chunks() {
        let chunker = small(100, 20);

        let text = "This is sentence one. This is sentence two. This is sentence three. \
                    This is sentence four. This is sentence five. This is sentence six. \
                    This is sentence seven. This is sentence eight. This is sentence nine.";

        let chunks = chunker.split_text(text);

        assert!(chunks.len() > 1, "Should create multiple chunks, got {}", chunks.len());
        for chunk in &chunks {
            assert!(!chunk.is_empty());
            assert!(chunk.chars().count() <= 100 + 20);
        }
    }

    #[test]
    fn test_utf8_text() {
        let chunker = small(50, 10);
        let text = "Hello ─── World! This has unicode: 日本語 and more ─ content here.";

        let chunks = chunker.split_text(text);
        assert!(!chunks.is_empty());
    }

    #[test]
    fn test_force_split_terminates() {
        let chunker = small(10, 9);
        let text = "x".repeat(35);

        let chunks = chunker.split_text(&text);
        assert!(chunks.len() >= 4);
        assert!(chunks.iter().all(|c| c.chars().count() <= 20));
    }

    #[test]
    fn test_empty_text() {
        let chunker = Chunker::default_chunker();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text("   ").is_empty());
        assert!(chunker.split("  ", Some(Language::Rust)).is_empty());
    }

    #[test]
    fn test_paragraph_based_chunking() {
        let chunker = small(40, 0);
        let text = "First paragraph here.\n\nSecond paragraph with more content.\n\nThird paragraph.";

        let chunks = chunker.split_text(text);
        assert_eq!(chunks[0], "First paragraph here.");
        assert!(chunks.iter().any(|c| c.contains("Third paragraph.")));
    }

    #[test]
    fn test_code_splits_at_declarations() {
        let chunker = small(60, 0);
        let code = "use std::io;\n\nfn first() {\n    println!(\"one\");\n}\n\nfn second() {\n    println!(\"two\");\n}\n\nfn third() {\n    println!(\"three\");\n}\n";

        let chunks = chunker.split_code(code, Language::Rust);
        assert!(chunks.len() >= 2);
        assert!(chunks.iter().any(|c| c.trim_start().starts_with("fn second")));
        assert!(chunks.iter().all(|c| !c.contains("fn first") || !c.contains("fn third")));
    }

    #[test]
    fn test_from_builder_config() {
        let config = ChunkConfig::from_builder_config(&BuilderConfig::default());
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.min_chunk_size, 100);
    }
}
