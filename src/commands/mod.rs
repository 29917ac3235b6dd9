pub mod config;
pub mod fusion;
pub mod search;
pub mod tokenize;
pub mod web;

use anyhow::{Context, Result};
use colored::{ColoredString, Colorize};
use std::io::Read;
use std::path::Path;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use semsearch::CandidateStore;

/// Candidates from a file, or stdin when the path is `-`
pub fn load_candidates(path: &Path) -> Result<CandidateStore> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read candidates from stdin")?;
        return Ok(CandidateStore::from_lines(&text));
    }
    CandidateStore::from_file(path)
}

/// Green for strong scores, yellow for middling, dimmed otherwise
pub fn color_score(score: f32, strong: f32, middling: f32) -> ColoredString {
    let text = format!("{:.4}", score);
    if score > strong {
        text.green()
    } else if score > middling {
        text.yellow()
    } else {
        text.dimmed()
    }
}

/// Cut `text` to `max` terminal columns, marking the cut with "..."
pub fn truncate_display(text: &str, max: usize) -> String {
    if text.width() <= max {
        return text.to_string();
    }

    let budget = max.saturating_sub(3);
    let mut width = 0;
    let mut out = String::new();
    for c in text.chars() {
        let w = c.width().unwrap_or(0);
        if width + w > budget {
            break;
        }
        width += w;
        out.push(c);
    }
    out.push_str("...");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_display() {
        assert_eq!(truncate_display("short", 10), "short");
        assert_eq!(truncate_display("abcdefghij", 8), "abcde...");
        // Wide characters take two columns each
        assert_eq!(truncate_display("日本語のテキスト", 9), "日本語...");
    }
}
