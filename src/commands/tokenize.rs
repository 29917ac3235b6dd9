//! Tokenize command - dotted-path splitting on a worker pool, plus token counts

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::{load_candidates, truncate_display};
use semsearch::tokens::{parallel_tokenize, split_path, TokenCounter};
use semsearch::Config;

pub fn run(
    config: &Config,
    candidates: &Path,
    workers: Option<usize>,
    tokenizer: Option<&Path>,
    json: bool,
) -> Result<()> {
    let candidates = load_candidates(candidates)?;
    let workers = workers.unwrap_or(config.tokenize.workers);

    let segments = parallel_tokenize(candidates.candidates(), workers, split_path)?;

    let tokenizer = tokenizer.or(config.tokenize.tokenizer_path.as_deref().map(Path::new));
    let counter = TokenCounter::from_path_or_words(tokenizer);
    let counts = counter.count_batch(&candidates.as_strs())?;
    let total: usize = counts.iter().sum();

    if json {
        let items: Vec<_> = candidates
            .iter()
            .zip(&segments)
            .zip(&counts)
            .map(|((text, segments), tokens)| {
                serde_json::json!({
                    "text": text,
                    "segments": segments,
                    "tokens": tokens,
                })
            })
            .collect();
        let output = serde_json::json!({
            "tokenizer": counter.name(),
            "workers": workers,
            "total_tokens": total,
            "items": items,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    for ((text, segments), tokens) in candidates.iter().zip(&segments).zip(&counts) {
        println!(
            "{} {} {}",
            format!("{:>5}", tokens).yellow(),
            truncate_display(text, 60),
            format!("[{}]", segments.join(", ")).dimmed()
        );
    }
    println!();
    println!(
        "{} {} candidates, {} tokens ({}, {} workers)",
        "→".dimmed(),
        candidates.len(),
        total.to_string().bold(),
        counter.name(),
        workers
    );

    Ok(())
}
