//! Fusion command - dense + BM25 retrieval merged into one flat list

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::{color_score, load_candidates, truncate_display};
use semsearch::search::FusionMode;
use semsearch::{Config, SemanticSearch};

pub fn run(
    config: Config,
    queries: Vec<String>,
    candidates: &Path,
    mode: Option<FusionMode>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let candidates = load_candidates(candidates)?;
    let mode = mode.unwrap_or(config.fusion.mode);

    let search = SemanticSearch::new(candidates, config);
    let mut results = search.fusion_search_with(mode, queries)?;
    if let Some(limit) = limit {
        results.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{} No results above the fusion threshold", "→".dimmed());
        return Ok(());
    }

    println!(
        "{} {} results ({})",
        "→".dimmed(),
        results.len(),
        mode.to_string().dimmed()
    );
    for (i, result) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {}",
            (i + 1).to_string().bold(),
            color_score(result.score, 0.8, 0.5),
            truncate_display(&result.text, 100)
        );
    }

    Ok(())
}
