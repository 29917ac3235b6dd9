//! Search command - rank candidates against queries with one strategy

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use super::{color_score, load_candidates, truncate_display};
use semsearch::{Config, SemanticSearch, Strategy};

pub fn run(
    config: Config,
    queries: Vec<String>,
    candidates: &Path,
    strategy: Option<Strategy>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    let candidates = load_candidates(candidates)?;
    let total = candidates.len();
    let strategy = strategy.unwrap_or(config.search.default_strategy);

    let search = SemanticSearch::new(candidates, config);
    let mut results = search.search_with(strategy, queries)?;
    if let Some(limit) = limit {
        results.truncate(limit);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{} No candidates or queries given", "→".dimmed());
        return Ok(());
    }

    // PageRank mass shrinks with the candidate count; color relative to uniform
    let (strong, middling) = match strategy {
        Strategy::Graph => {
            let uniform = 1.0 / total.max(1) as f32;
            (2.0 * uniform, uniform)
        }
        _ => (0.8, 0.5),
    };

    for (query, ranked) in results.iter() {
        println!(
            "{} {} ({}, {} results)",
            "→".dimmed(),
            query.cyan().bold(),
            strategy.to_string().dimmed(),
            ranked.len()
        );
        for (i, result) in ranked.iter().enumerate() {
            println!(
                "  {}. [{}] {}",
                (i + 1).to_string().bold(),
                color_score(result.score, strong, middling),
                truncate_display(&result.text, 100)
            );
        }
        println!();
    }

    Ok(())
}
