//! Web command - SearXNG metasearch with cached, filtered results

use anyhow::Result;
use colored::Colorize;

use super::truncate_display;
use semsearch::searxng::{SearxngClient, SearxngOptions};
use semsearch::Config;

pub fn run(
    config: &Config,
    query: &str,
    count: Option<usize>,
    sites: Vec<String>,
    no_cache: bool,
    json: bool,
) -> Result<()> {
    let mut options = SearxngOptions::from_config(&config.searxng);
    options.count = count;
    options.filter_sites = sites;
    options.use_cache = options.use_cache && !no_cache;

    let client = SearxngClient::new(config.searxng.clone())?;
    let results = client.search(query, &options);

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }

    if results.is_empty() {
        println!("{} No results found for: {}", "→".dimmed(), query.cyan());
        return Ok(());
    }

    println!(
        "{} {} results for: {}",
        "→".dimmed(),
        results.len(),
        query.cyan()
    );
    println!();

    for (i, result) in results.iter().enumerate() {
        let title = result.title.as_deref().unwrap_or(&result.url);
        println!(
            "{}. [{}] {}",
            (i + 1).to_string().bold(),
            format!("{:.2}", result.score).green(),
            title.cyan()
        );
        println!("   {}", result.url.dimmed());
        if let Some(content) = &result.content {
            println!("   {}", truncate_display(content, 100));
        }
        println!();
    }

    Ok(())
}
