//! Config command - print the effective configuration or write defaults

use anyhow::Result;
use colored::Colorize;
use std::path::Path;

use semsearch::core::config::LOCAL_CONFIG_FILE;
use semsearch::Config;

pub fn run(config: &Config, init: bool, force: bool) -> Result<()> {
    if !init {
        println!("{}", serde_json::to_string_pretty(config)?);
        return Ok(());
    }

    let path = Path::new(LOCAL_CONFIG_FILE);
    if path.exists() && !force {
        println!(
            "{} {} already exists (use --force to overwrite)",
            "!".yellow(),
            LOCAL_CONFIG_FILE
        );
        return Ok(());
    }

    std::fs::write(path, Config::default_json()?)?;
    println!("{} Created {}", "✓".green(), LOCAL_CONFIG_FILE.cyan());
    Ok(())
}
