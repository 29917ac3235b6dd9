mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use semsearch::search::FusionMode;
use semsearch::{Config, Strategy};

#[derive(Parser)]
#[command(name = "semsearch")]
#[command(about = "Multi-strategy semantic search over a fixed candidate set", long_about = None)]
#[command(version)]
struct Cli {
    #[arg(long, global = true, help = "Config file (default: $SEMSEARCH_CONFIG or ./.semsearch.json)")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank candidates against one or more queries
    Search {
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(long, short, help = "Candidate file, one per line ('-' for stdin)")]
        candidates: PathBuf,
        #[arg(long, short, help = "vector | ann | cross | graph | rerank")]
        strategy: Option<Strategy>,
        #[arg(long, short, help = "Limit results per query")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Dense + BM25 fusion retrieval over the candidates
    Fusion {
        #[arg(required = true)]
        queries: Vec<String>,
        #[arg(long, short, help = "Candidate file, one per line ('-' for stdin)")]
        candidates: PathBuf,
        #[arg(
            long,
            short,
            help = "reciprocal_rerank | relative_score | dist_based_score | simple"
        )]
        mode: Option<FusionMode>,
        #[arg(long, short, help = "Limit results")]
        limit: Option<usize>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Split dotted candidates on a worker pool and count tokens
    Tokenize {
        #[arg(long, short, help = "Candidate file, one per line ('-' for stdin)")]
        candidates: PathBuf,
        #[arg(long, short, help = "Worker threads")]
        workers: Option<usize>,
        #[arg(long, help = "Path to a tokenizer.json")]
        tokenizer: Option<PathBuf>,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Query a SearXNG instance
    Web {
        query: String,
        #[arg(long, short = 'n', help = "Maximum results")]
        count: Option<usize>,
        #[arg(long = "site", help = "Restrict to a site (repeatable)")]
        sites: Vec<String>,
        #[arg(long, help = "Bypass the result cache")]
        no_cache: bool,
        #[arg(long, help = "JSON output")]
        json: bool,
    },
    /// Show the effective configuration
    Config {
        #[arg(long, help = "Write defaults to ./.semsearch.json")]
        init: bool,
        #[arg(long, help = "Overwrite an existing file")]
        force: bool,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref());

    match cli.command {
        Commands::Search {
            queries,
            candidates,
            strategy,
            limit,
            json,
        } => commands::search::run(config, queries, &candidates, strategy, limit, json),
        Commands::Fusion {
            queries,
            candidates,
            mode,
            limit,
            json,
        } => commands::fusion::run(config, queries, &candidates, mode, limit, json),
        Commands::Tokenize {
            candidates,
            workers,
            tokenizer,
            json,
        } => commands::tokenize::run(&config, &candidates, workers, tokenizer.as_deref(), json),
        Commands::Web {
            query,
            count,
            sites,
            no_cache,
            json,
        } => commands::web::run(&config, &query, count, sites, no_cache, json),
        Commands::Config { init, force } => commands::config::run(&config, init, force),
    }
}
