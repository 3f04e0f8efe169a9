use clap::Parser;
use mp_core::config::{Config, DEFAULT_API_URL};
use mp_core::{Difficulty, Rating, SearchMode, SortOrder};
use std::path::PathBuf;

mod commands;
mod duration;
mod logging;

use commands::Context;
use duration::HumanDuration;

#[derive(Parser, Debug)]
#[command(name = "minepenge", author, version, about = "Browse and refresh the MinePenge article collection", long_about = None)]
pub struct Cli {
    /// Article dataset JSON file. The bundled dataset is used when absent.
    #[arg(long, global = true, env = "MINEPENGE_DATASET")]
    dataset: Option<PathBuf>,
    /// Topic table JSON file replacing the built-in table
    #[arg(long, global = true, env = "MINEPENGE_TOPICS")]
    topics: Option<PathBuf>,
    /// Base URL of the article API
    #[arg(long, global = true, env = "MINEPENGE_API_URL")]
    api_url: Option<String>,
    /// How long a fetched collection counts as fresh (e.g. 30s, 5m, 1h)
    #[arg(long, global = true, default_value = "5m")]
    cache_ttl: HumanDuration,
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Filter, search and page through the articles
    Query(QueryArgs),
    /// Print one article
    Show { id: String },
    /// List the tags, audiences, difficulties and sources in the collection
    Filters,
    /// Collection statistics
    Stats,
    /// Fetch the article list from the API and save it as the dataset file
    Refresh {
        /// File to write; defaults to --dataset
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
        /// Keep refreshing with this interval (e.g. 1h, 30m, 1h15m30s)
        #[arg(long)]
        interval: Option<HumanDuration>,
    },
    /// Ask the API to re-scrape, then refresh
    Scrape {
        /// Source to scrape. Repeat for several; defaults to all known sources.
        #[arg(long = "source")]
        sources: Vec<String>,
    },
    /// Send feedback on an article to the API
    Feedback {
        id: String,
        rating: Rating,
        #[arg(long, default_value = "")]
        comment: String,
    },
    /// Serve the HTTP API
    Serve {
        #[arg(long, env = "MINEPENGE_LISTEN_ADDR")]
        addr: Option<String>,
        /// Refresh the served articles from --api-url with this interval
        #[arg(long)]
        refresh_interval: Option<HumanDuration>,
    },
}

#[derive(clap::Args, Debug)]
pub struct QueryArgs {
    #[arg(long)]
    topic: Option<String>,
    #[arg(long)]
    audience: Option<String>,
    #[arg(long)]
    difficulty: Option<Difficulty>,
    #[arg(long)]
    source: Option<String>,
    /// Free-text search over title, summary and tags
    #[arg(long, short = 'q')]
    search: Option<String>,
    /// Require every search word (all) or any of them (any)
    #[arg(long, default_value = "any")]
    mode: SearchMode,
    #[arg(long)]
    tag: Option<String>,
    #[arg(long)]
    min_score: Option<f64>,
    /// newest, oldest, relevance or source
    #[arg(long)]
    sort: Option<SortOrder>,
    #[arg(long, default_value_t = 1)]
    page: i64,
    #[arg(long)]
    page_size: Option<i64>,
    /// Print the page as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn config(&self) -> Config {
        Config::default()
            .with_api_url(self.api_url.clone().unwrap_or_else(|| DEFAULT_API_URL.to_string()))
            .with_dataset(self.dataset.clone())
            .with_topics(self.topics.clone())
            .with_cache_ttl(self.cache_ttl.into())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    let mut config = cli.config();
    let ctx = Context::load(&config)?;

    match cli.command {
        Commands::Query(args) => commands::query(&ctx, args)?,
        Commands::Show { id } => commands::show(&ctx, &id)?,
        Commands::Filters => commands::filters(&ctx)?,
        Commands::Stats => commands::stats(&ctx)?,
        Commands::Refresh { output, interval } => commands::refresh(&ctx, output, interval).await?,
        Commands::Scrape { sources } => commands::scrape(&ctx, sources).await?,
        Commands::Feedback { id, rating, comment } => {
            commands::feedback(&ctx, &id, rating, comment).await?
        }
        Commands::Serve { addr, refresh_interval } => {
            if let Some(addr) = addr {
                config.listen_addr = addr;
            }
            // Without an explicit API URL the server only serves the local collection
            commands::serve(ctx, &config, cli.api_url.is_some(), refresh_interval).await?
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query() {
        let cli = Cli::try_parse_from([
            "minepenge", "query", "--topic", "Pension", "--difficulty", "øvet", "--sort", "relevance",
            "--page-size", "5",
        ])
        .unwrap();
        match cli.command {
            Commands::Query(args) => {
                assert_eq!(args.topic.as_deref(), Some("Pension"));
                assert_eq!(args.difficulty, Some(Difficulty::Oevet));
                assert_eq!(args.sort, Some(SortOrder::Relevance));
                assert_eq!(args.page, 1);
                assert_eq!(args.page_size, Some(5));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_invalid_enum_values_are_rejected() {
        assert!(Cli::try_parse_from(["minepenge", "query", "--difficulty", "ekspert"]).is_err());
        assert!(Cli::try_parse_from(["minepenge", "feedback", "nn-002", "meh"]).is_err());
        assert!(Cli::try_parse_from(["minepenge", "refresh", "--interval", "5w"]).is_err());
    }

    #[test]
    fn test_parse_refresh_and_serve() {
        let cli = Cli::try_parse_from(["minepenge", "refresh", "-o", "ud.json", "--interval", "10m"]).unwrap();
        match cli.command {
            Commands::Refresh { output, interval } => {
                assert_eq!(output, Some(PathBuf::from("ud.json")));
                assert_eq!(interval.map(|d| d.0.as_secs()), Some(600));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::try_parse_from(["minepenge", "serve", "--refresh-interval", "1h"]).unwrap();
        match cli.command {
            Commands::Serve { refresh_interval, .. } => {
                assert_eq!(refresh_interval.map(|d| d.0.as_secs()), Some(3600));
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_config_from_args() {
        let cli = Cli::try_parse_from([
            "minepenge", "--api-url", "http://backend:9000", "--cache-ttl", "10m", "stats",
        ])
        .unwrap();
        let config = cli.config();
        assert_eq!(config.api_url, "http://backend:9000");
        assert_eq!(config.cache_ttl, std::time::Duration::from_secs(600));
    }
}
