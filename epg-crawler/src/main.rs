use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{ArgAction, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

use epg_crawler::clock::SystemClock;
use epg_crawler::config::{DEFAULT_BASE_URL, DEFAULT_DATA_PATH, EpgConfig};
use epg_crawler::coordinator::SingleFlight;
use epg_crawler::crawl::ProgramCrawler;
use epg_crawler::domain::{WindowAnchor, parse_date};
use epg_crawler::fanout::FanOutCrawler;
use epg_crawler::lookup::LookupService;
use epg_crawler::source::{HtmlParser, HttpFetcher, MockFetcher, PageFetcher};
use epg_crawler::stations::StationCache;
use epg_crawler::store::{JsonFileStore, Store};

/// Crawl and cache TV program guides.
#[derive(Debug, Parser)]
#[command(name = "epg-crawler", version, about)]
struct Cli {
    /// Guide landing page
    #[arg(long, env = "EPG_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Store snapshot file
    #[arg(long, env = "EPG_DATA_PATH", default_value = DEFAULT_DATA_PATH)]
    data_path: PathBuf,

    /// Per-station timeout for crawl-all, in seconds
    #[arg(long, env = "EPG_TASK_TIMEOUT_SECS", default_value_t = 600)]
    task_timeout_secs: u64,

    /// Crawlable window anchor: "week" or "rolling"
    #[arg(long, env = "EPG_WINDOW_ANCHOR", default_value = "week")]
    window_anchor: WindowAnchor,

    /// HTTP request timeout, in seconds
    #[arg(long, default_value_t = 30)]
    request_timeout_secs: u64,

    #[arg(long)]
    user_agent: Option<String>,

    /// Keep raw copies of crawled pages here, one directory per date
    #[arg(long, env = "EPG_ARCHIVE_DIR")]
    archive_dir: Option<PathBuf>,

    /// Serve pages from a directory instead of the network
    #[arg(long)]
    mock_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Crawl the station list from the landing page
    Seed,
    /// Print one station's program table for a date
    Query {
        /// Canonical or display name
        station: String,
        /// Date as yyyy-MM-dd
        date: String,
        /// Category, for resolving display names
        #[arg(long)]
        classify: Option<String>,
    },
    /// Crawl every known station for a date
    CrawlAll {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },
    /// List known stations
    Stations,
}

impl Cli {
    fn config(&self) -> EpgConfig {
        let config = EpgConfig::new(&self.base_url)
            .with_data_path(&self.data_path)
            .with_request_timeout(self.request_timeout_secs)
            .with_task_timeout(Duration::from_secs(self.task_timeout_secs))
            .with_window_anchor(self.window_anchor);
        let config = match &self.user_agent {
            Some(user_agent) => config.with_user_agent(user_agent),
            None => config,
        };
        match &self.archive_dir {
            Some(dir) => config.with_archive_dir(dir),
            None => config,
        }
    }

    fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}

fn setup_logging(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("epg_crawler={}", cli.log_level())));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr)
                .compact(),
        )
        .init();
}

/// Write one JSON document per line to stdout.
fn print_lines<T: Serialize>(items: &[T]) -> Result<()> {
    let mut out = std::io::stdout().lock();
    for item in items {
        serde_json::to_writer(&mut out, item)?;
        writeln!(out)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(&cli);
    let config = cli.config();

    let store: Arc<dyn Store> = Arc::new(
        JsonFileStore::open(&config.data_path)
            .await
            .with_context(|| format!("Failed to open store at {:?}", config.data_path))?,
    );
    let fetcher: Arc<dyn PageFetcher> = match &cli.mock_dir {
        Some(dir) => Arc::new(MockFetcher::from_dir(dir).context("Failed to load mock pages")?),
        None => Arc::new(
            HttpFetcher::new(config.fetcher_config()).context("Failed to create HTTP client")?,
        ),
    };
    let parser = Arc::new(HtmlParser::with_defaults()?);
    let stations = StationCache::load(store.clone())
        .await
        .context("Failed to load stations")?;

    let crawler = ProgramCrawler::new(
        fetcher,
        parser,
        stations.clone(),
        store,
        Arc::new(SystemClock),
        &config.base_url,
    );
    let crawler = Arc::new(match &config.archive_dir {
        Some(dir) => crawler.with_archive_dir(dir),
        None => crawler,
    });

    if stations.is_empty().await && !matches!(cli.command, Command::Seed) {
        info!("No stations stored, seeding from {}", config.base_url);
        crawler.crawl_stations().await.context("Failed to seed stations")?;
    }

    let lookup = LookupService::new(crawler.clone(), Arc::new(SingleFlight::new()))
        .with_anchor(config.window_anchor);

    match &cli.command {
        Command::Seed => {
            let inserted = crawler.crawl_stations().await?;
            info!(inserted, total = stations.len().await, "Seeded stations");
        }
        Command::Query {
            station,
            date,
            classify,
        } => match lookup
            .query_program_table(station, classify.as_deref(), date)
            .await?
        {
            Some(entries) => print_lines(&entries)?,
            None => anyhow::bail!("No program table for {station} on {date}"),
        },
        Command::CrawlAll { date } => {
            let fanout = FanOutCrawler::new(Arc::new(lookup), config.fanout_config());
            let entries = fanout
                .crawl_all_stations(&stations.get_all().await, *date)
                .await;
            print_lines(&entries)?;
        }
        Command::Stations => print_lines(&stations.get_all().await)?,
    }

    Ok(())
}
