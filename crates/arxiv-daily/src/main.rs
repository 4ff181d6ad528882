//! arXiv Daily - Entry Point
//!
//! Runs one crawl and exits. Meant to be invoked by a scheduled CI job.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use arxiv_daily::ci::LogGroups;
use arxiv_daily::config::{Config, is_valid_category};
use arxiv_daily::Crawler;

#[derive(Parser, Debug)]
#[command(name = "arxiv-daily")]
#[command(about = "Fetch new arXiv papers into the daily archive")]
#[command(version)]
struct Cli {
    /// Project root holding config.yaml and archive/
    #[arg(long, default_value = ".", env = "ARXIV_DAILY_ROOT")]
    root: PathBuf,

    /// Days window; overrides config.yaml
    #[arg(long)]
    days: Option<u32>,

    /// Output file (default: archive/YYYYMMDD/raw/arxiv_papers_YYYYMMDD.json)
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// Comma-separated categories to crawl instead of the default set
    #[arg(long, value_delimiter = ',', value_parser = parse_category)]
    categories: Vec<String>,

    /// arXiv API base URL
    #[arg(long, env = "ARXIV_API_URL")]
    api_url: Option<String>,

    /// Ignore and do not update crawl state; query whole days
    #[arg(long)]
    stateless: bool,

    /// Print GitHub Actions log groups even outside Actions
    #[arg(long)]
    github_groups: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn parse_category(value: &str) -> Result<String, String> {
    let value = value.trim();
    if is_valid_category(value) {
        Ok(value.to_string())
    } else {
        Err(format!("'{value}' is not an arXiv category (e.g. cs, q-bio, cs.LG)"))
    }
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

impl Cli {
    fn into_config(self) -> Config {
        let mut config = Config::new(self.root);
        if let Some(url) = self.api_url {
            config.api_url = url;
        }
        if !self.categories.is_empty() {
            config.categories = self.categories;
        }
        config.days_override = self.days;
        config.output_file = self.output;
        config.stateless = self.stateless;
        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    let groups = if cli.github_groups { LogGroups::new(true) } else { LogGroups::detect() };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        root = %cli.root.display(),
        stateless = cli.stateless,
        "Starting arXiv crawl"
    );

    let crawler = Crawler::new(cli.into_config())?.with_log_groups(groups);
    let report = crawler.run(chrono::Utc::now()).await?;

    for failed in report.failed_categories() {
        tracing::warn!(
            category = %failed.category,
            error = failed.error.as_deref().unwrap_or_default(),
            "Category incomplete"
        );
    }

    tracing::info!(
        total = report.total(),
        output = ?report.output,
        "Crawl finished"
    );

    Ok(())
}
