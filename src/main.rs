use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use feedhub::config::{FeedList, Settings};
use feedhub::feed::{collect, FeedFetcher};
use feedhub::render;
use feedhub::report::CollectionReport;
use feedhub::util::atomic_write;

#[derive(Parser, Debug)]
#[command(
    name = "feedhub",
    about = "Collects RSS/Atom feeds and publishes them as a static site, RSS feeds and a Markdown summary"
)]
struct Args {
    /// Settings file (TOML); defaults apply when it does not exist
    #[arg(long, global = true, value_name = "FILE", default_value = "feedhub.toml")]
    settings: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch every configured feed and write the collection report
    Collect {
        /// Feed list (JSON)
        #[arg(long, value_name = "FILE")]
        config: PathBuf,

        /// Where to write the collection report (JSON)
        #[arg(long, value_name = "FILE")]
        output: PathBuf,

        /// Look-back window in hours (never less than 720)
        #[arg(long, default_value_t = 720)]
        hours: u32,
    },

    /// Render the Markdown summary and/or the HTML site from a report
    Summary {
        /// Collection report written by `collect`
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Markdown summary output path
        #[arg(long, value_name = "FILE")]
        markdown: Option<PathBuf>,

        /// Directory for the HTML pages
        #[arg(long, value_name = "DIR")]
        output_dir: Option<PathBuf>,

        /// HTML page template
        #[arg(long, value_name = "FILE", default_value = "assets/template.html")]
        template: PathBuf,
    },

    /// Render the RSS 2.0 feeds from a report
    Rss {
        /// Collection report written by `collect`
        #[arg(long, value_name = "FILE")]
        input: PathBuf,

        /// Directory for feed.xml and the per-feed documents
        #[arg(long, value_name = "DIR")]
        output_dir: PathBuf,

        /// Public base URL; overrides `base_url` from the settings file
        #[arg(long)]
        base_url: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    if let Err(e) = run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run(args: Args) -> Result<()> {
    let settings = Settings::load(&args.settings)
        .with_context(|| format!("Failed to load settings from {}", args.settings.display()))?;

    match args.command {
        Command::Collect {
            config,
            output,
            hours,
        } => run_collect(&settings, &config, &output, hours).await,
        Command::Summary {
            input,
            markdown,
            output_dir,
            template,
        } => run_summary(&settings, &input, markdown.as_deref(), output_dir.as_deref(), &template),
        Command::Rss {
            input,
            output_dir,
            base_url,
        } => {
            let base_url = base_url.unwrap_or_else(|| settings.base_url.clone());
            let site = render::rss::Site {
                title: &settings.site_title,
                description: &settings.site_description,
                base_url: &base_url,
            };
            run_rss(&site, &input, &output_dir)
        }
    }
}

async fn run_collect(settings: &Settings, config: &Path, output: &Path, hours: u32) -> Result<()> {
    let feed_list = FeedList::load(config)?;

    let fetcher = FeedFetcher::new(settings).context("Failed to build HTTP client")?;
    let report = collect(&fetcher, &feed_list, Utc::now(), hours).await;

    report
        .save(output)
        .with_context(|| format!("Failed to write results to {}", output.display()))?;

    let summary = &report.summary;
    tracing::info!(path = %output.display(), "Results saved");
    tracing::info!(
        total_feeds = summary.total_feeds,
        successful_feeds = summary.successful_feeds,
        failed_feeds = summary.failed_feeds,
        total_articles = summary.total_articles,
        "Collection summary"
    );
    Ok(())
}

fn run_summary(
    settings: &Settings,
    input: &Path,
    markdown: Option<&Path>,
    output_dir: Option<&Path>,
    template: &Path,
) -> Result<()> {
    let report = CollectionReport::load(input)?;

    if let Some(md_path) = markdown {
        let md = render::markdown::render_markdown(&report, &settings.site_title);
        atomic_write(md_path, md.as_bytes())
            .with_context(|| format!("Failed to write {}", md_path.display()))?;
        tracing::info!(path = %md_path.display(), "Markdown summary written");
    }

    if let Some(out_dir) = output_dir {
        let template = render::html::load_template(template)?;
        let pages = render::html::write_site(&report, &template, out_dir, &settings.site_title)
            .context("Failed to write HTML site")?;
        tracing::info!(dir = %out_dir.display(), pages = pages.len(), "HTML site written");
    }

    if markdown.is_none() && output_dir.is_none() {
        tracing::warn!("Nothing to do: pass --markdown and/or --output-dir");
    }
    Ok(())
}

fn run_rss(site: &render::rss::Site<'_>, input: &Path, output_dir: &Path) -> Result<()> {
    let report = CollectionReport::load(input)?;
    let feeds = render::rss::write_feeds(&report, output_dir, site)
        .context("Failed to write RSS feeds")?;
    tracing::info!(dir = %output_dir.display(), feeds = feeds.len(), "RSS feeds written");
    Ok(())
}
