mod display;
mod progress;

use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use color_eyre::eyre::{bail, eyre, Result, WrapErr};
use delve_core::llm::{ollama, Provider};
use delve_core::{Config, ReportStore, ResearchError, ResearchRunner};
use tokio::sync::mpsc;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "delve")]
#[command(about = "Turn a topic into a cited research report", long_about = None)]
struct Cli {
    /// Research topic
    topic: Option<String>,

    /// LLM model to use (overrides config)
    #[arg(short, long)]
    model: Option<String>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Regenerate the most recent report
    #[arg(short, long)]
    regenerate: bool,

    /// Comma-separated list of URLs to use as sources (bypasses search)
    #[arg(short, long)]
    sources: Option<String>,

    /// Config file to use instead of the default locations
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    if cli.print_config {
        print!("{}", Config::default_config_string());
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path),
        None => Config::load(),
    }
    .wrap_err("failed to load configuration")?;
    if let Some(model) = &cli.model {
        config.llm.model = Some(model.clone());
    }

    init_logging(&config.output.log_file, cli.verbose)?;

    let store = ReportStore::from_config(&config.output);
    let topic = resolve_topic(&cli, &store)?;
    let manual_urls = cli.sources.as_deref().map(parse_sources).filter(|u| !u.is_empty());

    let provider = Provider::from_config(&config.llm)?;
    if matches!(provider, Provider::Ollama { .. }) {
        ollama::ensure_running(&provider.base_url())
            .await
            .wrap_err("please ensure Ollama is installed and running (ollama serve)")?;
    }

    display::banner(&topic);
    if let Some(urls) = &manual_urls {
        println!("Using {} manually provided sources", urls.len());
    }

    let (gather_tx, gather_rx) = mpsc::unbounded_channel();
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let runner = ResearchRunner::from_config(&config)?
        .with_gather_events(gather_tx)
        .with_progress(progress_tx);

    let reporter = progress::spawn(gather_rx, progress_rx, cli.verbose);
    let result = runner.run(&topic, manual_urls.as_deref()).await;
    // closes both channels so the reporter drains and exits
    drop(runner);
    reporter.await?;

    match result {
        Ok(outcome) => {
            display::outcome(&outcome);
            Ok(())
        }
        Err(ResearchError::NoSources) => {
            display::no_sources_help();
            bail!("failed to gather any sources")
        }
        Err(e) => Err(e.into()),
    }
}

/// File gets everything at the filter level; the terminal only errors unless verbose.
fn init_logging(log_file: &str, verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            "info,delve_core=debug".into()
        } else {
            "info".into()
        }
    });

    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file)
        .wrap_err_with(|| format!("failed to open log file {log_file}"))?;

    let terminal_level = if verbose { LevelFilter::DEBUG } else { LevelFilter::ERROR };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(Arc::new(file)).with_ansi(false))
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_filter(terminal_level),
        )
        .init();

    Ok(())
}

fn resolve_topic(cli: &Cli, store: &ReportStore) -> Result<String> {
    if cli.regenerate {
        let latest = store.require_latest()?;
        println!("Regenerating report from: {}", latest.display());

        if let Some(topic) = clean_topic(cli.topic.as_deref()) {
            return Ok(topic);
        }
        let topic = store.topic_of(&latest)?.ok_or_else(|| {
            eyre!(
                "could not infer the topic from {}; pass it as an argument",
                latest.display()
            )
        })?;
        println!("Inferred topic from previous report: {topic}");
        println!("If this is incorrect, please provide the topic as an argument");
        return Ok(topic);
    }

    match clean_topic(cli.topic.as_deref()) {
        Some(topic) => Ok(topic),
        None => bail!("a research topic is required\n\nUsage: delve \"your research topic\""),
    }
}

fn clean_topic(topic: Option<&str>) -> Option<String> {
    topic.map(str::trim).filter(|t| !t.is_empty()).map(str::to_string)
}

/// Splits `--sources`, dropping blanks.
fn parse_sources(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|u| !u.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sources() {
        assert_eq!(
            parse_sources(" https://a.example , ,https://b.example,"),
            vec!["https://a.example", "https://b.example"]
        );
        assert!(parse_sources(" , ").is_empty());
    }

    #[test]
    fn test_cli_flags() {
        let cli = Cli::try_parse_from(["delve", "rust async", "-m", "llama3", "-v", "-s", "https://a.example"]).unwrap();
        assert_eq!(cli.topic.as_deref(), Some("rust async"));
        assert_eq!(cli.model.as_deref(), Some("llama3"));
        assert!(cli.verbose);
        assert!(!cli.regenerate);
        assert_eq!(cli.sources.as_deref(), Some("https://a.example"));
    }

    #[test]
    fn test_missing_topic_is_an_error() {
        let cli = Cli::try_parse_from(["delve"]).unwrap();
        let store = ReportStore::new("/nonexistent/delve-reports");
        assert!(resolve_topic(&cli, &store).is_err());
    }

    #[test]
    fn test_clean_topic() {
        assert_eq!(clean_topic(Some("  x ")).as_deref(), Some("x"));
        assert_eq!(clean_topic(Some("   ")), None);
    }
}
