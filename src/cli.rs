//! CLI parsing and orchestration. Parses args, resolves settings, runs list -> CBZ archives. Maps errors to exit codes.

use crate::cbz::ComicSettings;
use crate::config::{self, Config};
use crate::download::{DownloadManager, RandomDelay, DEFAULT_DELAY_MAX_MS, DEFAULT_DELAY_MIN_MS};
use crate::ledger::{FileLedgerStore, Ledger, LedgerError};
use crate::model::ArticleId;
use crate::pipeline::{run_list, sanitize_title, PipelineError, RunOptions, RunSummary};
use crate::source::bilibili::BilibiliSource;
use crate::source::{parse_list_id, ContentSource, HttpClient, SourceError};
use clap::Parser;
use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_LANGUAGE: &str = "zh";

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Source(#[from] SourceError),

    #[error("{0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Ledger(#[from] LedgerError),
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Source(_) => 2,
            CliRunError::Pipeline(PipelineError::ResolveList(_))
            | CliRunError::Pipeline(PipelineError::FetchArticle { .. }) => 2,
            CliRunError::Pipeline(_) | CliRunError::Ledger(_) => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "rlcbz")]
#[command(about = "Download a Bilibili reading list and pack each article's images into a CBZ archive")]
#[command(
    after_help = "Config file keys (output_dir, download_dir, ledger_dir, user_agent, timeout_secs, delay_min_ms, delay_max_ms, language) are read from ./rlcbz.toml or <config dir>/rlcbz/config.toml. CLI flags override config."
)]
pub struct Args {
    /// Reading list id: 843588, rl843588, or https://www.bilibili.com/read/readlist/rl843588.
    #[arg(long)]
    pub lid: Option<String>,

    /// Archive root. Archives go to <DIR>/<list name>/<n>-<article title>.cbz. Default: current directory.
    #[arg(long, value_name = "DIR")]
    pub cbz: Option<PathBuf>,

    /// Staging root for downloaded images (default ./download).
    #[arg(long, value_name = "DIR")]
    pub download_dir: Option<PathBuf>,

    /// Directory holding the <list id>.json resume ledger (default: current directory).
    #[arg(long, value_name = "DIR")]
    pub ledger_dir: Option<PathBuf>,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Resolve the list only; print its size, how much is already done, and where archives would go.
    #[arg(long)]
    pub dry_run: bool,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and full error chain.
    #[arg(long)]
    pub verbose: bool,
}

/// Effective settings after merging CLI flags, config file and defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Settings {
    output_root: PathBuf,
    download_root: PathBuf,
    ledger_dir: PathBuf,
    user_agent: Option<String>,
    timeout_secs: u64,
    delay_min_ms: u64,
    delay_max_ms: u64,
    language: String,
}

impl Settings {
    fn resolve(args: &Args, config: Option<&Config>) -> Self {
        let output_root = args
            .cbz
            .clone()
            .or_else(|| config.and_then(|c| c.output_dir.clone()))
            .unwrap_or_else(|| PathBuf::from("."));
        let download_root = args
            .download_dir
            .clone()
            .or_else(|| config.and_then(|c| c.download_dir.clone()))
            .unwrap_or_else(|| PathBuf::from("download"));
        let ledger_dir = args
            .ledger_dir
            .clone()
            .or_else(|| config.and_then(|c| c.ledger_dir.clone()))
            .unwrap_or_else(|| PathBuf::from("."));
        let user_agent = args
            .user_agent
            .clone()
            .or_else(|| config.and_then(|c| c.user_agent.clone()));
        let timeout_secs = args
            .timeout
            .or_else(|| config.and_then(|c| c.timeout_secs))
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        let delay_min_ms = config
            .and_then(|c| c.delay_min_ms)
            .unwrap_or(DEFAULT_DELAY_MIN_MS);
        let delay_max_ms = config
            .and_then(|c| c.delay_max_ms)
            .unwrap_or(DEFAULT_DELAY_MAX_MS);
        let language = config
            .and_then(|c| c.language.clone())
            .unwrap_or_else(|| DEFAULT_LANGUAGE.to_string());
        Settings {
            output_root,
            download_root,
            ledger_dir,
            user_agent,
            timeout_secs,
            delay_min_ms,
            delay_max_ms,
            language,
        }
    }
}

/// Install the stderr log subscriber. `RUST_LOG` wins over the flag-derived level.
pub fn init_logging(args: &Args) {
    let default_level = if args.quiet {
        "warn"
    } else if args.verbose {
        "debug"
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn summary_line(summary: &RunSummary) -> String {
    let mut line = format!(
        "{}: packed {} article(s), skipped {} already downloaded",
        summary.list_name,
        summary.packed.len(),
        summary.skipped
    );
    if summary.failed_images > 0 {
        line.push_str(&format!(", {} image(s) failed", summary.failed_images));
    }
    line
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let raw_lid = args.lid.as_deref().ok_or_else(|| {
        CliRunError::InvalidInput(
            "Missing --lid. Pass the reading list id, e.g. --lid 843588".to_string(),
        )
    })?;
    let list_id = parse_list_id(raw_lid).map_err(|e| CliRunError::InvalidInput(e.to_string()))?;

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = Settings::resolve(args, config.as_ref());

    let mut builder = HttpClient::builder().timeout_secs(settings.timeout_secs);
    if let Some(ua) = settings.user_agent.clone() {
        builder = builder.user_agent(ua);
    }
    let client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;
    let mut source = BilibiliSource::new(client.clone());
    let mut ledger = Ledger::load(
        &list_id,
        Box::new(FileLedgerStore::new(&settings.ledger_dir)),
    )?;

    if args.dry_run {
        let list = source.resolve_list(&list_id)?;
        let done = list.articles.iter().filter(|id| ledger.contains(id)).count();
        eprintln!("List: {}", list.name);
        eprintln!("Articles: {}", list.articles.len());
        eprintln!("Already downloaded: {}", done);
        eprintln!(
            "Output: {}",
            settings.output_root.join(sanitize_title(&list.name)).display()
        );
        return Ok(());
    }

    let mut downloads = DownloadManager::new(
        Box::new(client),
        Box::new(RandomDelay::from_millis(
            settings.delay_min_ms,
            settings.delay_max_ms,
        )),
    );

    let progress_state: RefCell<Option<indicatif::ProgressBar>> = RefCell::new(None);
    let current_article: RefCell<String> = RefCell::new(String::new());
    let article_cb = |index: u32, id: &ArticleId| {
        if let Some(pb) = progress_state.borrow_mut().take() {
            pb.finish_and_clear();
        }
        *current_article.borrow_mut() = format!("#{} (cv{})", index, id);
    };
    let image_cb = |n: u32, total: u32| {
        if total == 0 {
            return;
        }
        let mut state = progress_state.borrow_mut();
        let pb = state.get_or_insert_with(|| {
            let bar = indicatif::ProgressBar::new(total as u64);
            if let Ok(style) = indicatif::ProgressStyle::default_bar()
                .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
            {
                bar.set_style(
                    style
                        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                        .progress_chars("█▉▊▋▌▍▎▏ "),
                );
            }
            bar.enable_steady_tick(Duration::from_millis(80));
            bar
        });
        pb.set_position(n as u64);
        pb.set_message(format!(
            "Article {}: image {}/{}",
            current_article.borrow(),
            n,
            total
        ));
    };

    let mut options = RunOptions::new(&settings.download_root, &settings.output_root);
    options.comic = ComicSettings {
        language_iso: settings.language.clone(),
        ..ComicSettings::default()
    };
    if !args.quiet {
        options.on_article = Some(&article_cb);
        options.on_image = Some(&image_cb);
    }

    let result = run_list(&list_id, &mut source, &mut downloads, &mut ledger, &options);

    if let Some(pb) = progress_state.borrow_mut().take() {
        pb.disable_steady_tick();
        pb.finish_and_clear();
    }

    let summary = result?;
    if !args.quiet {
        eprintln!("{}", summary_line(&summary));
        if let Some(parent) = summary.packed.first().and_then(|p| p.parent()) {
            eprintln!("Wrote archives to {}", parent.display());
        }
    }
    Ok(())
}
