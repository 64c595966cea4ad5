//! rlcbz: CLI downloader for Bilibili article reading lists, packing each article's images into CBZ.

pub mod cbz;
pub mod cli;
pub mod config;
pub mod download;
pub mod extract;
pub mod ledger;
pub mod model;
pub mod pipeline;
pub mod source;

// Re-exports for CLI and consumers.
pub use cbz::{write_cbz, CbzError, ComicInfo, ComicSettings, PageType};
pub use download::{DownloadManager, FetchOutcome, ImageFetch, NoDelay, Pacing, RandomDelay};
pub use extract::{extract_images, to_record};
pub use ledger::{FileLedgerStore, Ledger, LedgerError, LedgerStore, MemoryLedgerStore};
pub use model::{ArticleContent, ArticleId, ArticleRecord, ContentNode, NodeKind, ReadingList};
pub use pipeline::{run_list, sanitize_title, PipelineError, RunOptions, RunSummary};
pub use source::bilibili::BilibiliSource;
pub use source::{parse_list_id, ContentSource, HttpClient, HttpClientBuilder, SourceError};
