//! Run orchestration: resolve list, then per article fetch, extract, download, pack, record.
//!
//! Everything is sequential. Any `PipelineError` ends the run; the ledger then holds
//! exactly the articles whose archives were written.

use crate::cbz::{write_cbz, CbzError, ComicInfo, ComicSettings};
use crate::download::DownloadManager;
use crate::extract;
use crate::ledger::{Ledger, LedgerError};
use crate::model::{ArticleId, ArticleRecord};
use crate::source::{ContentSource, SourceError};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Could not resolve reading list: {0}")]
    ResolveList(#[source] SourceError),

    #[error("Could not fetch article {id}: {source}")]
    FetchArticle {
        id: ArticleId,
        #[source]
        source: SourceError,
    },

    #[error("Article {id} ({title}) has no downloadable images; nothing to pack.")]
    NoPages { id: ArticleId, title: String },

    #[error("Could not pack {path}: {source}")]
    Pack {
        path: PathBuf,
        #[source]
        source: CbzError,
    },

    #[error("{0}")]
    Ledger(#[from] LedgerError),

    #[error("Cannot create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where files go and how archives are tagged, plus optional progress callbacks.
pub struct RunOptions<'a> {
    /// Staging root; images land in `<root>/<list>/<index>-<article>/<n>.jpg`.
    pub download_root: PathBuf,
    /// Archive root; archives land in `<root>/<list>/<index>-<article>.cbz`.
    pub output_root: PathBuf,
    pub comic: ComicSettings,
    /// Called before each article is fetched with (run index, article id).
    pub on_article: Option<&'a dyn Fn(u32, &ArticleId)>,
    /// Called before each image download with (1-based position, total).
    pub on_image: Option<&'a dyn Fn(u32, u32)>,
}

impl RunOptions<'_> {
    pub fn new(download_root: impl Into<PathBuf>, output_root: impl Into<PathBuf>) -> Self {
        RunOptions {
            download_root: download_root.into(),
            output_root: output_root.into(),
            comic: ComicSettings::default(),
            on_article: None,
            on_image: None,
        }
    }
}

/// What a finished run did.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub list_name: String,
    /// Archives written this run, in list order.
    pub packed: Vec<PathBuf>,
    /// Articles skipped because the ledger already had them.
    pub skipped: usize,
    /// Image downloads that failed across all packed articles.
    pub failed_images: usize,
}

/// Filesystem-safe title: space to `_`, `:` to `：`, `?` to `？`.
///
/// Nothing else is rewritten. A `/` stays and splits the title into nested path
/// components; `run_list` warns when that happens.
pub fn sanitize_title(title: &str) -> String {
    title.replace(' ', "_").replace(':', "：").replace('?', "？")
}

/// Process every article of `list_id` that is not yet in `ledger`.
///
/// Articles are numbered from 1 in the order they are processed in this run.
pub fn run_list(
    list_id: &str,
    source: &mut dyn ContentSource,
    downloads: &mut DownloadManager,
    ledger: &mut Ledger,
    options: &RunOptions<'_>,
) -> Result<RunSummary, PipelineError> {
    let list = source
        .resolve_list(list_id)
        .map_err(PipelineError::ResolveList)?;
    info!(list = %list.name, articles = list.articles.len(), "resolved reading list");

    let series = sanitize_title(&list.name);
    warn_if_nested(&series, "list");
    let mut summary = RunSummary {
        list_name: list.name.clone(),
        ..RunSummary::default()
    };
    let mut index = 1u32;

    for id in &list.articles {
        if ledger.contains(id) {
            info!(article = %id, "already downloaded, skipping");
            summary.skipped += 1;
            continue;
        }
        if let Some(cb) = options.on_article {
            cb(index, id);
        }
        let article = source
            .fetch_article(id)
            .map_err(|e| PipelineError::FetchArticle {
                id: id.clone(),
                source: e,
            })?;
        let record = extract::to_record(&article);
        info!(article = %id, title = %record.title, images = record.images.len(), "downloading article");

        let (archive, failed) = process_article(&record, index, &series, downloads, options)?;
        ledger.record(record.id.clone())?;
        info!(article = %id, path = %archive.display(), "archive written");

        summary.packed.push(archive);
        summary.failed_images += failed;
        index += 1;
    }

    Ok(summary)
}

/// Download one article's images, pack them, and clean up the staging directory.
/// Returns the archive path and the number of failed image downloads.
fn process_article(
    record: &ArticleRecord,
    index: u32,
    series: &str,
    downloads: &mut DownloadManager,
    options: &RunOptions<'_>,
) -> Result<(PathBuf, usize), PipelineError> {
    let title = sanitize_title(&record.title);
    warn_if_nested(&title, record.id.as_str());
    let stem = format!("{}-{}", index, title);
    let work_dir = options.download_root.join(series).join(&stem);
    create_dir(&work_dir)?;

    let total = record.images.len() as u32;
    let mut pages = Vec::with_capacity(record.images.len());
    let mut failed = 0usize;
    for (n, url) in record.images.iter().enumerate() {
        if let Some(cb) = options.on_image {
            cb(n as u32 + 1, total);
        }
        let dest = work_dir.join(format!("{}.jpg", n));
        if downloads.fetch(&dest, url).is_present() {
            pages.push(dest);
        } else {
            failed += 1;
        }
    }

    if pages.is_empty() {
        return Err(PipelineError::NoPages {
            id: record.id.clone(),
            title: record.title.clone(),
        });
    }
    if failed > 0 {
        warn!(
            article = %record.id,
            packed = pages.len(),
            failed,
            "some images could not be downloaded; packing the rest"
        );
    }

    let out_dir = options.output_root.join(series);
    create_dir(&out_dir)?;
    let archive = out_dir.join(format!("{}.cbz", stem));
    let info = ComicInfo {
        title,
        series: series.to_string(),
        settings: options.comic.clone(),
    };
    write_cbz(&pages, &info, &archive).map_err(|e| PipelineError::Pack {
        path: archive.clone(),
        source: e,
    })?;

    if let Err(e) = std::fs::remove_dir_all(&work_dir) {
        warn!(path = %work_dir.display(), error = %e, "could not remove staging directory");
    }
    Ok((archive, failed))
}

fn warn_if_nested(name: &str, owner: &str) {
    if name.contains('/') {
        warn!(owner, name, "title contains '/', which is kept as a path separator");
    }
}

fn create_dir(path: &Path) -> Result<(), PipelineError> {
    std::fs::create_dir_all(path).map_err(|e| PipelineError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}
