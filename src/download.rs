//! Image download manager: fetch once, skip files already on disk, pause after each download.

use crate::source::SourceError;
use rand::Rng;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

/// Default pause after a successful download, in milliseconds.
pub const DEFAULT_DELAY_MIN_MS: u64 = 1000;
pub const DEFAULT_DELAY_MAX_MS: u64 = 2000;

/// Source of image bytes. One call is one network request; implementations do not retry.
pub trait ImageFetch {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, SourceError>;
}

/// Pause taken after every successful download so the origin's rate limiting is not tripped.
pub trait Pacing {
    fn pause(&mut self);
}

/// Sleep a uniformly random duration in `[min, max]`.
#[derive(Debug, Clone)]
pub struct RandomDelay {
    min: Duration,
    max: Duration,
}

impl RandomDelay {
    /// Bounds are swapped if given in the wrong order.
    pub fn new(min: Duration, max: Duration) -> Self {
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    fn pick(&self) -> Duration {
        let min = self.min.as_millis() as u64;
        let max = self.max.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(min..=max))
    }
}

impl Default for RandomDelay {
    fn default() -> Self {
        Self::from_millis(DEFAULT_DELAY_MIN_MS, DEFAULT_DELAY_MAX_MS)
    }
}

impl Pacing for RandomDelay {
    fn pause(&mut self) {
        std::thread::sleep(self.pick());
    }
}

/// No pause at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDelay;

impl Pacing for NoDelay {
    fn pause(&mut self) {}
}

/// Result of one download attempt.
#[derive(Debug)]
pub enum FetchOutcome {
    Downloaded,
    /// Destination already existed; nothing was fetched.
    Skipped,
    /// Fetch or write failed; nothing was left at the destination.
    Failed(DownloadFailure),
}

impl FetchOutcome {
    /// True when the destination file is present after the call.
    pub fn is_present(&self) -> bool {
        matches!(self, FetchOutcome::Downloaded | FetchOutcome::Skipped)
    }
}

/// Why a download failed.
#[derive(Debug, Error)]
pub enum DownloadFailure {
    #[error("{0}")]
    Fetch(#[source] SourceError),

    #[error("could not save image: {0}")]
    Write(#[source] std::io::Error),
}

/// Sequential downloader. Each successful fetch is followed by a pause from `pacing`.
pub struct DownloadManager {
    fetcher: Box<dyn ImageFetch>,
    pacing: Box<dyn Pacing>,
}

impl DownloadManager {
    pub fn new(fetcher: Box<dyn ImageFetch>, pacing: Box<dyn Pacing>) -> Self {
        Self { fetcher, pacing }
    }

    /// Fetch `url` into `destination` unless a file is already there.
    pub fn fetch(&mut self, destination: &Path, url: &str) -> FetchOutcome {
        if destination.exists() {
            debug!(path = %destination.display(), "already downloaded, skipping");
            return FetchOutcome::Skipped;
        }
        debug!(url, "downloading image");
        let bytes = match self.fetcher.fetch(url) {
            Ok(b) => b,
            Err(e) => {
                warn!(url, error = %e, "image download failed");
                return FetchOutcome::Failed(DownloadFailure::Fetch(e));
            }
        };
        if let Err(e) = write_new_file(destination, &bytes) {
            warn!(url, path = %destination.display(), error = %e, "could not save image");
            return FetchOutcome::Failed(DownloadFailure::Write(e));
        }
        self.pacing.pause();
        FetchOutcome::Downloaded
    }
}

/// Write through a temp file in the same directory, then rename into place.
fn write_new_file(destination: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let dir = match destination.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.flush()?;
    tmp.persist(destination).map_err(|e| e.error)?;
    Ok(())
}
