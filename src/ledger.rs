//! Resume ledger: which articles of a reading list have been fully packed.
//!
//! An id is recorded only after its archive is written, and the whole set is
//! persisted after every record, so an interrupted run redoes at most one article.

use crate::model::ArticleId;
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("Cannot read ledger {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot write ledger {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid ledger {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Cannot encode ledger {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Persistence for ledgers, keyed by reading-list id.
pub trait LedgerStore {
    /// Ids recorded for `list_id`; empty when nothing was stored yet.
    fn load(&self, list_id: &str) -> Result<Vec<ArticleId>, LedgerError>;

    /// Replace the stored ids for `list_id`.
    fn save(&mut self, list_id: &str, ids: &[ArticleId]) -> Result<(), LedgerError>;
}

/// One `<list_id>.json` file per list, holding a JSON array of ids.
#[derive(Debug, Clone)]
pub struct FileLedgerStore {
    dir: PathBuf,
}

impl FileLedgerStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, list_id: &str) -> PathBuf {
        self.dir.join(format!("{}.json", list_id))
    }
}

impl LedgerStore for FileLedgerStore {
    fn load(&self, list_id: &str) -> Result<Vec<ArticleId>, LedgerError> {
        let path = self.path_for(list_id);
        let data = match std::fs::read_to_string(&path) {
            Ok(d) => d,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(LedgerError::Read { path, source: e }),
        };
        serde_json::from_str(&data).map_err(|e| LedgerError::Parse { path, source: e })
    }

    fn save(&mut self, list_id: &str, ids: &[ArticleId]) -> Result<(), LedgerError> {
        let path = self.path_for(list_id);
        let write_err = |e: std::io::Error| LedgerError::Write {
            path: path.clone(),
            source: e,
        };
        std::fs::create_dir_all(&self.dir).map_err(write_err)?;
        let json = serde_json::to_vec(ids).map_err(|e| LedgerError::Encode {
            path: path.clone(),
            source: e,
        })?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(write_err)?;
        tmp.write_all(&json).map_err(write_err)?;
        tmp.as_file_mut().sync_all().map_err(write_err)?;
        tmp.persist(&path).map_err(|e| write_err(e.error))?;
        Ok(())
    }
}

/// In-memory store, shared by clones. Used by tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedgerStore {
    lists: std::rc::Rc<std::cell::RefCell<HashMap<String, Vec<ArticleId>>>>,
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of what was last saved for `list_id`.
    pub fn saved(&self, list_id: &str) -> Option<Vec<ArticleId>> {
        self.lists.borrow().get(list_id).cloned()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn load(&self, list_id: &str) -> Result<Vec<ArticleId>, LedgerError> {
        Ok(self.lists.borrow().get(list_id).cloned().unwrap_or_default())
    }

    fn save(&mut self, list_id: &str, ids: &[ArticleId]) -> Result<(), LedgerError> {
        self.lists
            .borrow_mut()
            .insert(list_id.to_string(), ids.to_vec());
        Ok(())
    }
}

/// Completed articles for one reading list, in completion order.
pub struct Ledger {
    list_id: String,
    done: Vec<ArticleId>,
    store: Box<dyn LedgerStore>,
}

impl Ledger {
    /// Load the ledger for `list_id` from `store`.
    pub fn load(list_id: &str, store: Box<dyn LedgerStore>) -> Result<Self, LedgerError> {
        let done = store.load(list_id)?;
        Ok(Self {
            list_id: list_id.to_string(),
            done,
            store,
        })
    }

    pub fn contains(&self, id: &ArticleId) -> bool {
        self.done.contains(id)
    }

    pub fn ids(&self) -> &[ArticleId] {
        &self.done
    }

    pub fn len(&self) -> usize {
        self.done.len()
    }

    pub fn is_empty(&self) -> bool {
        self.done.is_empty()
    }

    /// Append `id` and persist the full set. No-op if already recorded.
    pub fn record(&mut self, id: ArticleId) -> Result<(), LedgerError> {
        if self.contains(&id) {
            return Ok(());
        }
        self.done.push(id);
        if let Err(e) = self.store.save(&self.list_id, &self.done) {
            self.done.pop();
            return Err(e);
        }
        Ok(())
    }
}
