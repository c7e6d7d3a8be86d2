//! Shape history — a bounded most-recently-used queue of shapes, persisted across runs.
//!
//! The bound is one less than the number of shapes, so the selector always has at least
//! one shape outside the history to pick from.

use std::collections::VecDeque;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

use super::Shape;

/// Maximum number of shapes remembered.
pub const HISTORY_CAPACITY: usize = Shape::ALL.len() - 1;

/// Recently used shapes, oldest first, most recent last.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShapeHistory {
    entries: VecDeque<Shape>,
}

impl ShapeHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a history from oldest-first shapes, keeping only the most recent
    /// `HISTORY_CAPACITY` of them.
    pub fn from_shapes<I: IntoIterator<Item = Shape>>(shapes: I) -> Self {
        let mut history = Self::new();
        for shape in shapes {
            history.append(shape);
        }
        history
    }

    /// Pushes `shape` as the most recent entry, evicting from the front past the bound.
    pub fn append(&mut self, shape: Shape) {
        self.entries.push_back(shape);
        while self.entries.len() > HISTORY_CAPACITY {
            self.entries.pop_front();
        }
    }

    pub fn contains(&self, shape: Shape) -> bool {
        self.entries.contains(&shape)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Shape> + ExactSizeIterator + '_ {
        self.entries.iter()
    }

    pub fn last(&self) -> Option<Shape> {
        self.entries.back().copied()
    }

    /// One slug per line, oldest first, trailing newline.
    pub fn to_file_contents(&self) -> String {
        self.entries
            .iter()
            .map(|s| format!("{}\n", s.slug()))
            .collect()
    }

    /// Parses the persisted form. Blank lines are skipped; any unknown token is an error.
    pub fn parse(contents: &str) -> Result<Self, HistoryError> {
        let shapes = contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.parse::<Shape>())
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| HistoryError::Corrupt(e.to_string()))?;
        Ok(Self::from_shapes(shapes))
    }
}

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("history I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("history file is corrupt: {0}")]
    Corrupt(String),
}

/// Durable storage for the shape history.
///
/// `load` never fails: a missing or unreadable record is an empty history.
pub trait ShapeStore: Send + Sync {
    fn load(&self) -> ShapeHistory;
    fn save(&self, history: &ShapeHistory) -> Result<(), HistoryError>;
}

// ────────────────────────────────────────────────────────────────────────────
// FileShapeStore — plain-text file, one slug per line
// ────────────────────────────────────────────────────────────────────────────

pub struct FileShapeStore {
    path: PathBuf,
}

impl FileShapeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ShapeStore for FileShapeStore {
    fn load(&self) -> ShapeHistory {
        let contents = match fs::read_to_string(&self.path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("No shape history at {}, starting fresh", self.path.display());
                return ShapeHistory::new();
            }
            Err(e) => {
                warn!(
                    "Could not read shape history at {}: {e}, starting fresh",
                    self.path.display()
                );
                return ShapeHistory::new();
            }
        };

        match ShapeHistory::parse(&contents) {
            Ok(history) => history,
            Err(e) => {
                warn!("{e} ({}), starting fresh", self.path.display());
                ShapeHistory::new()
            }
        }
    }

    /// Writes to a temp file in the same directory, then renames over the old record.
    fn save(&self, history: &ShapeHistory) -> Result<(), HistoryError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(history.to_file_contents().as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!(
            "Saved shape history ({} entries) to {}",
            history.len(),
            self.path.display()
        );
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MemoryShapeStore — in-process store for tests and dry runs
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryShapeStore {
    inner: std::sync::Mutex<ShapeHistory>,
}

impl MemoryShapeStore {
    pub fn new(history: ShapeHistory) -> Self {
        Self {
            inner: std::sync::Mutex::new(history),
        }
    }
}

impl ShapeStore for MemoryShapeStore {
    fn load(&self) -> ShapeHistory {
        self.inner
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    fn save(&self, history: &ShapeHistory) -> Result<(), HistoryError> {
        if let Ok(mut guard) = self.inner.lock() {
            *guard = history.clone();
        }
        Ok(())
    }
}
