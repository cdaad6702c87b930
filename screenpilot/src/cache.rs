//! Durable cache of previously observed anchor and trigger rectangles.
//!
//! Full-frame OCR is expensive; once a screen's anchor has been seen, later
//! confirmations only OCR a small crop around its last-known rectangle. The
//! cache persists across process restarts as one JSON document per screen,
//! and is cleared wholesale whenever the display geometry changes, because
//! every cached pixel rectangle is resolution-dependent.

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::errors::NavigationError;
use crate::geometry::Rect;
use crate::graph::{ScreenDefinition, ScreenGraph};

const GEOMETRY_FILE: &str = "geometry.json";
const SCREEN_DOC_SUFFIX: &str = ".screen.json";

/// Cached rectangles for one screen: the anchor and each outgoing edge's
/// trigger text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenPositions {
    pub anchor: Option<Rect>,
    #[serde(default)]
    pub triggers: BTreeMap<String, Rect>,
}

/// The display geometry the cached rectangles were observed under.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct GeometryStamp {
    width: u32,
    height: u32,
    scale: f64,
}

impl GeometryStamp {
    fn of(config: &SessionConfig) -> Self {
        Self {
            width: config.viewport_width,
            height: config.viewport_height,
            scale: config.scale_factor,
        }
    }
}

/// Persisted mapping from screen name to its last-observed rectangles.
///
/// Execution is single-threaded, so no locking; writes go through a
/// write-to-temp-then-rename so a crash mid-write cannot corrupt a
/// previously-valid document.
#[derive(Debug)]
pub struct AnchorCache {
    dir: PathBuf,
    entries: HashMap<String, ScreenPositions>,
}

impl AnchorCache {
    /// Open (or create) the cache directory for this session.
    ///
    /// If the persisted geometry stamp differs from the session's geometry,
    /// every cached document is deleted before anything is loaded; cached
    /// rectangles from another resolution are meaningless. Documents for
    /// screens the graph no longer defines are ignored.
    pub fn open(
        dir: impl AsRef<Path>,
        config: &SessionConfig,
        graph: &ScreenGraph,
    ) -> Result<Self, NavigationError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            NavigationError::CacheError(format!("cannot create {}: {e}", dir.display()))
        })?;

        let mut cache = Self {
            dir,
            entries: HashMap::new(),
        };

        let current = GeometryStamp::of(config);
        match cache.load_stamp() {
            Some(saved) if saved == current => cache.load_documents(graph),
            saved => {
                if let Some(saved) = saved {
                    info!(
                        old_width = saved.width,
                        old_height = saved.height,
                        new_width = current.width,
                        new_height = current.height,
                        "display geometry changed, invalidating anchor cache"
                    );
                }
                cache.remove_documents()?;
                cache.write_stamp(&current)?;
            }
        }
        Ok(cache)
    }

    /// True iff the screen's anchor rectangle and every edge's trigger
    /// rectangle are cached, i.e. recognition can skip the full-frame scan.
    pub fn is_position_known(&self, screen: &ScreenDefinition) -> bool {
        let Some(positions) = self.entries.get(&screen.name) else {
            return false;
        };
        positions.anchor.is_some()
            && screen
                .edges
                .iter()
                .all(|e| positions.triggers.contains_key(&e.trigger_text))
    }

    pub fn anchor_rect(&self, screen: &str) -> Option<Rect> {
        self.entries.get(screen).and_then(|p| p.anchor)
    }

    pub fn trigger_rect(&self, screen: &str, trigger_text: &str) -> Option<Rect> {
        self.entries
            .get(screen)
            .and_then(|p| p.triggers.get(trigger_text))
            .copied()
    }

    /// Record the screen's anchor rectangle, overwriting any previous value.
    /// Rectangles drift slightly between runs, so the cache always reflects
    /// the most recent full-scan observation. Returns whether anything
    /// changed.
    pub fn record_anchor(&mut self, screen: &str, rect: Rect) -> bool {
        let positions = self.entries.entry(screen.to_string()).or_default();
        let changed = positions.anchor != Some(rect);
        positions.anchor = Some(rect);
        changed
    }

    /// Record one edge trigger's rectangle, overwriting any previous value.
    /// Returns whether anything changed.
    pub fn record_trigger(&mut self, screen: &str, trigger_text: &str, rect: Rect) -> bool {
        let positions = self.entries.entry(screen.to_string()).or_default();
        let changed = positions.triggers.get(trigger_text) != Some(&rect);
        positions.triggers.insert(trigger_text.to_string(), rect);
        changed
    }

    /// Write the screen's document to disk (temp file + rename).
    pub fn persist(&self, screen: &str) -> Result<(), NavigationError> {
        let Some(positions) = self.entries.get(screen) else {
            return Ok(());
        };
        let json = serde_json::to_vec_pretty(positions)
            .map_err(|e| NavigationError::CacheError(format!("serialize '{screen}': {e}")))?;
        self.write_atomic(&self.document_path(screen), &json)
    }

    /// Drop every cached rectangle, in memory and on disk.
    pub fn invalidate_all(&mut self) -> Result<(), NavigationError> {
        self.entries.clear();
        self.remove_documents()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn document_path(&self, screen: &str) -> PathBuf {
        self.dir.join(format!("{screen}{SCREEN_DOC_SUFFIX}"))
    }

    fn load_documents(&mut self, graph: &ScreenGraph) {
        for screen in graph.all_screens() {
            let path = self.document_path(&screen.name);
            let data = match fs::read(&path) {
                Ok(data) => data,
                // Absence means "not yet cached", not an error.
                Err(_) => continue,
            };
            match serde_json::from_slice::<ScreenPositions>(&data) {
                Ok(positions) => {
                    debug!(screen = %screen.name, "loaded cached positions");
                    self.entries.insert(screen.name.clone(), positions);
                }
                Err(e) => {
                    warn!(screen = %screen.name, error = %e, "discarding unreadable cache document");
                    let _ = fs::remove_file(&path);
                }
            }
        }
    }

    fn remove_documents(&self) -> Result<(), NavigationError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            NavigationError::CacheError(format!("cannot read {}: {e}", self.dir.display()))
        })?;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if name.to_string_lossy().ends_with(SCREEN_DOC_SUFFIX) {
                fs::remove_file(entry.path()).map_err(|e| {
                    NavigationError::CacheError(format!(
                        "cannot remove {}: {e}",
                        entry.path().display()
                    ))
                })?;
            }
        }
        Ok(())
    }

    fn load_stamp(&self) -> Option<GeometryStamp> {
        let data = fs::read(self.dir.join(GEOMETRY_FILE)).ok()?;
        serde_json::from_slice(&data).ok()
    }

    fn write_stamp(&self, stamp: &GeometryStamp) -> Result<(), NavigationError> {
        let json = serde_json::to_vec_pretty(stamp)
            .map_err(|e| NavigationError::CacheError(format!("serialize geometry stamp: {e}")))?;
        self.write_atomic(&self.dir.join(GEOMETRY_FILE), &json)
    }

    fn write_atomic(&self, path: &Path, data: &[u8]) -> Result<(), NavigationError> {
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| NavigationError::CacheError(format!("create temp file: {e}")))?;
        tmp.write_all(data)
            .map_err(|e| NavigationError::CacheError(format!("write temp file: {e}")))?;
        tmp.persist(path).map_err(|e| {
            NavigationError::CacheError(format!("rename into {}: {e}", path.display()))
        })?;
        Ok(())
    }
}
