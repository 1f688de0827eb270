use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};
use crate::format::{Literal, StoryGraph};
use crate::runtime::{Engine, Phase};

/// Single namespaced key under which the whole progress collection lives
/// in the host's key-value surface.
pub const STORAGE_KEY: &str = "vignette.progress";

/// Abstraction over system time, so tests can pin timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Host-provided durable key-value surface. The store tolerates every
/// method failing; persistence errors never take the session down.
pub trait ProgressBackend: Send + Sync {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()>;
    fn delete(&mut self, key: &str) -> anyhow::Result<()>;
}

/// In-memory backend; the reference implementation and the test double.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: BTreeMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressBackend for MemoryBackend {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn write(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Durable snapshot of one story session. One record per story id,
/// overwritten on each save.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryProgress {
    pub story_id: String,
    pub node_id: String,
    pub phase: Phase,
    pub variables: BTreeMap<String, Literal>,
    pub visited: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
    /// Completion estimate, 0-100.
    pub chapter_progress: u8,
}

/// Progress records for every story, mirrored in memory and flushed to
/// the backend as one collection.
pub struct ProgressStore<B: ProgressBackend> {
    backend: B,
    clock: Box<dyn Clock>,
    entries: BTreeMap<String, StoryProgress>,
}

impl<B: ProgressBackend> ProgressStore<B> {
    pub fn open(backend: B) -> Self {
        Self::with_clock(backend, Box::new(SystemClock))
    }

    /// The collection is parsed once here; an unreadable medium logs a
    /// warning and starts empty rather than failing the session.
    pub fn with_clock(backend: B, clock: Box<dyn Clock>) -> Self {
        let entries = match backend.read(STORAGE_KEY) {
            Ok(Some(raw)) => match serde_json::from_str(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    log::warn!("stored progress is unreadable, starting empty: {}", e);
                    BTreeMap::new()
                }
            },
            Ok(None) => BTreeMap::new(),
            Err(e) => {
                log::warn!(
                    "persistence medium unavailable at startup, starting empty: {}",
                    e
                );
                BTreeMap::new()
            }
        };

        Self {
            backend,
            clock,
            entries,
        }
    }

    /// Capture the engine's position and overwrite any prior record for
    /// its story. The in-memory record stands even when the flush fails.
    pub fn save(&mut self, engine: &Engine) -> Result<StoryProgress> {
        let record = StoryProgress {
            story_id: engine.story_id().to_string(),
            node_id: engine.current_node().to_string(),
            phase: engine.phase(),
            variables: engine.variables().snapshot(),
            visited: engine.visited().clone(),
            timestamp: self.clock.now(),
            chapter_progress: engine.progress_percent(),
        };
        self.entries
            .insert(record.story_id.clone(), record.clone());
        self.flush()?;
        Ok(record)
    }

    pub fn load(&self, story_id: &str) -> Option<&StoryProgress> {
        self.entries.get(story_id)
    }

    /// Rebuild an engine from the stored record against `graph`.
    pub fn restore(&self, story_id: &str, graph: Arc<StoryGraph>) -> Result<Engine> {
        let record = self
            .entries
            .get(story_id)
            .ok_or_else(|| EngineError::NoSavedProgress(story_id.to_string()))?;
        Engine::restore_at(
            story_id,
            graph,
            &record.node_id,
            record.phase,
            record.variables.clone(),
            record.visited.clone(),
        )
    }

    /// Delete the stored record, dropping the backend key entirely once
    /// the collection is empty.
    pub fn clear(&mut self, story_id: &str) -> Result<()> {
        if self.entries.remove(story_id).is_none() {
            return Ok(());
        }
        if self.entries.is_empty() {
            self.backend
                .delete(STORAGE_KEY)
                .map_err(EngineError::PersistenceUnavailable)
        } else {
            self.flush()
        }
    }

    fn flush(&mut self) -> Result<()> {
        let raw = serde_json::to_string(&self.entries)
            .map_err(|e| EngineError::PersistenceUnavailable(e.into()))?;
        self.backend
            .write(STORAGE_KEY, &raw)
            .map_err(EngineError::PersistenceUnavailable)
    }
}
