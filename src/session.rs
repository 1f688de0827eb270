use std::future::Future;
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::error::{EngineError, Result};
use crate::format::Literal;
use crate::loader::GraphCache;
use crate::progress::{ProgressBackend, ProgressStore, StoryProgress};
use crate::runtime::{Engine, StoryState};

/// Host-provided story source. Fetching is the only asynchronous
/// operation in the crate; everything after the bytes arrive is
/// synchronous.
pub trait StorySource: Send + Sync {
    fn fetch(&self, path: &str) -> impl Future<Output = anyhow::Result<Vec<u8>>>;
}

/// Observer callback, invoked synchronously after every accepted
/// transition with the fresh snapshot.
pub type StateListener = Box<dyn FnMut(&StoryState) + Send>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubscriptionId(u64);

/// Handle for an in-flight story load. Completing a stale ticket after a
/// newer `begin_initialize` is rejected instead of clobbering the newer
/// session.
#[derive(Debug)]
pub struct LoadTicket {
    story_id: String,
    epoch: u64,
}

/// Process-wide story session registry, single-slot: at most one live
/// engine at a time, and initializing story B while A is live discards A
/// without saving it.
pub struct SessionHub<S: StorySource, B: ProgressBackend> {
    source: S,
    cache: GraphCache,
    store: ProgressStore<B>,
    active: Option<Engine>,
    last_state: Arc<ArcSwapOption<StoryState>>,
    listeners: Vec<(u64, StateListener)>,
    next_subscription: u64,
    load_epoch: u64,
}

impl<S: StorySource, B: ProgressBackend> SessionHub<S, B> {
    pub fn new(source: S, store: ProgressStore<B>) -> Self {
        Self {
            source,
            cache: GraphCache::new(),
            store,
            active: None,
            last_state: Arc::new(ArcSwapOption::new(None)),
            listeners: Vec::new(),
            next_subscription: 0,
            load_epoch: 0,
        }
    }

    /// Fetch, load and activate a story session, resuming saved progress
    /// when a usable record exists. Publishes the resulting state.
    pub async fn initialize(&mut self, story_id: &str, path: &str) -> Result<()> {
        let ticket = self.begin_initialize(story_id);
        let bytes = self.source.fetch(path).await.map_err(|e| {
            EngineError::MalformedStory(format!("failed to fetch story source: {}", e))
        })?;
        self.finish_initialize(ticket, &bytes)
    }

    /// Blocking wrapper around [`SessionHub::initialize`] for hosts
    /// without an executor.
    pub fn initialize_blocking(&mut self, story_id: &str, path: &str) -> Result<()> {
        pollster::block_on(self.initialize(story_id, path))
    }

    /// Stake out a load slot. Each call supersedes every ticket handed
    /// out before it.
    pub fn begin_initialize(&mut self, story_id: &str) -> LoadTicket {
        self.load_epoch += 1;
        LoadTicket {
            story_id: story_id.to_string(),
            epoch: self.load_epoch,
        }
    }

    /// Complete a load with the fetched source bytes. A superseded
    /// ticket fails with [`EngineError::LoadSuperseded`] and leaves the
    /// newer session untouched.
    pub fn finish_initialize(&mut self, ticket: LoadTicket, source: &[u8]) -> Result<()> {
        if ticket.epoch != self.load_epoch {
            log::debug!("discarding superseded load of story {}", ticket.story_id);
            return Err(EngineError::LoadSuperseded);
        }

        let graph = self.cache.load(&ticket.story_id, source)?;
        let mut engine = match self.store.restore(&ticket.story_id, Arc::clone(&graph)) {
            Ok(engine) => engine,
            Err(EngineError::NoSavedProgress(_)) => Engine::new(&ticket.story_id, graph),
            Err(EngineError::CorruptProgress { story, node }) => {
                log::warn!(
                    "saved progress for {} points at missing node {}, starting fresh",
                    story,
                    node
                );
                Engine::new(&ticket.story_id, graph)
            }
            Err(e) => return Err(e),
        };

        // surface the entry (or resumed) node so observers see text and
        // choices rather than an empty boundary
        if engine.can_continue() {
            engine.advance()?;
        }

        self.active = Some(engine);
        self.publish();
        Ok(())
    }

    /// Forward a continue intent to the live engine and republish.
    pub fn continue_story(&mut self) -> Result<()> {
        let engine = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        engine.advance()?;
        self.publish();
        Ok(())
    }

    /// Forward a choice to the live engine, surface the target node, and
    /// republish. A rejected choice publishes nothing.
    pub fn make_choice(&mut self, index: usize) -> Result<()> {
        let engine = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        engine.choose(index)?;
        if engine.can_continue() {
            engine.advance()?;
        }
        self.publish();
        Ok(())
    }

    /// Reset the live session to its entry node and drop its saved
    /// progress. The in-memory reset holds even when the persistence
    /// medium rejects the deletion; the error is reported after the
    /// fresh state is published.
    pub fn reset_story(&mut self, story_id: &str) -> Result<()> {
        let engine = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        if engine.story_id() != story_id {
            return Err(EngineError::StoryNotActive(story_id.to_string()));
        }

        engine.reset();
        if engine.can_continue() {
            engine.advance()?;
        }
        self.publish();
        self.store.clear(story_id)
    }

    /// Persist the live session. Fails with
    /// [`EngineError::PersistenceUnavailable`] when the medium is down;
    /// the session itself continues either way.
    pub fn save_progress(&mut self, story_id: &str) -> Result<StoryProgress> {
        let engine = self.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        if engine.story_id() != story_id {
            return Err(EngineError::StoryNotActive(story_id.to_string()));
        }
        self.store.save(engine)
    }

    pub fn load_progress(&self, story_id: &str) -> Option<&StoryProgress> {
        self.store.load(story_id)
    }

    /// Register an observer. It receives the latest snapshot immediately
    /// (when one exists) and every subsequent accepted transition, in
    /// application order.
    pub fn subscribe(&mut self, mut listener: StateListener) -> SubscriptionId {
        let id = self.next_subscription;
        self.next_subscription += 1;

        if let Some(state) = self.last_state.load_full() {
            listener(&state);
        }
        self.listeners.push((id, listener));
        SubscriptionId(id)
    }

    pub fn unsubscribe(&mut self, id: SubscriptionId) {
        self.listeners.retain(|(key, _)| *key != id.0);
    }

    /// Latest published snapshot, readable without subscribing.
    pub fn state(&self) -> Option<Arc<StoryState>> {
        self.last_state.load_full()
    }

    pub fn active_story(&self) -> Option<&str> {
        self.active.as_ref().map(|engine| engine.story_id())
    }

    /// Direct variable read on the live engine, bypassing node logic.
    pub fn get_variable(&self, name: &str) -> Result<Literal> {
        let engine = self.active.as_ref().ok_or(EngineError::NoActiveSession)?;
        Ok(engine.get_variable(name))
    }

    /// Direct variable write on the live engine; visible to the next
    /// guard evaluation. Does not publish.
    pub fn set_variable(&mut self, name: &str, value: Literal) -> Result<()> {
        let engine = self.active.as_mut().ok_or(EngineError::NoActiveSession)?;
        engine.set_variable(name, value);
        Ok(())
    }

    fn publish(&mut self) {
        let Some(engine) = &self.active else {
            return;
        };
        let state = engine.state();
        self.last_state.store(Some(Arc::new(state.clone())));
        for (_, listener) in &mut self.listeners {
            listener(&state);
        }
    }
}
