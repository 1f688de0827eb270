mod eval;
mod state;
mod vars;

pub use self::eval::{eval, render, truthy};
pub use self::state::{Choice, Phase, StoryState};
pub use self::vars::VariableStore;

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::error::{EngineError, Result};
use crate::format::{Assignment, Expr, Literal, StoryGraph};

/// Maps a contiguous display index back to the choice declaration inside
/// the current node.
#[derive(Debug, Clone)]
struct ActiveChoice {
    def_index: usize,
    text: String,
}

/// A live traversal of one story graph.
///
/// Transitions are synchronous and atomic with respect to the variable
/// store; a rejected transition leaves every observable field untouched.
#[derive(Debug)]
pub struct Engine {
    story_id: String,
    graph: Arc<StoryGraph>,
    cursor: String,
    phase: Phase,
    vars: VariableStore,
    current_text: String,
    active_choices: Vec<ActiveChoice>,
    current_tags: Vec<String>,
    visited: BTreeSet<String>,
}

impl Engine {
    /// Start a fresh session at the graph's entry node.
    pub fn new(story_id: &str, graph: Arc<StoryGraph>) -> Self {
        let vars = VariableStore::from_declarations(&graph.variables);
        Self {
            story_id: story_id.to_string(),
            cursor: graph.start.clone(),
            graph,
            phase: Phase::Presenting,
            vars,
            current_text: String::new(),
            active_choices: Vec::new(),
            current_tags: Vec::new(),
            visited: BTreeSet::new(),
        }
    }

    /// Rebuild a session at a saved position. Fails with
    /// [`EngineError::CorruptProgress`] when the saved node is gone from
    /// the graph, e.g. after a story update.
    pub(crate) fn restore_at(
        story_id: &str,
        graph: Arc<StoryGraph>,
        cursor: &str,
        phase: Phase,
        variables: BTreeMap<String, Literal>,
        visited: BTreeSet<String>,
    ) -> Result<Self> {
        if graph.node(cursor).is_none() {
            return Err(EngineError::CorruptProgress {
                story: story_id.to_string(),
                node: cursor.to_string(),
            });
        }

        let mut engine = Self {
            story_id: story_id.to_string(),
            cursor: cursor.to_string(),
            phase,
            vars: VariableStore::from_map(variables),
            current_text: String::new(),
            active_choices: Vec::new(),
            current_tags: Vec::new(),
            // drop visits to nodes the updated graph no longer has
            visited: visited
                .into_iter()
                .filter(|id| graph.node(id).is_some())
                .collect(),
            graph,
        };

        if engine.phase == Phase::AwaitingChoice {
            engine.rebuild_choices();
            engine.current_tags = engine
                .graph
                .node(&engine.cursor)
                .map(|node| node.tags.clone())
                .unwrap_or_default();
        }

        Ok(engine)
    }

    pub fn story_id(&self) -> &str {
        &self.story_id
    }

    pub fn graph(&self) -> &Arc<StoryGraph> {
        &self.graph
    }

    /// Identifier of the node the engine currently points at.
    pub fn current_node(&self) -> &str {
        &self.cursor
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn can_continue(&self) -> bool {
        self.phase == Phase::Presenting
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn variables(&self) -> &VariableStore {
        &self.vars
    }

    pub fn visited(&self) -> &BTreeSet<String> {
        &self.visited
    }

    /// Completion estimate in percent: distinct nodes surfaced over the
    /// graph's node count. Non-decreasing between resets.
    pub fn progress_percent(&self) -> u8 {
        let total = self.graph.node_count().max(1);
        ((self.visited.len() * 100 / total).min(100)) as u8
    }

    /// Surface the current node: render its guard-passing text, apply its
    /// effects, then move to choices, the divert target, or completion.
    ///
    /// Valid only while [`Phase::Presenting`]; otherwise fails with
    /// [`EngineError::InvalidTransition`] and changes nothing.
    pub fn advance(&mut self) -> Result<()> {
        if self.phase != Phase::Presenting {
            return Err(EngineError::InvalidTransition(
                "continue is not valid unless text remains to surface",
            ));
        }

        let graph = Arc::clone(&self.graph);
        let node = graph.node(&self.cursor).ok_or(EngineError::CorruptProgress {
            story: self.story_id.clone(),
            node: self.cursor.clone(),
        })?;

        let mut lines = Vec::new();
        for segment in &node.segments {
            if self.guard_passes(segment.guard.as_ref()) {
                let line = render(&segment.text, &self.vars);
                let line = line.trim();
                if !line.is_empty() {
                    lines.push(line.to_string());
                }
            }
        }
        self.current_text = lines.join("\n");
        self.current_tags = node.tags.clone();
        self.visited.insert(node.id.clone());

        for effect in &node.effects {
            self.apply(effect);
        }

        self.rebuild_choices();
        if !self.active_choices.is_empty() {
            self.phase = Phase::AwaitingChoice;
        } else if let Some(next) = &node.next {
            self.cursor = next.clone();
        } else {
            self.phase = Phase::Complete;
        }

        Ok(())
    }

    /// Take the choice at `index`, apply its effects, and move to its
    /// target node.
    ///
    /// Out-of-range indices fail with [`EngineError::InvalidChoice`] and
    /// mutate nothing.
    pub fn choose(&mut self, index: usize) -> Result<()> {
        if self.phase != Phase::AwaitingChoice {
            return Err(EngineError::InvalidTransition(
                "no choices are on offer",
            ));
        }
        let def_index = match self.active_choices.get(index) {
            Some(active) => active.def_index,
            None => {
                return Err(EngineError::InvalidChoice {
                    index,
                    available: self.active_choices.len(),
                })
            }
        };

        let graph = Arc::clone(&self.graph);
        let node = graph.node(&self.cursor).ok_or(EngineError::CorruptProgress {
            story: self.story_id.clone(),
            node: self.cursor.clone(),
        })?;
        let def = &node.choices[def_index];

        for effect in &def.effects {
            self.apply(effect);
        }
        self.cursor = def.target.clone();
        self.phase = Phase::Presenting;
        self.current_text.clear();
        self.active_choices.clear();

        Ok(())
    }

    /// Return to the entry node with variables at their declared initial
    /// values. Always succeeds.
    pub fn reset(&mut self) {
        self.cursor = self.graph.start.clone();
        self.phase = Phase::Presenting;
        self.vars = VariableStore::from_declarations(&self.graph.variables);
        self.current_text.clear();
        self.active_choices.clear();
        self.current_tags.clear();
        self.visited.clear();
    }

    /// Direct variable read bypassing node logic.
    pub fn get_variable(&self, name: &str) -> Literal {
        self.vars.get(name).cloned().unwrap_or(Literal::Null)
    }

    /// Direct variable write bypassing node logic; visible to the next
    /// guard evaluation.
    pub fn set_variable(&mut self, name: &str, value: Literal) {
        self.vars.set(name, value);
    }

    /// Snapshot the observable session state.
    pub fn state(&self) -> StoryState {
        StoryState {
            story_id: self.story_id.clone(),
            current_text: self.current_text.clone(),
            choices: self
                .active_choices
                .iter()
                .enumerate()
                .map(|(index, active)| Choice {
                    index,
                    text: active.text.clone(),
                })
                .collect(),
            variables: self.vars.snapshot(),
            can_continue: self.can_continue(),
            is_complete: self.is_complete(),
            current_tags: self.current_tags.clone(),
        }
    }

    fn guard_passes(&self, guard: Option<&Expr>) -> bool {
        match guard {
            Some(expr) => truthy(&eval(expr, &self.vars)),
            None => true,
        }
    }

    fn apply(&mut self, effect: &Assignment) {
        let value = eval(&effect.value, &self.vars);
        self.vars.set(&effect.name, value);
    }

    /// Re-evaluate the current node's choice guards against the current
    /// store, without side effects.
    fn rebuild_choices(&mut self) {
        let graph = Arc::clone(&self.graph);
        let Some(node) = graph.node(&self.cursor) else {
            self.active_choices.clear();
            return;
        };

        self.active_choices = node
            .choices
            .iter()
            .enumerate()
            .filter(|(_, choice)| self.guard_passes(choice.guard.as_ref()))
            .map(|(def_index, choice)| ActiveChoice {
                def_index,
                text: render(&choice.text, &self.vars).trim().to_string(),
            })
            .collect();
    }
}
