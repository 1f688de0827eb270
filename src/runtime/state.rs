use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format::Literal;

/// Where the engine stands between transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Text is being surfaced; `continue` is valid.
    Presenting,
    /// Choices are on offer; only `choose` is valid.
    AwaitingChoice,
    /// No choices, no divert, nothing left to surface.
    Complete,
}

/// One currently offered choice, re-indexed contiguously from 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub index: usize,
    pub text: String,
}

/// Read-only snapshot of a live session, published to observers after
/// every accepted transition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryState {
    pub story_id: String,
    /// Guard-passing text surfaced since the last choice boundary.
    pub current_text: String,
    pub choices: Vec<Choice>,
    pub variables: BTreeMap<String, Literal>,
    pub can_continue: bool,
    pub is_complete: bool,
    pub current_tags: Vec<String>,
}
