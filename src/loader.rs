use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use nom_language::error::convert_error;
use twox_hash::XxHash3_128;

use crate::error::{EngineError, Result};
use crate::format::{StoryGraph, StoryScript};
use crate::parser;

/// Parse and validate a story source into an immutable graph.
///
/// Fails with [`EngineError::MalformedStory`] on syntax errors, duplicate
/// node or variable declarations, unresolved choice or divert targets, or
/// an absent entry node.
pub fn load(name: &str, source: &[u8]) -> Result<StoryGraph> {
    let text = std::str::from_utf8(source)
        .map_err(|e| EngineError::MalformedStory(format!("source is not valid UTF-8: {}", e)))?;
    let script = parse_script(name, text)?;
    compile(script)
}

fn parse_script(name: &str, text: &str) -> Result<StoryScript> {
    match parser::parse(name, text) {
        Ok((_, script)) => Ok(script),
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            Err(EngineError::MalformedStory(convert_error(text, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(EngineError::MalformedStory(
            "unexpected end of input".to_string(),
        )),
    }
}

/// Validate a parsed script and freeze it into a [`StoryGraph`].
pub fn compile(script: StoryScript) -> Result<StoryGraph> {
    if script.nodes.is_empty() {
        return Err(EngineError::MalformedStory(format!(
            "story {} declares no nodes",
            script.name
        )));
    }

    let mut declared = HashSet::new();
    for decl in &script.variables {
        if !declared.insert(decl.name.as_str()) {
            return Err(EngineError::MalformedStory(format!(
                "variable {} declared twice",
                decl.name
            )));
        }
    }

    let start = match &script.entry {
        Some(id) => id.clone(),
        None => script.nodes[0].id.clone(),
    };

    let mut nodes = HashMap::with_capacity(script.nodes.len());
    for node in &script.nodes {
        if nodes.contains_key(&node.id) {
            return Err(EngineError::MalformedStory(format!(
                "node id {} declared twice",
                node.id
            )));
        }
        nodes.insert(node.id.clone(), node.clone());
    }

    if !nodes.contains_key(&start) {
        return Err(EngineError::MalformedStory(format!(
            "entry node {} does not exist",
            start
        )));
    }

    for node in nodes.values() {
        for choice in &node.choices {
            if !nodes.contains_key(&choice.target) {
                return Err(EngineError::MalformedStory(format!(
                    "node {} has a choice targeting unknown node {}",
                    node.id, choice.target
                )));
            }
        }
        if let Some(next) = &node.next {
            if !nodes.contains_key(next) {
                return Err(EngineError::MalformedStory(format!(
                    "node {} diverts to unknown node {}",
                    node.id, next
                )));
            }
        }
    }

    Ok(StoryGraph {
        name: script.name,
        start,
        nodes,
        variables: script.variables,
    })
}

/// Compiled graphs keyed by source identity.
///
/// Loading the same bytes twice hands back the same `Arc`, so repeated
/// `initialize` calls for a story do not recompile it.
#[derive(Default)]
pub struct GraphCache {
    graphs: HashMap<u128, Arc<StoryGraph>>,
}

impl GraphCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(&mut self, name: &str, source: &[u8]) -> Result<Arc<StoryGraph>> {
        let key = XxHash3_128::oneshot(source);
        if let Some(graph) = self.graphs.get(&key) {
            return Ok(Arc::clone(graph));
        }

        let graph = Arc::new(load(name, source)?);
        self.graphs.insert(key, Arc::clone(&graph));
        Ok(graph)
    }
}
