use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format::{Literal, VarDecl};

/// Per-session variable storage, owned by exactly one engine.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableStore {
    values: BTreeMap<String, Literal>,
}

impl VariableStore {
    pub fn from_declarations(decls: &[VarDecl]) -> Self {
        Self {
            values: decls
                .iter()
                .map(|decl| (decl.name.clone(), decl.initial.clone()))
                .collect(),
        }
    }

    pub fn from_map(values: BTreeMap<String, Literal>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&Literal> {
        self.values.get(name)
    }

    pub fn set(&mut self, name: &str, value: Literal) {
        self.values.insert(name.to_string(), value);
    }

    pub fn snapshot(&self) -> BTreeMap<String, Literal> {
        self.values.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }
}
