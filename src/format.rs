use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A fully validated story graph, immutable after loading.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryGraph {
    pub name: String,
    /// Identifier of the entry node.
    pub start: String,
    pub nodes: HashMap<String, StoryNode>,
    /// Declared variables with their initial values.
    pub variables: Vec<VarDecl>,
}

impl StoryGraph {
    pub fn node(&self, id: &str) -> Option<&StoryNode> {
        self.nodes.get(id)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

/// One unit of narrative content: text, optional choices, optional divert.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryNode {
    pub id: String,
    pub segments: Vec<TextSegment>,
    /// Assignments applied once per surfacing, after the text.
    pub effects: Vec<Assignment>,
    pub choices: Vec<ChoiceDef>,
    /// Unconditional continuation, taken when no choice is eligible.
    pub next: Option<String>,
    pub tags: Vec<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextSegment {
    pub guard: Option<Expr>,
    pub text: TemplateText,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChoiceDef {
    pub guard: Option<Expr>,
    pub text: TemplateText,
    pub target: String,
    pub effects: Vec<Assignment>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub name: String,
    pub value: Expr,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: String,
    pub initial: Literal,
}

/// Text with `${expr}` interpolation holes.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateText {
    pub parts: Vec<TemplatePart>,
}

impl TemplateText {
    pub fn literal(text: &str) -> Self {
        Self {
            parts: vec![TemplatePart::Text(text.to_string())],
        }
    }

    /// True when the template contains no interpolation holes.
    pub fn is_static(&self) -> bool {
        self.parts
            .iter()
            .all(|part| matches!(part, TemplatePart::Text(_)))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TemplatePart {
    Text(String),
    Value(Expr),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Literal(Literal),
    Variable(String),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
}

impl Default for Expr {
    fn default() -> Self {
        Expr::Literal(Literal::Null)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Or,
    And,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Add,
    Sub,
    Mul,
    Div,
}

/// Scalar value of a story variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Null,
    String(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
}

impl Default for Literal {
    fn default() -> Self {
        Literal::Null
    }
}

impl Literal {
    pub fn is_null(&self) -> bool {
        matches!(self, Literal::Null)
    }

    pub fn is_string(&self) -> bool {
        matches!(self, Literal::String(_))
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Literal::Integer(_))
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Literal::Float(_))
    }

    pub fn is_boolean(&self) -> bool {
        matches!(self, Literal::Boolean(_))
    }

    pub fn as_string(&self) -> Option<&String> {
        if let Literal::String(ref s) = self {
            Some(s)
        } else {
            None
        }
    }

    pub fn as_integer(&self) -> Option<&i64> {
        if let Literal::Integer(ref i) = self {
            Some(i)
        } else {
            None
        }
    }

    pub fn as_float(&self) -> Option<&f64> {
        if let Literal::Float(ref f) = self {
            Some(f)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<&bool> {
        if let Literal::Boolean(ref b) = self {
            Some(b)
        } else {
            None
        }
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => write!(f, "null"),
            Literal::String(s) => write!(f, "{}", s),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(v) => write!(f, "{}", v),
            Literal::Boolean(b) => write!(f, "{}", b),
        }
    }
}

/// Parse output before graph validation: declarations plus nodes in
/// declaration order.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StoryScript {
    pub name: String,
    pub variables: Vec<VarDecl>,
    /// Explicit entry point (`-> id` before the first node), if any.
    pub entry: Option<String>,
    pub nodes: Vec<StoryNode>,
}
