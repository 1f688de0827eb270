use nom::branch::alt;
use nom::bytes::complete::tag;
use nom::character::complete::char;
use nom::combinator::*;
use nom::error::context;
use nom::multi::many0;
use nom::sequence::*;
use nom::Parser;
use nom_language::error::{VerboseError, VerboseErrorKind};

use crate::format::{Assignment, ChoiceDef, StoryNode, TextSegment};
use crate::result::ParseResult;

use super::assignment::assignment;
use super::choice::choice_line;
use super::comment::{span0, span0_inline};
use super::identifier::identifier;
use super::text::text_line;

enum NodeItem {
    Segment(TextSegment),
    Effect(Assignment),
    Choice(ChoiceDef),
    /// `-> id`, with `END`/`DONE` marking an explicit terminal
    Divert(Option<String>),
}

/// parse a node: `=== id === #tags` followed by its body lines
pub fn node(input: &str) -> ParseResult<&str, StoryNode> {
    let (input, id) = context("node header", header).parse(input)?;
    let (input, tags) = many0(preceded(
        span0_inline,
        preceded(char('#'), cut(identifier)),
    ))
    .parse(input)?;
    let (input, items) = many0(preceded(span0, node_item)).parse(input)?;

    let mut node = StoryNode {
        id: id.to_string(),
        tags: tags.into_iter().map(str::to_string).collect(),
        ..Default::default()
    };
    let mut seen_divert = false;
    for item in items {
        match item {
            NodeItem::Segment(segment) => node.segments.push(segment),
            NodeItem::Effect(effect) => node.effects.push(effect),
            NodeItem::Choice(choice) => node.choices.push(choice),
            NodeItem::Divert(target) => {
                if seen_divert {
                    return Err(nom::Err::Failure(VerboseError {
                        errors: vec![(
                            input,
                            VerboseErrorKind::Context("node declares more than one divert"),
                        )],
                    }));
                }
                seen_divert = true;
                node.next = target;
            }
        }
    }

    Ok((input, node))
}

fn header(input: &str) -> ParseResult<&str, &str> {
    delimited(
        tag("==="),
        delimited(span0_inline, cut(identifier), span0_inline),
        cut(tag("===")),
    )
    .parse(input)
}

fn node_item(input: &str) -> ParseResult<&str, NodeItem> {
    alt((
        map(choice_line, NodeItem::Choice),
        map(assignment, NodeItem::Effect),
        map(divert_line, NodeItem::Divert),
        map(text_line, NodeItem::Segment),
    ))
    .parse(input)
}

pub fn divert_line(input: &str) -> ParseResult<&str, Option<String>> {
    let (input, target) = preceded(pair(tag("->"), span0_inline), cut(identifier)).parse(input)?;
    let target = match target {
        "END" | "DONE" => None,
        id => Some(id.to_string()),
    };
    Ok((input, target))
}
