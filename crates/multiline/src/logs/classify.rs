//! Classifier — does a line continue the open buffer or start a new message?
//!
//! The rules form an ordered table of pure predicates; the first one that
//! returns a decision wins. A line no rule claims is folded in.

use super::buffer::Buffer;
use super::depth::LineShape;
use super::pattern::{
    block_start, continuation_marker, is_blank, is_indented, is_record_header, BlockGrammar,
    ContinuationMarker,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Continue(Rule),
    Start(Rule),
}

impl Decision {
    pub fn rule(&self) -> Rule {
        match self {
            Decision::Continue(rule) | Decision::Start(rule) => *rule,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Decision::Start(_))
    }
}

/// Which row of the rule table produced a decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    NoBuffer,
    OpenStructure,
    Indented,
    Marker(ContinuationMarker),
    /// Header of a grammar whose previous instance is still unfinished.
    BlockStart(BlockGrammar),
    /// Header of a grammar that already completed in this buffer.
    RepeatedBlock(BlockGrammar),
    Blank,
    RecordHeader,
    SelfContainedRepeat,
    Default,
}

struct Line<'a> {
    text: &'a str,
    shape: LineShape,
}

type RuleFn = fn(&Buffer, &Line<'_>) -> Option<Decision>;

const RULES: &[RuleFn] = &[
    open_structure,
    indented,
    marker,
    block_header,
    blank,
    record_header,
    self_contained_repeat,
];

/// Classify `line` against the open buffer, if any.
pub fn classify(buffer: Option<&Buffer>, line: &str) -> Decision {
    let Some(buffer) = buffer else {
        return Decision::Start(Rule::NoBuffer);
    };

    let line = Line {
        text: line,
        shape: LineShape::scan(line),
    };
    RULES
        .iter()
        .find_map(|rule| rule(buffer, &line))
        .unwrap_or(Decision::Continue(Rule::Default))
}

fn open_structure(buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    buffer
        .depth()
        .is_open_after(&line.shape)
        .then_some(Decision::Continue(Rule::OpenStructure))
}

fn indented(_buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    is_indented(line.text).then_some(Decision::Continue(Rule::Indented))
}

fn marker(_buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    continuation_marker(line.text).map(|m| Decision::Continue(Rule::Marker(m)))
}

fn block_header(buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    let grammar = block_start(line.text)?;
    if buffer.grammar().has_completed(grammar) {
        Some(Decision::Start(Rule::RepeatedBlock(grammar)))
    } else {
        Some(Decision::Continue(Rule::BlockStart(grammar)))
    }
}

fn blank(_buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    is_blank(line.text).then_some(Decision::Continue(Rule::Blank))
}

fn record_header(_buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    is_record_header(line.text).then_some(Decision::Start(Rule::RecordHeader))
}

fn self_contained_repeat(buffer: &Buffer, line: &Line<'_>) -> Option<Decision> {
    (line.shape.is_self_contained() && buffer.depth().last_bracketed_self_contained())
        .then_some(Decision::Start(Rule::SelfContainedRepeat))
}
