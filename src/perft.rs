// Perft divide results and the parser for engines' text output.
use crate::error::{ProtocolFault, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const NODES_MARKER: &str = "Nodes searched";
const TOTAL_MARKER: &str = "Total";
const ERROR_MARKER: &str = "Error";

/// Per-move node counts plus the grand total reported for one perft request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PerftResult {
    pub move_counts: BTreeMap<String, u64>,
    pub total: u64,
}

impl PerftResult {
    pub fn new(move_counts: BTreeMap<String, u64>, total: u64) -> Self { Self { move_counts, total } }

    /// Build from `(move, count)` pairs with the total taken as their sum.
    pub fn from_counts<I, S>(counts: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let move_counts: BTreeMap<String, u64> = counts.into_iter().map(|(m, c)| (m.into(), c)).collect();
        let total = move_counts.values().sum();
        Self { move_counts, total }
    }

    pub fn count(&self, mv: &str) -> u64 { self.move_counts.get(mv).copied().unwrap_or(0) }

    /// Render in the line format engines print for `go perft`.
    pub fn to_divide_text(&self) -> String {
        let mut out = String::new();
        for (mv, n) in &self.move_counts {
            out.push_str(&format!("{mv}: {n}\n"));
        }
        out.push_str(&format!("\n{NODES_MARKER}: {}\n", self.total));
        out
    }
}

/// Outcome of parsing a line stream: whatever was gathered plus whether a total line ended it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
    pub result: PerftResult,
    pub terminated: bool,
}

impl Parsed {
    /// The result, or a fault if the stream closed before the total line.
    pub fn into_result(self, engine: &str) -> Result<PerftResult> {
        if !self.terminated {
            return Err(ProtocolFault::Unterminated { engine: engine.to_string() }.into());
        }
        Ok(self.result)
    }
}

/// Incremental perft output parser. Feed lines until it reports completion.
#[derive(Debug, Default)]
pub struct PerftParser {
    move_counts: BTreeMap<String, u64>,
    total: u64,
    done: bool,
}

impl PerftParser {
    pub fn new() -> Self { Self::default() }

    /// Consume one line; returns true once the terminal total line has been seen.
    /// Lines after completion are ignored.
    pub fn feed(&mut self, line: &str) -> bool {
        if self.done { return true; }
        let line = line.trim();
        if line.is_empty() { return false; }
        let is_terminal = line.contains(NODES_MARKER) || line.contains(TOTAL_MARKER);
        if !is_terminal && !line.contains(ERROR_MARKER) {
            if let Some((mv, count)) = parse_move_line(line) {
                self.move_counts.insert(mv.to_string(), count);
            }
        }
        if is_terminal {
            // unparsable totals are recorded as zero
            self.total = line.split_whitespace().last().and_then(|t| t.parse().ok()).unwrap_or(0);
            self.done = true;
        }
        self.done
    }

    pub fn is_done(&self) -> bool { self.done }

    pub fn finish(self) -> Parsed {
        Parsed { result: PerftResult { move_counts: self.move_counts, total: self.total }, terminated: self.done }
    }
}

fn parse_move_line(line: &str) -> Option<(&str, u64)> {
    let mut parts = line.split(':');
    let mv = parts.next()?.trim();
    let count = parts.next()?.trim();
    if parts.next().is_some() || mv.is_empty() { return None; }
    count.parse().ok().map(|n| (mv, n))
}

/// Parse lines until the terminal marker; lines after it are left in the iterator.
pub fn parse_lines<I, S>(lines: I) -> Parsed
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut parser = PerftParser::new();
    for line in lines {
        if parser.feed(line.as_ref()) { break; }
    }
    parser.finish()
}

pub fn parse_text(text: &str) -> Parsed { parse_lines(text.lines()) }
