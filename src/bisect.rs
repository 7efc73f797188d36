//! Narrows a node-count disagreement between two engines down to one ply.
//!
//! Each level compares both engines on the same position, follows the first
//! differing move in lexicographic token order and drops one ply of depth.
//! When depth reaches zero the accumulated move chain is the answer.

use crate::engine::PerftEngine;
use crate::error::{ProtocolFault, Result};
use crate::perft::PerftResult;
use crate::positions::GameState;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A move whose per-move counts differ between the two engines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveDelta {
    pub mv: String,
    pub count_a: u64,
    pub count_b: u64,
}

/// First move, over the union of both move sets in sorted order, whose counts differ.
/// A move missing from one side counts as zero there.
pub fn first_divergent_move(a: &PerftResult, b: &PerftResult) -> Option<MoveDelta> {
    let union: BTreeSet<&String> = a.move_counts.keys().chain(b.move_counts.keys()).collect();
    union.into_iter().find_map(|mv| {
        let (count_a, count_b) = (a.count(mv), b.count(mv));
        (count_a != count_b).then(|| MoveDelta { mv: mv.clone(), count_a, count_b })
    })
}

/// Both engines' answers for one (position, depth) request.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub state: GameState,
    pub depth: u32,
    pub a: PerftResult,
    pub b: PerftResult,
}

impl Comparison {
    pub fn totals_match(&self) -> bool { self.a.total == self.b.total }

    pub fn first_divergent_move(&self) -> Option<MoveDelta> { first_divergent_move(&self.a, &self.b) }

    pub fn trace(&self) -> LevelTrace {
        LevelTrace {
            depth: self.depth,
            moves: self.state.moves.clone(),
            total_a: self.a.total,
            total_b: self.b.total,
            divergence: self.first_divergent_move(),
        }
    }

    fn agreement_fault(&self) -> ProtocolFault {
        ProtocolFault::UnexpectedAgreement { depth: self.depth, chain: self.state.moves.clone(), total: self.a.total }
    }

    fn no_discrepancy_fault(&self) -> ProtocolFault {
        ProtocolFault::NoMoveDiscrepancy {
            depth: self.depth,
            chain: self.state.moves.clone(),
            total_a: self.a.total,
            total_b: self.b.total,
        }
    }
}

/// Ask A, then B, for perft of `state` at `depth`.
pub fn compare<A, B>(a: &mut A, b: &mut B, state: &GameState, depth: u32) -> Result<Comparison>
where
    A: PerftEngine + ?Sized,
    B: PerftEngine + ?Sized,
{
    let ra = a.perft(state, depth)?;
    let rb = b.perft(state, depth)?;
    Ok(Comparison { state: state.clone(), depth, a: ra, b: rb })
}

/// One comparison step of a bisection run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelTrace {
    pub depth: u32,
    pub moves: Vec<String>,
    pub total_a: u64,
    pub total_b: u64,
    pub divergence: Option<MoveDelta>,
}

/// The position at which the two engines' move generation first differs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DivergenceReport {
    pub engine_a: String,
    pub engine_b: String,
    pub root_fen: String,
    pub move_chain: Vec<String>,
    pub trail: Vec<LevelTrace>,
}

impl DivergenceReport {
    pub fn state(&self) -> GameState { GameState::with_moves(self.root_fen.clone(), self.move_chain.clone()) }

    /// The command that reproduces the divergent position on an engine.
    pub fn position_command(&self) -> String { self.state().position_command() }
}

/// Bisect from `chain` at `depth`. The caller has already seen the totals differ
/// one ply up; agreement here is reported as a fault.
pub fn locate<A, B>(a: &mut A, b: &mut B, root_fen: &str, chain: Vec<String>, depth: u32) -> Result<DivergenceReport>
where
    A: PerftEngine + ?Sized,
    B: PerftEngine + ?Sized,
{
    locate_from(a, b, GameState::with_moves(root_fen, chain), depth, Vec::new())
}

pub(crate) fn locate_from<A, B>(
    a: &mut A,
    b: &mut B,
    mut state: GameState,
    mut depth: u32,
    mut trail: Vec<LevelTrace>,
) -> Result<DivergenceReport>
where
    A: PerftEngine + ?Sized,
    B: PerftEngine + ?Sized,
{
    while depth > 0 {
        let cmp = compare(a, b, &state, depth)?;
        info!("depth {}: [{}] {}={} {}={}", depth, state.moves.join(" "), a.name(), cmp.a.total, b.name(), cmp.b.total);
        if cmp.totals_match() { return Err(cmp.agreement_fault().into()); }
        let delta = cmp.first_divergent_move().ok_or_else(|| cmp.no_discrepancy_fault())?;
        info!("divergence on {}: {}={} {}={}", delta.mv, a.name(), delta.count_a, b.name(), delta.count_b);
        trail.push(cmp.trace());
        state = state.extended(&delta.mv);
        depth -= 1;
    }
    info!("pinpointed: {}", state.position_command());
    Ok(DivergenceReport {
        engine_a: a.name().to_string(),
        engine_b: b.name().to_string(),
        root_fen: state.root_fen,
        move_chain: state.moves,
        trail,
    })
}

/// Outcome of a full session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SessionOutcome {
    NoDivergence { depth: u32, total: u64 },
    Divergence(DivergenceReport),
}

/// Initial comparison at `depth` followed by bisection on mismatch. Does not
/// terminate the engines; see [`crate::session`].
pub fn bisect<A, B>(a: &mut A, b: &mut B, root_fen: &str, depth: u32) -> Result<SessionOutcome>
where
    A: PerftEngine + ?Sized,
    B: PerftEngine + ?Sized,
{
    if depth == 0 { return Err(crate::error::BisectError::InvalidDepth(depth)); }
    let root = GameState::new(root_fen);
    let cmp = compare(a, b, &root, depth)?;
    info!("initial run (depth {}): {}={} {}={}", depth, a.name(), cmp.a.total, b.name(), cmp.b.total);
    if cmp.totals_match() {
        return Ok(SessionOutcome::NoDivergence { depth, total: cmp.a.total });
    }
    let delta = cmp.first_divergent_move().ok_or_else(|| cmp.no_discrepancy_fault())?;
    info!("first error branch: {}", delta.mv);
    let trail = vec![cmp.trace()];
    locate_from(a, b, root.extended(&delta.mv), depth - 1, trail).map(SessionOutcome::Divergence)
}
