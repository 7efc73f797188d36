//! Reference move generation backed by cozy-chess, used by the bundled
//! `perft_engine` binary and by in-process bisection runs.

use crate::engine::PerftEngine;
use crate::error::{BisectError, Result};
use crate::perft::PerftResult;
use crate::positions::GameState;
use cozy_chess::{Board, File, Move, Piece, Square};
use rayon::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Clone, Debug)]
pub struct ReferenceBoard {
    board: Board,
}

impl ReferenceBoard {
    pub fn startpos() -> Self { Self { board: Board::default() } }

    pub fn from_fen(fen: &str) -> Result<Self, String> {
        Board::from_fen(fen.trim(), false).map(|b| Self { board: b }).map_err(|e| format!("FEN error: {e:?}"))
    }

    pub fn from_state(state: &GameState) -> Result<Self, String> {
        let mut pos = Self::from_fen(&state.root_fen)?;
        for m in &state.moves { pos.make_move_uci(m)?; }
        Ok(pos)
    }

    pub fn board(&self) -> &Board { &self.board }

    /// Legal moves paired with their standard UCI tokens.
    pub fn legal_moves(&self) -> Vec<(String, Move)> { legal_moves(&self.board) }

    pub fn make_move_uci(&mut self, mv_uci: &str) -> Result<(), String> {
        let found = legal_moves(&self.board).into_iter().find(|(tok, _)| tok == mv_uci);
        if let Some((_, m)) = found { self.board.play(m); Ok(()) } else { Err(format!("Illegal move: {}", mv_uci)) }
    }
}

/// cozy-chess encodes castling as king-takes-rook; engines speak king-two-squares.
pub fn uci_token(board: &Board, piece: Piece, mv: Move) -> String {
    if piece == Piece::King && board.color_on(mv.to) == Some(board.side_to_move()) {
        let file = if (mv.to.file() as usize) > (mv.from.file() as usize) { File::G } else { File::C };
        return format!("{}{}", mv.from, Square::new(file, mv.from.rank()));
    }
    format!("{}", mv)
}

fn legal_moves(board: &Board) -> Vec<(String, Move)> {
    let mut v = Vec::new();
    board.generate_moves(|ml| {
        let piece = ml.piece;
        for m in ml { v.push((uci_token(board, piece, m), m)); }
        false
    });
    v
}

pub fn perft(board: &Board, depth: u32) -> u64 {
    if depth == 0 { return 1; }
    let mut nodes = 0u64;
    board.generate_moves(|moves| {
        if depth == 1 { nodes += moves.len() as u64; return false; }
        for m in moves {
            let mut child = board.clone();
            child.play(m);
            nodes += perft(&child, depth - 1);
        }
        false
    });
    nodes
}

/// Perft that pretends the given tokens are never legal, at every ply.
pub fn perft_hiding(board: &Board, depth: u32, hidden: &BTreeSet<String>) -> u64 {
    if hidden.is_empty() { return perft(board, depth); }
    if depth == 0 { return 1; }
    let mut nodes = 0u64;
    for (tok, m) in legal_moves(board) {
        if hidden.contains(&tok) { continue; }
        if depth == 1 { nodes += 1; continue; }
        let mut child = board.clone();
        child.play(m);
        nodes += perft_hiding(&child, depth - 1, hidden);
    }
    nodes
}

#[derive(Clone, Debug, Default)]
pub struct ReferenceOptions {
    /// Move tokens to drop from generation, simulating a generator bug
    pub hidden_moves: BTreeSet<String>,
    /// Root-split threads; 0 or 1 runs serially
    pub threads: usize,
}

impl ReferenceOptions {
    pub fn hiding<I, S>(moves: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { hidden_moves: moves.into_iter().map(Into::into).collect(), threads: 1 }
    }
}

/// Per-root-move counts at `depth`, as `go perft` reports them.
pub fn divide(pos: &ReferenceBoard, depth: u32, opts: &ReferenceOptions) -> PerftResult {
    if depth == 0 { return PerftResult::new(BTreeMap::new(), 1); }
    let root: Vec<(String, Move)> = pos.legal_moves().into_iter().filter(|(tok, _)| !opts.hidden_moves.contains(tok)).collect();
    let count = |(tok, m): &(String, Move)| {
        let mut child = pos.board.clone();
        child.play(*m);
        (tok.clone(), perft_hiding(&child, depth - 1, &opts.hidden_moves))
    };
    let pool = if opts.threads > 1 {
        rayon::ThreadPoolBuilder::new().num_threads(opts.threads).build().ok()
    } else { None };
    let counts: Vec<(String, u64)> = match pool {
        Some(pool) => pool.install(|| root.par_iter().map(count).collect()),
        None => root.iter().map(count).collect(),
    };
    PerftResult::from_counts(counts)
}

/// In-process engine answering perft requests with the reference generator.
pub struct ReferenceEngine {
    name: String,
    opts: ReferenceOptions,
    requests: usize,
    terminations: usize,
}

impl ReferenceEngine {
    pub fn new(name: impl Into<String>, opts: ReferenceOptions) -> Self {
        Self { name: name.into(), opts, requests: 0, terminations: 0 }
    }

    pub fn requests(&self) -> usize { self.requests }
    pub fn terminations(&self) -> usize { self.terminations }
}

impl PerftEngine for ReferenceEngine {
    fn name(&self) -> &str { &self.name }

    fn perft(&mut self, state: &GameState, depth: u32) -> Result<PerftResult> {
        self.requests += 1;
        let pos = ReferenceBoard::from_state(state).map_err(|e| BisectError::Config(format!("{}: {e}", self.name)))?;
        Ok(divide(&pos, depth, &self.opts))
    }

    fn terminate(&mut self) { self.terminations += 1; }
}
