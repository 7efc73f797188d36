//! Standard perft suite positions plus the position value the bisection walks.

use serde::{Deserialize, Serialize};

pub const STARTPOS_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
pub const KIWIPETE_FEN: &str = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 1 1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardFen {
    pub key: &'static str,
    pub name: &'static str,
    pub fen: &'static str,
}

/// Positions commonly used for perft cross-checks, selectable by index or key.
pub const STANDARD_FENS: &[StandardFen] = &[
    StandardFen { key: "startpos", name: "Startpos (Initial Board)", fen: STARTPOS_FEN },
    StandardFen { key: "kiwipete", name: "Kiwipete (Rook, Bishop, Queen moves)", fen: KIWIPETE_FEN },
];

/// Resolve a 1-based table index, a table key, or a literal FEN.
pub fn resolve_fen(selector: &str) -> String {
    let s = selector.trim();
    if let Ok(idx) = s.parse::<usize>() {
        if let Some(entry) = idx.checked_sub(1).and_then(|i| STANDARD_FENS.get(i)) {
            return entry.fen.to_string();
        }
    }
    STANDARD_FENS
        .iter()
        .find(|e| e.key.eq_ignore_ascii_case(s))
        .map(|e| e.fen.to_string())
        .unwrap_or_else(|| s.to_string())
}

/// A root FEN plus the moves played from it, in order. Extending returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GameState {
    pub root_fen: String,
    pub moves: Vec<String>,
}

impl GameState {
    pub fn new(root_fen: impl Into<String>) -> Self {
        Self { root_fen: root_fen.into(), moves: Vec::new() }
    }

    pub fn with_moves(root_fen: impl Into<String>, moves: Vec<String>) -> Self {
        Self { root_fen: root_fen.into(), moves }
    }

    pub fn extended(&self, mv: &str) -> Self {
        let mut moves = Vec::with_capacity(self.moves.len() + 1);
        moves.extend(self.moves.iter().cloned());
        moves.push(mv.to_string());
        Self { root_fen: self.root_fen.clone(), moves }
    }

    pub fn ply(&self) -> usize { self.moves.len() }

    /// The `position` command that sets this state on an engine; the moves clause is omitted when empty.
    pub fn position_command(&self) -> String {
        if self.moves.is_empty() {
            format!("position fen {}", self.root_fen)
        } else {
            format!("position fen {} moves {}", self.root_fen, self.moves.join(" "))
        }
    }
}
