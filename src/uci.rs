use std::io::{self, BufRead, Write};
use crate::reference::{divide, ReferenceBoard, ReferenceOptions};

/// Deliberate protocol faults, for exercising the bisector's error paths.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Misbehavior {
    #[default]
    None,
    /// Print the per-move lines of the first perft, then exit without the total
    ExitBeforeTotal,
    /// Never answer `go perft`
    Stall,
    /// Ignore `isready`, so the handshake never completes
    NoReadyok,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Control { Continue, Quit }

/// Line-protocol front end for the reference generator.
pub struct ReferenceUci {
    /// `None` after a rejected `position` command until a valid one arrives
    pos: Option<ReferenceBoard>,
    opts: ReferenceOptions,
    misbehavior: Misbehavior,
}

impl ReferenceUci {
    pub fn new(opts: ReferenceOptions, misbehavior: Misbehavior) -> Self {
        Self { pos: Some(ReferenceBoard::startpos()), opts, misbehavior }
    }

    pub fn position(&self) -> Option<&ReferenceBoard> { self.pos.as_ref() }

    fn cmd_uci<W: Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "id name perft_engine")?;
        writeln!(out, "id author PieBot Team")?;
        writeln!(out, "option name Threads type spin default 1 min 1 max 512")?;
        writeln!(out, "uciok")
    }

    fn cmd_position<W: Write>(&mut self, args: &str, out: &mut W) -> io::Result<()> {
        // 'position startpos [moves ...]' or 'position fen <fen> [moves ...]'
        let mut tokens = args.split_whitespace().peekable();
        let base = match tokens.next() {
            Some("startpos") => Ok(ReferenceBoard::startpos()),
            Some("fen") => {
                let mut fields = Vec::new();
                while let Some(tok) = tokens.peek() {
                    if *tok == "moves" { break; }
                    fields.push(*tok);
                    tokens.next();
                }
                ReferenceBoard::from_fen(&fields.join(" "))
            }
            other => Err(format!("unknown position kind: {:?}", other)),
        };
        let applied = base.and_then(|mut pos| {
            if let Some("moves") = tokens.next() {
                for mv in tokens { pos.make_move_uci(mv)?; }
            }
            Ok(pos)
        });
        match applied {
            Ok(pos) => { self.pos = Some(pos); Ok(()) }
            Err(e) => {
                self.pos = None;
                writeln!(out, "info string Error: {e}")
            }
        }
    }

    fn cmd_go<W: Write>(&mut self, args: &str, out: &mut W) -> io::Result<Control> {
        let mut tokens = args.split_whitespace();
        if tokens.next() != Some("perft") { return Ok(Control::Continue); }
        let depth = match tokens.next().and_then(|s| s.parse::<u32>().ok()) {
            Some(d) => d,
            None => {
                writeln!(out, "info string Error: \"perft\" command should be followed by an integer")?;
                return Ok(Control::Continue);
            }
        };
        if self.misbehavior == Misbehavior::Stall { return Ok(Control::Continue); }
        let Some(pos) = &self.pos else {
            writeln!(out, "info string Error: no valid position set, perft refused")?;
            return Ok(Control::Continue);
        };
        let res = divide(pos, depth, &self.opts);
        for (mv, n) in &res.move_counts { writeln!(out, "{mv}: {n}")?; }
        if self.misbehavior == Misbehavior::ExitBeforeTotal {
            out.flush()?;
            return Ok(Control::Quit);
        }
        writeln!(out)?;
        writeln!(out, "Nodes searched: {}", res.total)?;
        writeln!(out)?;
        Ok(Control::Continue)
    }

    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<Control> {
        let line = line.trim();
        let control = match line {
            "" => Control::Continue,
            "uci" => { self.cmd_uci(out)?; Control::Continue }
            "isready" => {
                if self.misbehavior != Misbehavior::NoReadyok { writeln!(out, "readyok")?; }
                Control::Continue
            }
            "ucinewgame" => { self.pos = Some(ReferenceBoard::startpos()); Control::Continue }
            "quit" => Control::Quit,
            _ => {
                if let Some(rest) = line.strip_prefix("position ") {
                    self.cmd_position(rest, out)?;
                    Control::Continue
                } else if let Some(rest) = line.strip_prefix("go ") {
                    self.cmd_go(rest, out)?
                } else {
                    Control::Continue
                }
            }
        };
        out.flush()?;
        Ok(control)
    }

    pub fn run_loop<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        for line in input.lines() {
            let line = match line { Ok(s) => s, Err(_) => break };
            if self.handle_line(&line, &mut out)? == Control::Quit { break; }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::perft::parse_text;

    fn run(engine: &mut ReferenceUci, script: &str) -> String {
        let mut out = Vec::new();
        engine.run_loop(script.as_bytes(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn perft_output_parses_back() {
        let mut e = ReferenceUci::new(ReferenceOptions::default(), Misbehavior::None);
        let text = run(&mut e, "position startpos\ngo perft 2\nquit\n");
        let parsed = parse_text(&text);
        assert!(parsed.terminated);
        assert_eq!(parsed.result.total, 400);
        assert_eq!(parsed.result.move_counts.len(), 20);
        assert_eq!(parsed.result.count("g1f3"), 20);
    }

    #[test]
    fn fen_with_moves_is_applied_from_that_fen() {
        let mut e = ReferenceUci::new(ReferenceOptions::default(), Misbehavior::None);
        let fen = "r3k2r/p1ppqpb1/bn2pnp1/3PN3/1p2P3/2N2Q1p/PPPBBPPP/R3K2R w KQkq - 1 1";
        run(&mut e, &format!("position fen {fen} moves e1g1\n"));
        assert_eq!(e.position().expect("position set").board().side_to_move(), cozy_chess::Color::Black);
    }

    #[test]
    fn bad_move_clears_position_and_perft_is_refused() {
        let mut e = ReferenceUci::new(ReferenceOptions::default(), Misbehavior::None);
        let text = run(&mut e, "position startpos moves e2e4\nposition startpos moves e2e5\ngo perft 1\n");
        assert!(text.contains("Illegal move: e2e5"), "{text}");
        assert!(text.contains("perft refused"), "{text}");
        assert!(e.position().is_none());
        let parsed = parse_text(&text);
        assert!(!parsed.terminated);
        assert!(parsed.result.move_counts.is_empty());
    }

    #[test]
    fn valid_position_after_rejection_restores_perft() {
        let mut e = ReferenceUci::new(ReferenceOptions::default(), Misbehavior::None);
        let text = run(&mut e, "position fen not a fen\nposition startpos moves e2e4\ngo perft 1\n");
        assert!(text.contains("FEN error"), "{text}");
        assert_eq!(parse_text(&text).result.total, 20);
    }

    #[test]
    fn no_readyok_ignores_isready() {
        let mut e = ReferenceUci::new(ReferenceOptions::default(), Misbehavior::NoReadyok);
        let text = run(&mut e, "uci\nisready\n");
        assert!(text.contains("uciok"));
        assert!(!text.contains("readyok"));
    }

    #[test]
    fn exit_before_total_omits_node_line() {
        let mut e = ReferenceUci::new(ReferenceOptions::default(), Misbehavior::ExitBeforeTotal);
        let text = run(&mut e, "position startpos\ngo perft 1\nisready\n");
        assert!(!text.contains("Nodes searched"));
        assert!(!text.contains("readyok"));
        assert!(!parse_text(&text).terminated);
    }
}
