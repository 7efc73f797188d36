//! Drives one external engine process over its stdin/stdout line protocol.
//!
//! A background thread forwards stdout lines into a channel so every read can
//! be bounded by a timeout; a closed channel means the process has exited.

use crate::config::{EngineConfig, Timeouts};
use crate::error::{BisectError, Result};
use crate::perft::{PerftParser, PerftResult};
use crate::positions::GameState;
use log::{debug, warn};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::process::{Child, ChildStdin, Command, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

/// Anything that can answer perft requests for a position.
pub trait PerftEngine {
    fn name(&self) -> &str;

    fn perft(&mut self, state: &GameState, depth: u32) -> Result<PerftResult>;

    /// Best-effort shutdown; must not fail and may be called more than once.
    fn terminate(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Spawned,
    Initialized,
    PositionSet,
    Searching,
    ResultsReady,
    Dead,
}

pub struct EngineProcess {
    name: String,
    child: Child,
    stdin: BufWriter<ChildStdin>,
    rx: Receiver<String>,
    state: EngineState,
    timeouts: Timeouts,
    terminated: bool,
}

impl EngineProcess {
    pub fn start(cfg: &EngineConfig, timeouts: Timeouts) -> Result<Self> {
        let spawn_err = |source| BisectError::Spawn { path: cfg.path.clone(), source };
        let mut child = Command::new(&cfg.path)
            .args(&cfg.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(spawn_err)?;
        let (stdin, stdout) = match (child.stdin.take(), child.stdout.take()) {
            (Some(i), Some(o)) => (i, o),
            _ => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(spawn_err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "engine pipes unavailable")));
            }
        };
        let (tx, rx) = mpsc::channel::<String>();
        std::thread::spawn(move || {
            let mut reader = BufReader::new(stdout);
            let mut buf = Vec::new();
            loop {
                buf.clear();
                match reader.read_until(b'\n', &mut buf) {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&buf).trim_end_matches(['\r', '\n']).to_string();
                        if tx.send(line).is_err() { break; }
                    }
                }
            }
        });
        debug!("{}: spawned {} (pid {})", cfg.name, cfg.path.display(), child.id());
        Ok(Self {
            name: cfg.name.clone(),
            child,
            stdin: BufWriter::new(stdin),
            rx,
            state: EngineState::Spawned,
            timeouts,
            terminated: false,
        })
    }

    pub fn state(&self) -> EngineState { self.state }

    pub fn is_alive(&mut self) -> bool {
        !self.terminated && matches!(self.child.try_wait(), Ok(None))
    }

    /// `uci` then `isready`, waiting for `readyok`.
    pub fn initialize(&mut self) -> Result<()> {
        self.send("uci")?;
        self.send("isready")?;
        self.wait_ready(self.timeouts.handshake())?;
        self.state = EngineState::Initialized;
        Ok(())
    }

    /// Write one line and flush it.
    pub fn send(&mut self, line: &str) -> Result<()> {
        if self.state == EngineState::Dead { return Err(self.exited()); }
        debug!("{} <- {}", self.name, line);
        let written = self.stdin.write_all(line.as_bytes())
            .and_then(|_| self.stdin.write_all(b"\n"))
            .and_then(|_| self.stdin.flush());
        written.map_err(|_| self.mark_dead())
    }

    /// Next output line, without its terminator.
    pub fn await_line(&mut self, timeout: Duration) -> Result<String> {
        if self.state == EngineState::Dead { return Err(self.exited()); }
        match self.rx.recv_timeout(timeout) {
            Ok(line) => {
                debug!("{} -> {}", self.name, line);
                Ok(line)
            }
            Err(RecvTimeoutError::Timeout) => Err(BisectError::Timeout { engine: self.name.clone(), waited: timeout }),
            Err(RecvTimeoutError::Disconnected) => Err(self.mark_dead()),
        }
    }

    pub fn set_position(&mut self, state: &GameState) -> Result<()> {
        if self.state == EngineState::Spawned { self.initialize()?; }
        self.send(&state.position_command())?;
        self.send("isready")?;
        self.wait_ready(self.timeouts.read())?;
        self.state = EngineState::PositionSet;
        Ok(())
    }

    /// `go perft <depth>` on the current position, parsed until the node total line.
    pub fn run_perft(&mut self, depth: u32) -> Result<PerftResult> {
        self.send(&format!("go perft {depth}"))?;
        self.state = EngineState::Searching;
        let limit = self.timeouts.read();
        let deadline = Instant::now() + limit;
        let mut parser = PerftParser::new();
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BisectError::Timeout { engine: self.name.clone(), waited: limit });
            }
            let line = self.await_line(remaining).map_err(|e| match e {
                BisectError::Timeout { engine, .. } => BisectError::Timeout { engine, waited: limit },
                other => other,
            })?;
            if parser.feed(&line) { break; }
        }
        self.state = EngineState::ResultsReady;
        Ok(parser.finish().result)
    }

    fn wait_ready(&mut self, limit: Duration) -> Result<()> {
        let deadline = Instant::now() + limit;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(BisectError::Timeout { engine: self.name.clone(), waited: limit });
            }
            let line = self.await_line(remaining).map_err(|e| match e {
                BisectError::Timeout { engine, .. } => BisectError::Timeout { engine, waited: limit },
                other => other,
            })?;
            if is_ready_line(&line) { return Ok(()); }
        }
    }

    fn exited(&self) -> BisectError { BisectError::ProcessExited { engine: self.name.clone() } }

    fn mark_dead(&mut self) -> BisectError {
        self.state = EngineState::Dead;
        self.exited()
    }

    fn shutdown(&mut self) {
        if self.terminated { return; }
        self.terminated = true;
        if matches!(self.child.try_wait(), Ok(Some(_))) {
            self.state = EngineState::Dead;
            return;
        }
        let _ = self.stdin.write_all(b"quit\n").and_then(|_| self.stdin.flush());
        let deadline = Instant::now() + self.timeouts.quit_grace();
        while Instant::now() < deadline {
            if let Ok(Some(_)) = self.child.try_wait() {
                self.state = EngineState::Dead;
                return;
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        warn!("{}: did not quit within {:?}, killing", self.name, self.timeouts.quit_grace());
        if let Err(e) = self.child.kill() { warn!("{}: kill failed: {e}", self.name); }
        let _ = self.child.wait();
        self.state = EngineState::Dead;
    }
}

fn is_ready_line(line: &str) -> bool { line.trim() == "readyok" }

impl PerftEngine for EngineProcess {
    fn name(&self) -> &str { &self.name }

    fn perft(&mut self, state: &GameState, depth: u32) -> Result<PerftResult> {
        self.set_position(state)?;
        self.run_perft(depth)
    }

    fn terminate(&mut self) { self.shutdown(); }
}

impl Drop for EngineProcess {
    fn drop(&mut self) { self.shutdown(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readyok_tolerates_surrounding_whitespace() {
        assert!(is_ready_line("readyok"));
        assert!(is_ready_line("readyok \t"));
        assert!(is_ready_line("  readyok\r"));
        assert!(!is_ready_line("info string readyok"));
        assert!(!is_ready_line("uciok"));
    }
}
