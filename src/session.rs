use crate::bisect::{bisect, SessionOutcome};
use crate::config::SessionConfig;
use crate::engine::{EngineProcess, PerftEngine};
use crate::error::Result;
use log::info;

/// Run a full bisection and terminate both engines exactly once, whatever the result.
pub fn run_session<A, B>(a: &mut A, b: &mut B, root_fen: &str, depth: u32) -> Result<SessionOutcome>
where
    A: PerftEngine + ?Sized,
    B: PerftEngine + ?Sized,
{
    let outcome = bisect(a, b, root_fen, depth);
    a.terminate();
    b.terminate();
    outcome
}

/// Two engines owned for the lifetime of one bisection.
pub struct Session<A: PerftEngine, B: PerftEngine> {
    engine_a: A,
    engine_b: B,
}

impl Session<EngineProcess, EngineProcess> {
    /// Spawn and handshake both engines. Anything already started is
    /// terminated before an error is returned.
    pub fn start(cfg: &SessionConfig) -> Result<Self> {
        cfg.validate()?;
        info!("starting {} ({})", cfg.engine_a.name, cfg.engine_a.path.display());
        let mut a = EngineProcess::start(&cfg.engine_a, cfg.timeouts)?;
        info!("starting {} ({})", cfg.engine_b.name, cfg.engine_b.path.display());
        let mut b = match EngineProcess::start(&cfg.engine_b, cfg.timeouts) {
            Ok(b) => b,
            Err(e) => {
                a.terminate();
                return Err(e);
            }
        };
        if let Err(e) = a.initialize().and_then(|_| b.initialize()) {
            a.terminate();
            b.terminate();
            return Err(e);
        }
        Ok(Self::new(a, b))
    }
}

impl<A: PerftEngine, B: PerftEngine> Session<A, B> {
    pub fn new(engine_a: A, engine_b: B) -> Self { Self { engine_a, engine_b } }

    pub fn engines(&self) -> (&A, &B) { (&self.engine_a, &self.engine_b) }

    /// Bisect from `root_fen` at `depth`; both engines are terminated on return.
    pub fn run(&mut self, root_fen: &str, depth: u32) -> Result<SessionOutcome> {
        run_session(&mut self.engine_a, &mut self.engine_b, root_fen, depth)
    }
}
