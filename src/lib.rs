// Differential perft testing between two line-protocol chess engines
pub mod error;
pub mod config;
pub mod positions;
pub mod perft;
pub mod engine;
pub mod bisect;
pub mod session;
pub mod reference;
pub mod uci;

pub use bisect::{locate, DivergenceReport, LevelTrace, MoveDelta, SessionOutcome};
pub use config::{EngineConfig, SessionConfig, Timeouts};
pub use engine::{EngineProcess, EngineState, PerftEngine};
pub use error::{BisectError, ProtocolFault};
pub use perft::{PerftParser, PerftResult};
pub use positions::GameState;
pub use session::{run_session, Session};
