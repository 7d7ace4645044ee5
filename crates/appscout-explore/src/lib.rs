pub mod engine;
pub mod providers;
pub mod scroll;
pub mod session;
pub mod stuck;

pub use engine::{ExplorationEngine, ExplorationResult, Phase, SessionReport};
pub use providers::{ActionResult, ScrollDirection, SnapshotProvider, UiActionExecutor};
pub use session::ExplorationSession;
