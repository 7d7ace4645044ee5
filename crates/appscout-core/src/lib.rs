pub mod budget;
pub mod config;
pub mod error;
pub mod events;
pub mod persist;

pub use budget::{BudgetChecker, SessionBudget, StopReason};
pub use config::{ExplorerConfig, ScrollConfig};
pub use error::ExploreError;
pub use events::{EventSink, ExplorerEvent};
pub use persist::{ElementRow, MemorySink, PersistBatch, PersistError, PersistenceSink, StateRow};
