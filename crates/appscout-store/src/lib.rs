pub mod graph;
pub mod state;
pub mod store;

pub use graph::{
    ActionDescriptor, ActionKind, GraphError, GraphSummary, NavigationEdge, NavigationGraph,
};
pub use state::ScreenState;
pub use store::{CaptureOutcome, ScreenStateStore, StoreStats, TransitionWait, WaitOptions};
