pub mod fingerprint;
pub mod tree;

pub use fingerprint::{fingerprint, Fingerprint};
pub use tree::{Bounds, NodeRole, ScreenSnapshot, UiNode};
