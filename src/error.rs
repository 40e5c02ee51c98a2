//! Errors raised by the grid snapshot host

use crate::models::BlockId;

#[derive(Debug, thiserror::Error)]
pub enum HostError {
    /// No programmable block with this name exists in the snapshot.
    #[error("controller block '{0}' not found (run 'load-sample' or add it to the blocks table)")]
    ControllerNotFound(String),

    /// The controller name must identify exactly one block.
    #[error("controller name '{name}' matches {count} blocks")]
    AmbiguousController { name: String, count: usize },

    #[error("block {0} is not a text surface")]
    NotATextSurface(BlockId),
}
