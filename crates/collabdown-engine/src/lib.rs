pub mod preview;
pub mod sync;

#[cfg(test)]
pub mod tests;

// Re-export key types for easier usage
pub use preview::*;
pub use sync::{
    capture::*, cursors::*, editor::*, error::*, operation::*, oplog::*, position::*, relay::*,
    session::*,
};
