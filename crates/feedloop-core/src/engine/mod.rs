//! Poll loop: acquires a feed, reads it with a resumable cursor, recovers
//! stale feeds, and dispatches each batch before issuing the next read.

mod control;
mod error;
mod feed_loop;
mod state;

pub use control::StopHandle;
pub use error::FeedLoopError;
pub use feed_loop::{FeedLoop, FeedLoopOptions};
pub use state::LoopState;
