//! Feed handle, transport/auth contracts, and the feed lifecycle manager.
//!
//! The transport itself (HTTP, TLS, token acquisition) lives behind the
//! `DatafeedApi` and `AuthSession` traits. `memory` provides a scripted
//! in-process implementation of both. Services without a list call resume
//! the feed whose id a `FeedIdStore` kept from the previous run.

mod api;
mod handle;
mod lifecycle;
pub mod memory;
mod store;

pub use api::{AuthSession, DatafeedApi, FeedDescriptor, SessionTokens};
pub use handle::FeedHandle;
pub use lifecycle::{FeedDiscovery, FeedManager};
pub use store::{FeedIdStore, FileFeedIdStore};
