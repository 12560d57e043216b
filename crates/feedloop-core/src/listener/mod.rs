//! Subscribers and ordered, failure-isolated event dispatch.

mod context;
mod handler;
mod registry;

pub use context::DispatchContext;
pub use handler::RealTimeEventListener;
pub use registry::{DispatchReport, ListenerId, ListenerRegistry};
