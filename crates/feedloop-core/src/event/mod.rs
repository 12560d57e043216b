//! Decoded real-time events as delivered by a feed read.
//!
//! Payload bodies stay as raw JSON; each event type names the payload field
//! that carries its body so listeners receive only the relevant part.

mod kind;
mod model;

pub use kind::EventType;
pub use model::{Event, EventBatch, Initiator, User};
