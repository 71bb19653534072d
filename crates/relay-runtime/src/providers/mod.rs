//! Channel provider implementations.

pub mod memory;
pub mod pubsub;

pub use memory::{InMemoryChannel, PublishedMessage};
pub use pubsub::PubSubPublisher;
