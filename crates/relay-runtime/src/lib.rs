//! # Relay Runtime
//!
//! Message channel runtime for the Hook-Relay ingress service.
//!
//! This library provides:
//! - A provider-agnostic [`RelayPublisher`] trait for durable, at-least-once
//!   publishing of webhook payloads
//! - A Google Cloud Pub/Sub publisher speaking the REST API
//! - An in-memory channel for tests and local development
//! - Google access-token providers shared by every Google API client
//!
//! ## Module Organization
//!
//! - [`error`] - Error types for all channel operations
//! - [`message`] - Message structures and identifiers
//! - [`provider`] - Provider types and configuration
//! - [`client`] - Publisher trait and factory
//! - [`auth`] - Access-token providers
//! - [`providers`] - Concrete channel implementations

pub mod auth;
pub mod client;
pub mod error;
pub mod message;
pub mod provider;
pub mod providers;

// Re-export commonly used types at crate root for convenience
pub use auth::{
    default_token_provider, AccessToken, AccessTokenProvider, MetadataServerTokenProvider,
    StaticTokenProvider,
};
pub use client::{RelayClientFactory, RelayPublisher};
pub use error::{AuthError, ConfigurationError, RelayError, ValidationError};
pub use message::{MessageId, RelayMessage, TopicPath};
pub use provider::{ChannelConfig, InMemoryConfig, ProviderType, PubSubConfig};
pub use providers::{InMemoryChannel, PubSubPublisher, PublishedMessage};
