//! Remote transport implementations.
//!
//! These talk to cloud-hosted endpoints and require an API key.
//!
//! # Providers
//!
//! - **Messages** - Anthropic-style `/v1/messages` endpoint, type-tagged blocks

pub mod messages;

pub use messages::MessagesClient;
