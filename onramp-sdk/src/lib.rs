//! Shared types for the on-ramp session relay.
//!
//! `objects` holds every JSON body exchanged with the relay and with the
//! upstream provider. The `client` feature adds a typed HTTP client for the
//! relay API.

#[cfg(feature = "client")]
pub mod client;
pub mod objects;
