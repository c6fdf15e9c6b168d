//! The session-creation pipeline.
//!
//! - `session_builder`: maps a validated amount and configuration to the provider payload
//! - `interpreter`: turns whatever the provider (or the network) did into a `SessionResult`
//! - `session_creator`: runs build → invoke → interpret as one `Processor`

pub mod interpreter;
pub mod session_builder;
pub mod session_creator;

pub use interpreter::{ResponseInterpreter, status_default_message};
pub use session_builder::build_session_request;
pub use session_creator::SessionCreator;
