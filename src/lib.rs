//! searchbridge: an MCP server exposing a hosted search index as tools.
//!
//! The pipeline is: normalize union-shaped tool arguments
//! ([`normalize`], [`vectors`], [`options`]), compose the backend query
//! against process defaults ([`compose`]), execute it ([`backend`]), shape
//! the raw documents ([`shape`]), and wrap everything in the response
//! envelope ([`envelope`]). [`server`] speaks JSON-RPC over stdio on top.

pub mod backend;
pub mod cli;
pub mod client;
pub mod compose;
pub mod config;
pub mod envelope;
pub mod error;
pub mod normalize;
pub mod options;
pub mod protocol;
pub mod server;
pub mod shape;
pub mod tools;
pub mod vectors;

pub use client::SearchClient;
pub use config::Config;
pub use error::{BridgeError, Result};
