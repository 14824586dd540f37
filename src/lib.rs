//! recipe-relay: pantry items in, streamed recipes out.
//!
//! Accepts a list of pantry items over HTTP, renders a recipe prompt from
//! them, and relays a streaming chat-completion back to the caller as raw
//! text fragments.

pub mod config;
pub mod recipe;
pub mod server;
pub mod upstream;
