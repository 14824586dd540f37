//! HTTP server relaying recipe generations.
//!
//! - [`recipe_api`]: Routes, shared state, handlers and error responses
//! - [`streaming`]: Relay from upstream events to a streamed response body

pub mod recipe_api;
pub mod streaming;
