//! Client for the burger-ordering chat backend: a decoder for its streamed replies,
//! an HTTP client for its endpoints, and a session that keeps the order summary in sync.

pub mod api;
pub mod config;
pub mod observability;
pub mod runtime;
pub mod state;
pub mod types;
pub mod util;

#[cfg(test)]
mod test_support;
