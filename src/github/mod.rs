//! GitHub implementation of the sync gateway.

pub mod client;
pub mod types;

pub use client::GitHubGateway;
