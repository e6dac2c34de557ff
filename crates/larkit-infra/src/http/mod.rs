//! Outbound HTTP adapters.

pub mod token_client;

pub use token_client::HttpTokenIssuer;
