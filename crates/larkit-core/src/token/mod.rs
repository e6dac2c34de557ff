//! Access token lifecycle: issuance port and the caching manager.

pub mod issuer;
pub mod manager;

pub use issuer::{IssuerResponse, TokenIssuer};
pub use manager::TokenManager;
