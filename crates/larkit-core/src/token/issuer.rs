//! Upstream token issuance port.
//!
//! The manager only needs the status code and the raw body: interpreting
//! the JSON (token field name, optional lifetime) is its job, so the body is
//! kept verbatim for diagnostics when issuance fails.

use std::future::Future;

use larkit_types::credential::CredentialSet;
use larkit_types::error::KernelError;

/// Raw upstream reply to a token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerResponse {
    pub status: u16,
    pub body: String,
}

impl IssuerResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Calls the token-issuance endpoint with a credential set.
///
/// Implementations bound the call with a timeout and report transport
/// failures as `KernelError::Transport`; they never retry.
pub trait TokenIssuer: Send + Sync {
    fn issue(
        &self,
        credentials: &CredentialSet,
    ) -> impl Future<Output = Result<IssuerResponse, KernelError>> + Send;
}
