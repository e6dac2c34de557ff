//! Lifecycle states of one inbound webhook request.

use std::fmt;

/// `Received -> Validated -> Decoded -> Dispatched -> Encoded -> Sent`,
/// or `Rejected` from any state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GatewayState {
    Received,
    Validated,
    Decoded,
    Dispatched,
    Encoded,
    Sent,
    Rejected,
}

impl GatewayState {
    pub fn as_str(&self) -> &'static str {
        match self {
            GatewayState::Received => "received",
            GatewayState::Validated => "validated",
            GatewayState::Decoded => "decoded",
            GatewayState::Dispatched => "dispatched",
            GatewayState::Encoded => "encoded",
            GatewayState::Sent => "sent",
            GatewayState::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, GatewayState::Sent | GatewayState::Rejected)
    }
}

impl fmt::Display for GatewayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
