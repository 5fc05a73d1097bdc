//! Webhook authentication
//!
//! Drive echoes the channel token given at registration in the
//! `X-Goog-Channel-Token` header of every notification. A notification whose
//! token does not match exactly is rejected before any processing.

use crate::domain::RelayError;

/// Header carrying the channel token on inbound notifications
pub const CHANNEL_TOKEN_HEADER: &str = "x-goog-channel-token";

/// Checks inbound channel tokens against the configured shared secret
#[derive(Debug, Clone)]
pub struct WebhookAuthenticator {
    expected: String,
}

impl WebhookAuthenticator {
    pub fn new(expected: impl Into<String>) -> Self {
        Self {
            expected: expected.into(),
        }
    }

    /// Returns true if `inbound` equals the shared secret
    ///
    /// A missing header never matches.
    pub fn authenticate(&self, inbound: Option<&str>) -> bool {
        inbound.is_some_and(|token| token == self.expected)
    }

    /// Gate used by the webhook route; a mismatch is [`RelayError::Unauthorized`]
    pub fn verify(&self, inbound: Option<&str>) -> Result<(), RelayError> {
        if self.authenticate(inbound) {
            Ok(())
        } else {
            Err(RelayError::Unauthorized)
        }
    }
}
