//! Alert delivery errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid address {address:?}: {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build message: {0}")]
    Build(String),

    #[error("smtp error: {0}")]
    Smtp(String),

    #[error("webhook error: {0}")]
    Webhook(String),
}
