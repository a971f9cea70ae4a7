//! schedwatch-alert — getting alerts in front of an operator.
//!
//! [`AlertManager`] echoes every alert to the console and then tries each
//! configured [`AlertChannel`]. A shared cooldown keeps an ongoing outage
//! from flooding the channels: once any channel delivers, further alerts
//! within the cooldown are only echoed locally.
//!
//! Channels fail independently. An SMTP outage never stops the webhook
//! from being attempted, and neither stops the caller.

pub mod channel;
pub mod email;
pub mod error;
pub mod manager;
pub mod webhook;

pub use channel::AlertChannel;
pub use email::EmailChannel;
pub use error::AlertError;
pub use manager::{console_banner, AlertManager, DispatchReport};
pub use webhook::WebhookChannel;

/// Make `ring` the process-wide rustls provider before any TLS client is
/// built. Both the SMTP and the HTTP client link rustls; without an
/// installed default they may disagree on which provider to use.
pub(crate) fn install_crypto_provider() {
    // Already installed (by us or the embedding application) is fine.
    let _ = rustls::crypto::ring::default_provider().install_default();
}
