//! The alert channel seam.

use async_trait::async_trait;

use crate::error::AlertError;

/// A destination for alerts (email, chat webhook, pager...).
///
/// Implementations bound their own network time; the manager awaits each
/// send to completion.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    /// Short name for logs, e.g. `"email"`.
    fn name(&self) -> &str;

    async fn send(&self, subject: &str, body: &str) -> Result<(), AlertError>;
}
