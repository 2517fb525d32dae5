//! The message-processing backend collaborator.
//!
//! The manager never talks to the platform itself; every network-facing
//! primitive lives behind this trait. Implementations own their transport
//! (connection per call, no pooling or retries imposed here).

use std::collections::BTreeMap;

use async_trait::async_trait;

use botgate_core::error::PlatformError;
use botgate_core::types::UpdateBatch;

/// Webhook registration options, already reduced to the non-null entries.
pub type WebhookOptions = serde_json::Map<String, serde_json::Value>;

/// Narrow interface to the message-processing backend.
///
/// The async operations return the platform's textual status description on
/// success; a platform-level "not ok" answer is still an `Ok` description.
/// Only transport/protocol breakage surfaces as [`PlatformError`].
///
/// The extras setters are optional knobs forwarded from configuration before
/// a handle-mode run; the defaults ignore them.
#[async_trait]
pub trait BotBackend: Send + Sync {
    /// Fetch pending updates from the platform (one long-poll cycle).
    async fn fetch_updates(&self) -> Result<UpdateBatch, PlatformError>;

    /// Register `url` as the webhook endpoint with the given options.
    async fn register_webhook(
        &self,
        url: &str,
        options: &WebhookOptions,
    ) -> Result<String, PlatformError>;

    /// Deregister the currently registered webhook endpoint.
    async fn deregister_webhook(&self) -> Result<String, PlatformError>;

    /// Process one raw inbound webhook delivery body.
    async fn handle_inbound_delivery(&self, raw_body: &str) -> Result<(), PlatformError>;

    // ── Extras setters ────────────────────────────────────────────────────

    fn set_admins(&self, _admins: &[i64]) {}
    fn set_storage(&self, _dsn: &str) {}
    fn add_command_paths(&self, _paths: &[String]) {}
    fn set_custom_input(&self, _raw: &str) {}
    fn set_download_path(&self, _path: &str) {}
    fn set_upload_path(&self, _path: &str) {}
    fn set_command_configs(&self, _configs: &BTreeMap<String, serde_json::Value>) {}
    fn enable_analytics(&self, _enabled: bool) {}
    fn enable_limiter(&self, _enabled: bool) {}
}
