//! Webhook registration against the upstream platform.

use std::time::Duration;

use tracing::info;

use botgate_core::config::{ManagerConfig, WebhookConfig};
use botgate_core::error::{ManagerError, Result};

use crate::backend::{BotBackend, WebhookOptions};
use crate::output::OutputBuffer;

/// Pause between deregistration and re-registration during a reset, so the
/// two calls stay under the platform's rate limit for webhook changes.
const RESET_PAUSE: Duration = Duration::from_secs(1);

/// Drives the set/unset/reset operations. Every platform answer is appended
/// to the output buffer, "not ok" descriptions included; only transport
/// failures propagate as errors.
pub struct WebhookController<'a, B> {
    backend: &'a B,
    config: &'a ManagerConfig,
}

impl<'a, B: BotBackend> WebhookController<'a, B> {
    pub fn new(backend: &'a B, config: &'a ManagerConfig) -> Self {
        Self { backend, config }
    }

    /// Register the configured webhook URL with the platform.
    pub async fn set(&self, output: &mut OutputBuffer) -> Result<()> {
        let webhook = self.require_webhook()?;

        // The callback URL routes the delivery back into handle mode and
        // carries the shared secret for the echo check.
        let secret = self.config.secret.as_deref().unwrap_or("");
        let url = format!("{}?a=handle&s={}", webhook.url, secret);
        let options = registration_options(webhook);

        info!(url = %webhook.url, "registering webhook");
        let description = self.backend.register_webhook(&url, &options).await?;
        output.append(description);
        Ok(())
    }

    /// Deregister the current webhook.
    pub async fn unset(&self, output: &mut OutputBuffer) -> Result<()> {
        info!("deregistering webhook");
        let description = self.backend.deregister_webhook().await?;
        output.append(description);
        Ok(())
    }

    /// Deregister, pause, then register again.
    pub async fn reset(&self, output: &mut OutputBuffer) -> Result<()> {
        // Fail before touching the platform when no URL is configured.
        self.require_webhook()?;

        self.unset(output).await?;
        tokio::time::sleep(RESET_PAUSE).await;
        self.set(output).await
    }

    fn require_webhook(&self) -> Result<&WebhookConfig> {
        self.config.webhook.as_ref().ok_or(ManagerError::InvalidWebhook)
    }
}

/// Reduce the configured options to the non-null entries the platform call
/// should carry.
fn registration_options(webhook: &WebhookConfig) -> WebhookOptions {
    let mut options = WebhookOptions::new();
    if let Some(certificate) = &webhook.certificate {
        options.insert("certificate".into(), certificate.clone().into());
    }
    if let Some(max_connections) = webhook.max_connections {
        options.insert("max_connections".into(), max_connections.into());
    }
    if let Some(allowed_updates) = &webhook.allowed_updates {
        options.insert(
            "allowed_updates".into(),
            serde_json::to_value(allowed_updates).unwrap_or_default(),
        );
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_contain_only_non_null_entries() {
        let webhook = WebhookConfig {
            url: "https://example.com/hook".into(),
            certificate: None,
            max_connections: Some(40),
            allowed_updates: None,
        };
        let options = registration_options(&webhook);
        assert_eq!(options.len(), 1);
        assert_eq!(options["max_connections"], 40);
    }

    #[test]
    fn options_empty_when_nothing_configured() {
        let webhook = WebhookConfig {
            url: "https://example.com/hook".into(),
            certificate: None,
            max_connections: None,
            allowed_updates: None,
        };
        assert!(registration_options(&webhook).is_empty());
    }

    #[test]
    fn allowed_updates_serialized_as_array() {
        let webhook = WebhookConfig {
            url: "https://example.com/hook".into(),
            certificate: None,
            max_connections: None,
            allowed_updates: Some(vec!["message".into(), "inline_query".into()]),
        };
        let options = registration_options(&webhook);
        assert_eq!(
            options["allowed_updates"],
            serde_json::json!(["message", "inline_query"])
        );
    }
}
