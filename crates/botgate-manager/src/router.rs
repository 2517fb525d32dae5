//! Top-level request routing: one invocation in, one mode out.

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use botgate_core::config::{ExtrasConfig, ManagerConfig};
use botgate_core::error::{ManagerError, Result};
use botgate_core::types::{Action, InboundRequest};
use botgate_core::logging;

use crate::access;
use crate::backend::BotBackend;
use crate::output::OutputBuffer;
use crate::poll::{self, PollLoop};
use crate::webhook::WebhookController;

/// Sequences one invocation: logging, secret check, then the mode selected
/// by the request's action.
///
/// Owns the output buffer for the duration of the run; callers read or
/// drain it afterwards.
pub struct RequestRouter<B> {
    config: ManagerConfig,
    backend: B,
    output: OutputBuffer,
    cancel: Option<CancellationToken>,
    force_secret_check: bool,
}

impl<B: BotBackend> RequestRouter<B> {
    /// Router with the default output sink: buffered and echoed to stdout.
    pub fn new(config: ManagerConfig, backend: B) -> Self {
        Self {
            config,
            backend,
            output: OutputBuffer::echoing(),
            cancel: None,
            force_secret_check: false,
        }
    }

    /// Replace the output sink (test harnesses, embedding callers).
    pub fn with_output(mut self, output: OutputBuffer) -> Self {
        self.output = output;
        self
    }

    /// Honor this token inside the poll loop.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// Require the secret echo even for CLI-triggered runs.
    pub fn force_secret_check(mut self) -> Self {
        self.force_secret_check = true;
        self
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Return the accumulated output and clear the buffer.
    pub fn drain_output(&mut self) -> String {
        self.output.drain()
    }

    /// Run one invocation end to end.
    ///
    /// 1. Initialize logging sinks from configuration.
    /// 2. Secret check; any failure aborts the run.
    /// 3. Branch on the action: webhook administration, or handle mode
    ///    (poll vs inbound delivery).
    pub async fn run(&mut self, request: &InboundRequest) -> Result<()> {
        logging::init_sinks(&self.config.logging)?;

        access::validate_secret(
            request,
            self.config.secret.as_deref(),
            self.force_secret_check,
        )?;

        info!(action = %request.action, "request accepted");

        // Administrative actions never perform source-IP validation; they
        // are caller-initiated, not platform deliveries.
        match request.action {
            Action::Set => {
                WebhookController::new(&self.backend, &self.config)
                    .set(&mut self.output)
                    .await
            }
            Action::Unset => {
                WebhookController::new(&self.backend, &self.config)
                    .unset(&mut self.output)
                    .await
            }
            Action::Reset => {
                WebhookController::new(&self.backend, &self.config)
                    .reset(&mut self.output)
                    .await
            }
            Action::Handle => self.handle(request).await,
        }
    }

    /// Handle mode: apply backend extras, then either poll for updates (no
    /// webhook configured) or validate and forward an inbound delivery.
    async fn handle(&mut self, request: &InboundRequest) -> Result<()> {
        apply_extras(&self.backend, &self.config.extras);

        if self.config.webhook.is_none() {
            let duration = poll::loop_duration(request.loop_duration.as_deref());
            let poller = PollLoop::new(&self.backend);
            if duration > 0 {
                let interval = poll::loop_interval(request.loop_interval.as_deref());
                poller
                    .run_loop(duration, interval, self.cancel.as_ref(), &mut self.output)
                    .await;
            } else {
                poller.single_poll(&mut self.output).await;
            }
            return Ok(());
        }

        if !access::is_valid_webhook_source(request, &self.config) {
            return Err(ManagerError::AccessDenied("source not allowed".into()));
        }

        let raw_body = request.raw_body.as_deref().unwrap_or("");
        debug!(bytes = raw_body.len(), "dispatching inbound delivery");
        self.backend.handle_inbound_delivery(raw_body).await?;
        Ok(())
    }
}

/// Forward each present extras field to the matching backend setter, in a
/// fixed order, exactly once. Absent fields are skipped.
fn apply_extras<B: BotBackend>(backend: &B, extras: &ExtrasConfig) {
    if let Some(admins) = &extras.admins {
        backend.set_admins(admins);
    }
    if let Some(dsn) = &extras.storage {
        backend.set_storage(dsn);
    }
    if let Some(paths) = &extras.command_paths {
        backend.add_command_paths(paths);
    }
    if let Some(raw) = &extras.custom_input {
        backend.set_custom_input(raw);
    }
    if let Some(path) = &extras.download_path {
        backend.set_download_path(path);
    }
    if let Some(path) = &extras.upload_path {
        backend.set_upload_path(path);
    }
    if let Some(configs) = &extras.command_configs {
        backend.set_command_configs(configs);
    }
    if let Some(enabled) = extras.analytics {
        backend.enable_analytics(enabled);
    }
    if let Some(enabled) = extras.limiter {
        backend.enable_limiter(enabled);
    }
}
