//! Request-mode state machine for a messaging-bot installation.
//!
//! One invocation comes in with an action token and a config; the router
//! decides between webhook administration (set/unset/reset), forwarding a
//! validated inbound delivery, or polling for updates (once or on a timed
//! loop). The message-processing backend stays behind [`BotBackend`].

pub mod access;
pub mod backend;
pub mod output;
pub mod poll;
pub mod router;
pub mod webhook;

pub use backend::{BotBackend, WebhookOptions};
pub use output::OutputBuffer;
pub use poll::{PollLoop, PollSummary};
pub use router::RequestRouter;
pub use webhook::WebhookController;
