//! Update polling: a single poll-and-summarize cycle, and the timed loop
//! that repeats it.

use std::time::Duration;

use chrono::Local;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use botgate_core::logging::UPDATE_TARGET;
use botgate_core::types::Update;

use crate::backend::BotBackend;
use crate::output::OutputBuffer;

/// Loop span used when the caller passes a blank duration: 7 days.
pub const BLANK_LOOP_DURATION_SECS: u64 = 604_800;
/// Interval between poll cycles when the caller passes none.
pub const DEFAULT_LOOP_INTERVAL_SECS: u64 = 2;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Loop duration in seconds from the raw caller input (`l`).
///
/// Absent means no loop (single poll); a blank value means "run for a week";
/// anything else is parsed and clamped to a minimum of 0.
pub fn loop_duration(raw: Option<&str>) -> u64 {
    match raw {
        None => 0,
        Some(s) if s.trim().is_empty() => BLANK_LOOP_DURATION_SECS,
        Some(s) => s.trim().parse::<i64>().map_or(0, |n| n.max(0) as u64),
    }
}

/// Poll interval in seconds from the raw caller input (`i`).
///
/// Absent or blank falls back to the default; anything else is parsed and
/// clamped to a minimum of 1.
pub fn loop_interval(raw: Option<&str>) -> u64 {
    match raw {
        None => DEFAULT_LOOP_INTERVAL_SECS,
        Some(s) if s.trim().is_empty() => DEFAULT_LOOP_INTERVAL_SECS,
        Some(s) => s.trim().parse::<i64>().map_or(1, |n| n.max(1) as u64),
    }
}

/// Result of one poll cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct PollSummary {
    /// Updates summarized in this cycle.
    pub processed: usize,
    /// True when the fetch failed (reported in output, never fatal).
    pub failed: bool,
}

pub struct PollLoop<'a, B> {
    backend: &'a B,
}

impl<'a, B: BotBackend> PollLoop<'a, B> {
    pub fn new(backend: &'a B) -> Self {
        Self { backend }
    }

    /// Fetch pending updates once and append a human-readable summary.
    ///
    /// A fetch failure becomes a timestamped output line instead of an
    /// error, so a surrounding loop survives transient platform trouble.
    pub async fn single_poll(&self, output: &mut OutputBuffer) -> PollSummary {
        let timestamp = Local::now().format(TIMESTAMP_FORMAT);

        match self.backend.fetch_updates().await {
            Ok(updates) => {
                output.append(format!(
                    "{timestamp} - Updates processed: {}",
                    updates.len()
                ));
                for update in &updates {
                    let (subject, text) = summarize(update);
                    info!(target: UPDATE_TARGET, subject, update_id = update.update_id, "update");
                    output.append(format!("{subject}: {text}"));
                }
                PollSummary {
                    processed: updates.len(),
                    failed: false,
                }
            }
            Err(e) => {
                warn!(error = %e, "update fetch failed");
                output.append(format!("{timestamp} - Failed to fetch updates: {e}"));
                PollSummary {
                    processed: 0,
                    failed: true,
                }
            }
        }
    }

    /// Poll repeatedly until `duration_secs` have elapsed, sleeping
    /// `interval_secs` between cycles.
    ///
    /// The deadline is only checked at the top of a cycle, so the loop may
    /// overrun it by up to one interval plus one poll's duration. The
    /// cancellation token is honored at the same points; left untriggered it
    /// changes nothing.
    pub async fn run_loop(
        &self,
        duration_secs: u64,
        interval_secs: u64,
        cancel: Option<&CancellationToken>,
        output: &mut OutputBuffer,
    ) -> PollSummary {
        let deadline = Instant::now() + Duration::from_secs(duration_secs);
        let interval = Duration::from_secs(interval_secs);
        debug!(duration_secs, interval_secs, "entering poll loop");

        let mut total = PollSummary::default();
        while Instant::now() < deadline {
            if cancel.is_some_and(|token| token.is_cancelled()) {
                debug!("poll loop cancelled");
                break;
            }

            let cycle = self.single_poll(output).await;
            total.processed += cycle.processed;
            total.failed |= cycle.failed;

            match cancel {
                Some(token) => {
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = token.cancelled() => {
                            debug!("poll loop cancelled during sleep");
                            break;
                        }
                    }
                }
                None => tokio::time::sleep(interval).await,
            }
        }

        debug!(processed = total.processed, "poll loop finished");
        total
    }
}

/// Derive the `subject: text` pair for one update.
///
/// Message updates use the sender id and message text; inline queries and
/// chosen inline results use the sender id and query text; anything else is
/// `0: Nothing`. Text is whitespace-normalized.
fn summarize(update: &Update) -> (i64, String) {
    if let Some(message) = &update.message {
        let subject = message.from.as_ref().map_or(0, |u| u.id);
        return (subject, normalize(message.text.as_deref().unwrap_or("")));
    }
    if let Some(query) = &update.inline_query {
        return (query.from.id, normalize(&query.query));
    }
    if let Some(chosen) = &update.chosen_inline_result {
        return (chosen.from.id, normalize(&chosen.query));
    }
    (0, "Nothing".to_string())
}

/// Collapse consecutive whitespace to single spaces and trim the ends.
fn normalize(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
