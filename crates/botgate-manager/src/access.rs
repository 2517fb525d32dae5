//! Access control for inbound invocations.
//!
//! Two independent checks: the shared-secret echo (all actions) and
//! source-IP allow-listing (webhook deliveries only). CLI-triggered runs are
//! trusted implicitly and skip both unless explicitly forced.

use std::net::IpAddr;

use tracing::debug;

use botgate_core::config::{ManagerConfig, TELEGRAM_IP_RANGE};
use botgate_core::error::{ManagerError, Result};
use botgate_core::types::{InboundRequest, RunContext};

/// Compare the caller's echoed secret against the configured one.
///
/// Skipped for CLI runs unless `force` is set. Exact, case-sensitive string
/// equality; a missing echo is a mismatch. The error message deliberately
/// carries no detail about which side was wrong.
pub fn validate_secret(
    request: &InboundRequest,
    configured_secret: Option<&str>,
    force: bool,
) -> Result<()> {
    if request.context == RunContext::Cli && !force {
        return Ok(());
    }

    match (configured_secret, request.secret_echo.as_deref()) {
        (Some(configured), Some(echo)) if configured == echo => Ok(()),
        _ => Err(ManagerError::AccessDenied("invalid secret".into())),
    }
}

/// Decide whether an inbound webhook delivery comes from an allow-listed
/// source.
///
/// Always true when request validation is disabled or the run is
/// CLI-triggered. Otherwise the effective client IP must fall inside the
/// built-in Telegram block or one of the configured extra ranges.
pub fn is_valid_webhook_source(request: &InboundRequest, config: &ManagerConfig) -> bool {
    if !config.validate_request || request.context == RunContext::Cli {
        return true;
    }

    let Some(ip) = effective_ip(request) else {
        debug!("webhook source rejected: no resolvable client IP");
        return false;
    };

    let allowed = std::iter::once(&TELEGRAM_IP_RANGE)
        .chain(config.allowed_ips.iter())
        .any(|range| range.contains(ip));

    if !allowed {
        debug!(ip = %ip, "webhook source rejected: IP outside allowed ranges");
    }
    allowed
}

/// Resolve the effective client IP for a delivery.
///
/// Header precedence: the forwarded-IP header (first element of a
/// comma-separated chain), then the client-IP header; the first value that
/// parses as an IP address wins over the transport-level remote address.
/// Trusting these headers is a documented trade-off for reverse-proxy
/// deployments, inherited from the platform's own guidance.
pub fn effective_ip(request: &InboundRequest) -> Option<IpAddr> {
    let header_candidates = [
        request
            .forwarded_for
            .as_deref()
            .and_then(|chain| chain.split(',').next()),
        request.client_ip.as_deref(),
    ];

    for candidate in header_candidates.into_iter().flatten() {
        if let Ok(ip) = candidate.trim().parse::<IpAddr>() {
            return Some(ip);
        }
    }

    request.remote_addr
}
