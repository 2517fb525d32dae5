use std::collections::BTreeMap;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr};
use std::str::FromStr;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{ManagerError, Result};

/// Telegram's published IP block for webhook deliveries.
pub const TELEGRAM_IP_RANGE: IpRange = IpRange {
    start: u32::from_be_bytes([149, 154, 167, 197]),
    end: u32::from_be_bytes([149, 154, 167, 233]),
};

/// Top-level config (botgate.toml + BOTGATE_* env overrides).
///
/// Built once per invocation and never mutated afterwards. `load` runs
/// `validate` so a constructed config is always internally consistent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Bot API token for the upstream platform.
    pub api_key: String,
    /// Shared secret echoed back by callers (`s` parameter).
    #[serde(default)]
    pub secret: Option<String>,
    /// When false, inbound webhook deliveries skip source-IP validation.
    #[serde(default = "bool_true")]
    pub validate_request: bool,
    /// Extra allow-listed source ranges, unioned with [`TELEGRAM_IP_RANGE`].
    #[serde(default)]
    pub allowed_ips: Vec<IpRange>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
    /// Logging sink destinations, keyed by sink name (debug, error, update).
    /// Unknown keys are accepted here and ignored by the initializer.
    #[serde(default)]
    pub logging: BTreeMap<String, String>,
    #[serde(default)]
    pub extras: ExtrasConfig,
}

/// Webhook registration options. Only non-null entries are sent upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Absolute https URL the platform will deliver updates to.
    pub url: String,
    pub certificate: Option<String>,
    pub max_connections: Option<u32>,
    pub allowed_updates: Option<Vec<String>>,
}

/// Optional backend knobs forwarded verbatim when present, skipped when absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExtrasConfig {
    pub admins: Option<Vec<i64>>,
    /// Storage backend DSN (e.g. a MySQL connection string).
    pub storage: Option<String>,
    /// Extra search paths for command plugins.
    pub command_paths: Option<Vec<String>>,
    /// Raw update JSON that overrides the real input (test harness hook).
    pub custom_input: Option<String>,
    pub download_path: Option<String>,
    pub upload_path: Option<String>,
    /// Per-command configuration objects, keyed by command name.
    pub command_configs: Option<BTreeMap<String, serde_json::Value>>,
    pub analytics: Option<bool>,
    pub limiter: Option<bool>,
}

fn bool_true() -> bool {
    true
}

impl ManagerConfig {
    /// Load config from a TOML file with BOTGATE_* env var overrides,
    /// then validate it.
    pub fn load(config_path: Option<&str>) -> Result<Self> {
        let path = config_path.unwrap_or("botgate.toml");

        let config: ManagerConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("BOTGATE_").split("__"))
            .extract()
            .map_err(|e| ManagerError::Config(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Invariants the rest of the system relies on:
    /// - a configured webhook URL is an absolute http(s) URL
    /// - the secret is a non-empty string when request validation is enabled
    pub fn validate(&self) -> Result<()> {
        if let Some(webhook) = &self.webhook {
            let parsed = url::Url::parse(&webhook.url)
                .map_err(|e| ManagerError::Config(format!("webhook.url: {e}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ManagerError::Config(format!(
                    "webhook.url: unsupported scheme '{}'",
                    parsed.scheme()
                )));
            }
        }

        if self.validate_request && self.secret.as_deref().unwrap_or("").is_empty() {
            return Err(ManagerError::Config(
                "secret must be a non-empty string when validate_request is enabled".into(),
            ));
        }

        Ok(())
    }
}

/// An inclusive IPv4 range used for source allow-listing.
///
/// Accepted entry syntaxes:
/// - `"1.2.3.4"`: single address
/// - `"1.2.3.0/24"`: CIDR block
/// - `"1.2.3.4-1.2.3.9"`: dashed inclusive range
///
/// Membership is numeric comparison on the 32-bit address value, never
/// string prefix matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IpRange {
    start: u32,
    end: u32,
}

impl IpRange {
    /// Returns `true` when `ip` lies inside the range (inclusive).
    /// IPv6 addresses never match.
    pub fn contains(&self, ip: IpAddr) -> bool {
        match ip {
            IpAddr::V4(v4) => {
                let n = u32::from(v4);
                self.start <= n && n <= self.end
            }
            IpAddr::V6(_) => false,
        }
    }
}

impl FromStr for IpRange {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || ManagerError::Config(format!("invalid IP range entry: '{s}'"));

        if let Some((start, end)) = s.split_once('-') {
            let start: Ipv4Addr = start.trim().parse().map_err(|_| bad())?;
            let end: Ipv4Addr = end.trim().parse().map_err(|_| bad())?;
            let (start, end) = (u32::from(start), u32::from(end));
            if start > end {
                return Err(bad());
            }
            return Ok(IpRange { start, end });
        }

        if let Some((addr, prefix)) = s.split_once('/') {
            let addr: Ipv4Addr = addr.trim().parse().map_err(|_| bad())?;
            let prefix: u32 = prefix.trim().parse().map_err(|_| bad())?;
            if prefix > 32 {
                return Err(bad());
            }
            let mask = if prefix == 0 { 0 } else { u32::MAX << (32 - prefix) };
            let base = u32::from(addr) & mask;
            return Ok(IpRange {
                start: base,
                end: base | !mask,
            });
        }

        let addr: Ipv4Addr = s.trim().parse().map_err(|_| bad())?;
        let n = u32::from(addr);
        Ok(IpRange { start: n, end: n })
    }
}

impl TryFrom<String> for IpRange {
    type Error = ManagerError;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<IpRange> for String {
    fn from(r: IpRange) -> String {
        r.to_string()
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let start = Ipv4Addr::from(self.start);
        if self.start == self.end {
            write!(f, "{start}")
        } else {
            write!(f, "{start}-{}", Ipv4Addr::from(self.end))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn single_address_range() {
        let r: IpRange = "10.0.0.1".parse().unwrap();
        assert!(r.contains(ip("10.0.0.1")));
        assert!(!r.contains(ip("10.0.0.2")));
    }

    #[test]
    fn dashed_range_is_inclusive_at_both_ends() {
        let r: IpRange = "149.154.167.197-149.154.167.233".parse().unwrap();
        assert!(r.contains(ip("149.154.167.197")));
        assert!(r.contains(ip("149.154.167.233")));
        assert!(r.contains(ip("149.154.167.200")));
        assert!(!r.contains(ip("149.154.167.196")));
        assert!(!r.contains(ip("149.154.167.234")));
    }

    #[test]
    fn cidr_block() {
        let r: IpRange = "192.168.1.0/24".parse().unwrap();
        assert!(r.contains(ip("192.168.1.0")));
        assert!(r.contains(ip("192.168.1.255")));
        assert!(!r.contains(ip("192.168.2.0")));
    }

    #[test]
    fn numeric_not_string_prefix_matching() {
        // "1.2.3.4" must not match "1.2.3.40" the way a prefix check would.
        let r: IpRange = "1.2.3.4".parse().unwrap();
        assert!(!r.contains(ip("1.2.3.40")));
    }

    #[test]
    fn ipv6_never_matches() {
        let r: IpRange = "0.0.0.0/0".parse().unwrap();
        assert!(!r.contains(ip("::1")));
    }

    #[test]
    fn malformed_entries_rejected() {
        assert!("not-an-ip".parse::<IpRange>().is_err());
        assert!("10.0.0.9-10.0.0.1".parse::<IpRange>().is_err());
        assert!("10.0.0.0/33".parse::<IpRange>().is_err());
    }

    #[test]
    fn builtin_telegram_range_bounds() {
        assert!(TELEGRAM_IP_RANGE.contains(ip("149.154.167.197")));
        assert!(TELEGRAM_IP_RANGE.contains(ip("149.154.167.233")));
        assert!(!TELEGRAM_IP_RANGE.contains(ip("1.2.3.4")));
    }

    fn base_config() -> ManagerConfig {
        ManagerConfig {
            api_key: "token".into(),
            secret: Some("s3cret".into()),
            validate_request: true,
            allowed_ips: vec![],
            webhook: None,
            logging: BTreeMap::new(),
            extras: ExtrasConfig::default(),
        }
    }

    #[test]
    fn validate_accepts_absolute_https_webhook_url() {
        let mut cfg = base_config();
        cfg.webhook = Some(WebhookConfig {
            url: "https://example.com/hook".into(),
            certificate: None,
            max_connections: None,
            allowed_updates: None,
        });
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn validate_rejects_relative_webhook_url() {
        let mut cfg = base_config();
        cfg.webhook = Some(WebhookConfig {
            url: "/hook".into(),
            certificate: None,
            max_connections: None,
            allowed_updates: None,
        });
        assert!(matches!(cfg.validate(), Err(ManagerError::Config(_))));
    }

    #[test]
    fn validate_rejects_empty_secret_when_validation_enabled() {
        let mut cfg = base_config();
        cfg.secret = Some(String::new());
        assert!(cfg.validate().is_err());
        cfg.secret = None;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn validate_allows_missing_secret_when_validation_disabled() {
        let mut cfg = base_config();
        cfg.secret = None;
        cfg.validate_request = false;
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn load_from_toml() {
        figment::Jail::expect_with(|jail| {
            jail.create_file(
                "botgate.toml",
                r#"
                    api_key = "12345:token"
                    secret = "super_secret"
                    allowed_ips = ["10.0.0.0/8"]

                    [webhook]
                    url = "https://example.com/hook"
                    max_connections = 20

                    [logging]
                    debug = "/tmp/debug.log"
                "#,
            )?;
            let cfg = ManagerConfig::load(Some("botgate.toml")).unwrap();
            assert_eq!(cfg.api_key, "12345:token");
            assert_eq!(cfg.allowed_ips.len(), 1);
            assert_eq!(cfg.webhook.unwrap().max_connections, Some(20));
            assert_eq!(cfg.logging.get("debug").unwrap(), "/tmp/debug.log");
            Ok(())
        });
    }
}
