//! Domain types shared across the workspace.

use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ManagerError;

/// The caller-supplied mode selector (`a` parameter).
///
/// Constructed once at the boundary; everything downstream matches on it
/// exhaustively instead of re-comparing strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Set,
    Unset,
    Reset,
    Handle,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Set => "set",
            Action::Unset => "unset",
            Action::Reset => "reset",
            Action::Handle => "handle",
        }
    }
}

impl FromStr for Action {
    type Err = ManagerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "set" => Ok(Action::Set),
            "unset" => Ok(Action::Unset),
            "reset" => Ok(Action::Reset),
            "handle" => Ok(Action::Handle),
            other => Err(ManagerError::InvalidAction {
                token: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How the current invocation was triggered.
///
/// CLI-triggered runs are trusted implicitly: the secret check and source-IP
/// validation are skipped unless explicitly forced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunContext {
    /// Unattended execution (cron job, shell).
    Cli,
    /// A live inbound HTTP request.
    Web,
}

/// Read-only snapshot of the triggering event for one invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundRequest {
    pub action: Action,
    pub context: RunContext,
    /// Secret echoed by the caller (`s` parameter).
    #[serde(default)]
    pub secret_echo: Option<String>,
    /// Raw loop duration (`l`): absent = no loop, blank = 7-day default.
    #[serde(default)]
    pub loop_duration: Option<String>,
    /// Raw loop interval (`i`): absent/blank = 2s default.
    #[serde(default)]
    pub loop_interval: Option<String>,
    /// Transport-level remote address.
    #[serde(default)]
    pub remote_addr: Option<IpAddr>,
    /// Client-supplied forwarded-IP header (may be a comma-separated chain).
    #[serde(default)]
    pub forwarded_for: Option<String>,
    /// Client-supplied client-IP header.
    #[serde(default)]
    pub client_ip: Option<String>,
    /// Raw body of an inbound webhook delivery.
    #[serde(default)]
    pub raw_body: Option<String>,
}

impl InboundRequest {
    /// A bare request for the given action, everything else absent.
    pub fn new(action: Action, context: RunContext) -> Self {
        Self {
            action,
            context,
            secret_echo: None,
            loop_duration: None,
            loop_interval: None,
            remote_addr: None,
            forwarded_for: None,
            client_ip: None,
            raw_body: None,
        }
    }
}

// ── Update model ──────────────────────────────────────────────────────────────

/// The slice of a platform update the poll summary needs. Anything else in
/// the payload is ignored by serde.

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub from: Option<User>,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InlineQuery {
    pub from: User,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChosenInlineResult {
    pub from: User,
    #[serde(default)]
    pub query: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<Message>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inline_query: Option<InlineQuery>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chosen_inline_result: Option<ChosenInlineResult>,
}

pub type UpdateBatch = Vec<Update>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_parses_all_known_tokens() {
        assert_eq!("set".parse::<Action>().unwrap(), Action::Set);
        assert_eq!("unset".parse::<Action>().unwrap(), Action::Unset);
        assert_eq!("reset".parse::<Action>().unwrap(), Action::Reset);
        assert_eq!("handle".parse::<Action>().unwrap(), Action::Handle);
    }

    #[test]
    fn action_rejects_unknown_token() {
        let err = "poll".parse::<Action>().unwrap_err();
        assert!(matches!(
            err,
            ManagerError::InvalidAction { ref token } if token == "poll"
        ));
    }

    #[test]
    fn action_is_case_sensitive() {
        assert!("Set".parse::<Action>().is_err());
    }

    #[test]
    fn update_deserializes_message_payload() {
        let json = r#"{"update_id":1,"message":{"from":{"id":42},"text":"hi"}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        let msg = update.message.unwrap();
        assert_eq!(msg.from.unwrap().id, 42);
        assert_eq!(msg.text.as_deref(), Some("hi"));
    }

    #[test]
    fn update_tolerates_unknown_fields() {
        let json = r#"{"update_id":2,"edited_message":{"text":"x"}}"#;
        let update: Update = serde_json::from_str(json).unwrap();
        assert!(update.message.is_none());
    }
}
