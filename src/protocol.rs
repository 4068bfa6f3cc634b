//! Application message convention used by IM servers on top of the raw text stream.
//!
//! The supervisor forwards payloads untouched. Handlers that want structure can run a text
//! message through [`AppMessage::parse`]: JSON objects carrying a `type` field are
//! recognised, anything else is left to the caller.

use serde::Deserialize;

/// `type` of the server's reply to the credentials sent on connect.
pub const AUTH_RESPONSE_TYPE: &str = "auth_response";

/// A structured application message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppMessage {
    AuthResponse {
        success: bool,
        message: Option<String>,
    },
    /// Any other `type`. `raw` is the untouched payload.
    Other {
        kind: String,
        raw: String,
    },
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    message: Option<String>,
}

impl AppMessage {
    /// Returns `None` for payloads that are not a JSON object with a string `type`.
    pub fn parse(text: &str) -> Option<AppMessage> {
        let envelope: Envelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                if tracing::enabled!(tracing::Level::TRACE) {
                    tracing::trace!("Not an application message: {}", e);
                }
                return None;
            }
        };

        if envelope.kind == AUTH_RESPONSE_TYPE {
            Some(AppMessage::AuthResponse {
                success: envelope.success.unwrap_or(false),
                message: envelope.message,
            })
        } else {
            Some(AppMessage::Other {
                kind: envelope.kind,
                raw: text.to_string(),
            })
        }
    }

    pub fn kind(&self) -> &str {
        match self {
            AppMessage::AuthResponse { .. } => AUTH_RESPONSE_TYPE,
            AppMessage::Other { kind, .. } => kind,
        }
    }
}
