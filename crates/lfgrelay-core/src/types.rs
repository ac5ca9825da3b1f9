//! Platform ids and message payloads.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim().parse().map($name)
            }
        }

        impl From<u64> for $name {
            fn from(v: u64) -> Self {
                $name(v)
            }
        }
    };
}

snowflake_id!(
    /// A text channel on the chat platform.
    ChannelId
);
snowflake_id!(
    /// A posted message. Only unique together with its channel on some platforms,
    /// but Discord snowflakes are globally unique.
    MessageId
);
snowflake_id!(
    /// A community (server / guild).
    GuildId
);

/// A message seen on a registered channel, as handed to the relay.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub channel_id: ChannelId,
    pub guild_id: GuildId,
    pub author_name: String,
    pub author_avatar_url: Option<String>,
    pub content: String,
    /// Posted by a bot account (including ourselves).
    #[serde(default)]
    pub author_is_bot: bool,
    /// Posted through a webhook, e.g. a message we relayed earlier.
    #[serde(default)]
    pub from_webhook: bool,
}

/// Body of a webhook execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookPayload {
    pub content: String,
    pub username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_parse_and_display() {
        let id: ChannelId = " 1234567890 ".parse().unwrap();
        assert_eq!(id, ChannelId(1234567890));
        assert_eq!(id.to_string(), "1234567890");
        assert!("abc".parse::<MessageId>().is_err());
    }

    #[test]
    fn test_id_serializes_as_number() {
        let json = serde_json::to_string(&GuildId(99)).unwrap();
        assert_eq!(json, "99");
    }

    #[test]
    fn test_webhook_payload_omits_missing_avatar() {
        let payload = WebhookPayload {
            content: "hi".into(),
            username: "ana".into(),
            avatar_url: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("avatar_url").is_none());
    }
}
