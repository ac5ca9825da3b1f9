//! Message presentations for each BigLFG state.

use crate::request::{GroupRequest, Termination};

/// Text of the broadcast prompt.
pub fn prompt_message(prompt: &str, target_count: u32, timeout_mins: i64, marker: &str) -> String {
    format!(
        "📣 **BigLFG** — {prompt}\n\
         React with {marker} if you're in! Closes at {target_count} players \
         or after {timeout_mins} minutes without filling up."
    )
}

/// Text a request's messages are edited to when it leaves the store.
pub fn terminal_message(request: &GroupRequest, termination: Termination) -> String {
    match termination {
        Termination::Full => format!(
            "✅ **BigLFG full** — {}\n{} players are in. Have fun!",
            request.prompt, request.target_count
        ),
        Termination::Inactivity => format!(
            "⌛ ~~BigLFG — {}~~\nCancelled due to inactivity.",
            request.prompt
        ),
        Termination::Organiser => format!(
            "🛑 ~~BigLFG — {}~~\nCancelled by the organiser.",
            request.prompt
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::DistributedMessage;
    use chrono::{TimeDelta, Utc};
    use lfgrelay_core::types::{ChannelId, MessageId};

    fn request() -> GroupRequest {
        GroupRequest::new(
            "Dungeon run tonight",
            vec![DistributedMessage {
                channel: ChannelId(1),
                message: MessageId(2),
            }],
            4,
            TimeDelta::minutes(15),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn test_prompt_mentions_marker_and_limits() {
        let text = prompt_message("Dungeon run tonight", 4, 15, "👍");
        assert!(text.contains("Dungeon run tonight"));
        assert!(text.contains("👍"));
        assert!(text.contains("4 players"));
        assert!(text.contains("15 minutes"));
    }

    #[test]
    fn test_terminal_messages_differ() {
        let req = request();
        let full = terminal_message(&req, Termination::Full);
        let inactive = terminal_message(&req, Termination::Inactivity);
        let organiser = terminal_message(&req, Termination::Organiser);
        assert!(full.contains("full"));
        assert!(inactive.contains("inactivity"));
        assert!(organiser.contains("organiser"));
        assert!(inactive.contains("Dungeon run tonight"));
    }
}
