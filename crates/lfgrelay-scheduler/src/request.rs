//! BigLFG request definitions — the data model the lifecycle engine reconciles.

use chrono::{DateTime, TimeDelta, Utc};
use lfgrelay_core::error::{LfgError, Result};
use lfgrelay_core::types::{ChannelId, MessageId};

/// One broadcast copy of a BigLFG prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DistributedMessage {
    pub channel: ChannelId,
    pub message: MessageId,
}

/// An active BigLFG prompt.
#[derive(Debug, Clone, PartialEq)]
pub struct GroupRequest {
    /// Id of the first broadcast message; the store key.
    pub id: MessageId,
    /// Free-text description shown to users.
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    /// `created_at + timeout`, fixed at creation.
    pub deadline: DateTime<Utc>,
    pub timeout: TimeDelta,
    /// Interested-party count at which the request is full.
    pub target_count: u32,
    /// Latest observed interest, bot reaction excluded. Replaced on each poll, never summed.
    pub current_count: u32,
    distributed_messages: Vec<DistributedMessage>,
}

impl GroupRequest {
    /// Build a request from the messages that were actually posted.
    pub fn new(
        prompt: &str,
        distributed_messages: Vec<DistributedMessage>,
        target_count: u32,
        timeout: TimeDelta,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        let first = distributed_messages.first().ok_or(LfgError::EmptyBroadcast)?;
        let deadline = now
            .checked_add_signed(timeout)
            .ok_or_else(|| LfgError::Config(format!("BigLFG timeout {timeout} is out of range")))?;
        Ok(Self {
            id: first.message,
            prompt: prompt.to_string(),
            created_at: now,
            deadline,
            timeout,
            target_count,
            current_count: 0,
            distributed_messages,
        })
    }

    /// The fixed broadcast set, in send order.
    pub fn distributed_messages(&self) -> &[DistributedMessage] {
        &self.distributed_messages
    }

    /// Strictly past the timeout.
    pub fn is_timed_out(&self, now: DateTime<Utc>) -> bool {
        now - self.created_at > self.timeout
    }

    pub fn is_full(&self) -> bool {
        self.current_count >= self.target_count
    }
}

/// Result of reconciling one request in one pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Still collecting interest.
    Active,
    /// Removed after the timeout elapsed.
    Cancelled,
    /// Removed after reaching the target count.
    Full,
}

/// Why a request left the store; selects the final presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    Inactivity,
    Full,
    Organiser,
}

impl Termination {
    pub fn outcome(self) -> TickOutcome {
        match self {
            Termination::Full => TickOutcome::Full,
            Termination::Inactivity | Termination::Organiser => TickOutcome::Cancelled,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn msgs(ids: &[(u64, u64)]) -> Vec<DistributedMessage> {
        ids.iter()
            .map(|(c, m)| DistributedMessage {
                channel: ChannelId(*c),
                message: MessageId(*m),
            })
            .collect()
    }

    #[test]
    fn test_new_uses_first_message_as_id() {
        let now = Utc::now();
        let req = GroupRequest::new("raid", msgs(&[(1, 100), (2, 200)]), 4, TimeDelta::minutes(15), now)
            .unwrap();
        assert_eq!(req.id, MessageId(100));
        assert_eq!(req.deadline, now + TimeDelta::minutes(15));
        assert_eq!(req.current_count, 0);
        assert_eq!(req.distributed_messages().len(), 2);
    }

    #[test]
    fn test_new_rejects_empty_broadcast() {
        let result = GroupRequest::new("raid", Vec::new(), 4, TimeDelta::minutes(15), Utc::now());
        assert!(matches!(result, Err(LfgError::EmptyBroadcast)));
    }

    #[test]
    fn test_new_rejects_deadline_out_of_range() {
        let result = GroupRequest::new(
            "raid",
            msgs(&[(1, 100)]),
            4,
            TimeDelta::minutes(150_000_000_000),
            Utc::now(),
        );
        assert!(matches!(result, Err(LfgError::Config(_))));
    }

    #[test]
    fn test_timeout_is_strict() {
        let now = Utc::now();
        let req = GroupRequest::new("raid", msgs(&[(1, 100)]), 4, TimeDelta::minutes(15), now).unwrap();
        assert!(!req.is_timed_out(now + TimeDelta::minutes(15)));
        assert!(req.is_timed_out(now + TimeDelta::minutes(15) + TimeDelta::milliseconds(1)));
    }

    #[test]
    fn test_is_full_at_target() {
        let mut req =
            GroupRequest::new("raid", msgs(&[(1, 100)]), 4, TimeDelta::minutes(15), Utc::now()).unwrap();
        req.current_count = 3;
        assert!(!req.is_full());
        req.current_count = 4;
        assert!(req.is_full());
    }
}
