//! BigLFG lifecycle engine — creates requests and runs the reconciliation loop.
//! One pass per poll interval; passes never overlap. Each pass works on a store
//! snapshot and applies one of: no-op, timeout-cancel, fullness-close.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use lfgrelay_core::config::BigLfgConfig;
use lfgrelay_core::error::{LfgError, Result};
use lfgrelay_core::traits::{ChannelDirectory, MessagePlatform};
use lfgrelay_core::types::{ChannelId, MessageId};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::render;
use crate::request::{DistributedMessage, GroupRequest, Termination, TickOutcome};
use crate::store::GroupRequestStore;

/// Engine-wide defaults.
#[derive(Debug, Clone)]
pub struct LfgSettings {
    pub poll_interval: Duration,
    pub timeout: TimeDelta,
    pub target_count: u32,
    /// Reaction counted toward fullness.
    pub interest_marker: String,
}

impl LfgSettings {
    pub fn from_config(config: &BigLfgConfig) -> Result<Self> {
        let timeout = i64::try_from(config.timeout_mins)
            .ok()
            .and_then(TimeDelta::try_minutes)
            .ok_or_else(|| {
                LfgError::Config(format!("biglfg.timeout_mins {} is out of range", config.timeout_mins))
            })?;
        Ok(Self {
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            timeout,
            target_count: config.target_count,
            interest_marker: config.interest_emoji.clone(),
        })
    }
}

impl Default for LfgSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            timeout: TimeDelta::minutes(15),
            target_count: 4,
            interest_marker: "👍".into(),
        }
    }
}

/// Per-request overrides for creation.
#[derive(Debug, Clone, Default)]
pub struct LfgOptions {
    pub target_count: Option<u32>,
    pub timeout: Option<TimeDelta>,
}

/// What one reconciliation pass did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    /// Per request, in snapshot order.
    pub outcomes: Vec<(MessageId, TickOutcome)>,
    /// Adapter calls that failed and were skipped.
    pub adapter_failures: u32,
}

impl TickReport {
    pub fn outcome_of(&self, id: MessageId) -> Option<TickOutcome> {
        self.outcomes.iter().find(|(i, _)| *i == id).map(|(_, o)| *o)
    }
}

/// The lifecycle engine.
pub struct LfgEngine {
    platform: Arc<dyn MessagePlatform>,
    directory: Arc<dyn ChannelDirectory>,
    store: Arc<GroupRequestStore>,
    settings: LfgSettings,
}

impl LfgEngine {
    pub fn new(
        platform: Arc<dyn MessagePlatform>,
        directory: Arc<dyn ChannelDirectory>,
        settings: LfgSettings,
    ) -> Self {
        Self {
            platform,
            directory,
            store: Arc::new(GroupRequestStore::new()),
            settings,
        }
    }

    pub fn store(&self) -> &GroupRequestStore {
        &self.store
    }

    pub fn settings(&self) -> &LfgSettings {
        &self.settings
    }

    /// Active requests, in creation order.
    pub fn active_requests(&self) -> Vec<GroupRequest> {
        self.store.snapshot()
    }

    /// Broadcast a new BigLFG to every registered channel.
    pub async fn create_big_lfg(&self, prompt: &str, options: LfgOptions) -> Result<MessageId> {
        let channels = self.directory.list_registered_channels().await;
        self.create_big_lfg_in(prompt, &channels, options).await
    }

    /// Broadcast a new BigLFG to `channels`.
    ///
    /// Best effort: a channel that fails is logged and left out, already-sent
    /// messages are kept. Fails with `EmptyBroadcast` only if nothing was sent.
    pub async fn create_big_lfg_in(
        &self,
        prompt: &str,
        channels: &[ChannelId],
        options: LfgOptions,
    ) -> Result<MessageId> {
        let target_count = options.target_count.unwrap_or(self.settings.target_count);
        let timeout = options.timeout.unwrap_or(self.settings.timeout);
        if target_count == 0 {
            return Err(LfgError::Config("BigLFG target count must be > 0".into()));
        }
        if timeout < TimeDelta::minutes(1) {
            return Err(LfgError::Config(format!(
                "BigLFG timeout must be at least one minute, got {timeout}"
            )));
        }
        if Utc::now().checked_add_signed(timeout).is_none() {
            return Err(LfgError::Config(format!("BigLFG timeout {timeout} is out of range")));
        }
        let marker = self.settings.interest_marker.as_str();
        let content = render::prompt_message(prompt, target_count, timeout.num_minutes(), marker);

        let mut sent = Vec::with_capacity(channels.len());
        for &channel in channels {
            let message = match self.platform.send(channel, &content).await {
                Ok(message) => message,
                Err(e) => {
                    tracing::warn!("⚠️ BigLFG broadcast to #{channel} failed: {e}");
                    continue;
                }
            };
            // The seed reaction is what the poll subtracts; a missing seed only skews the count.
            if let Err(e) = self.platform.add_reaction(channel, message, marker).await {
                tracing::warn!("⚠️ Seed reaction on #{channel}/{message} failed: {e}");
            }
            sent.push(DistributedMessage { channel, message });
        }

        if sent.is_empty() {
            tracing::warn!("⚠️ BigLFG '{prompt}' reached none of {} channels", channels.len());
            return Err(LfgError::EmptyBroadcast);
        }

        let request = GroupRequest::new(prompt, sent, target_count, timeout, Utc::now())?;
        let id = request.id;
        let reached = request.distributed_messages().len();
        self.store.insert(request)?;
        tracing::info!(
            "📣 BigLFG {id} created: '{prompt}' → {reached}/{} channels (target {target_count}, {}m)",
            channels.len(),
            timeout.num_minutes()
        );
        Ok(id)
    }

    /// Cancel an active request by hand.
    pub async fn cancel_big_lfg(&self, id: MessageId) -> Result<()> {
        let mut failures = 0;
        match self.finish(id, Termination::Organiser, &mut failures).await {
            Some(_) => Ok(()),
            None => Err(LfgError::NotFound(format!("BigLFG {id} is not active"))),
        }
    }

    /// One reconciliation pass at the current time.
    pub async fn reconcile(&self) -> TickReport {
        self.reconcile_at(Utc::now()).await
    }

    /// One reconciliation pass evaluated at `now`.
    pub async fn reconcile_at(&self, now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();
        for request in self.store.snapshot() {
            if let Some(outcome) = self
                .reconcile_request(&request, now, &mut report.adapter_failures)
                .await
            {
                report.outcomes.push((request.id, outcome));
            }
        }
        report
    }

    /// Timeout first, then count refresh, then fullness.
    /// `None` if the request left the store through another path mid-pass.
    async fn reconcile_request(
        &self,
        request: &GroupRequest,
        now: DateTime<Utc>,
        failures: &mut u32,
    ) -> Option<TickOutcome> {
        if request.is_timed_out(now) {
            return self.finish(request.id, Termination::Inactivity, failures).await;
        }

        let count = match self.observe_count(request, failures).await {
            Some(observed) => {
                if !self.store.update(request.id, |r| r.current_count = observed) {
                    return None;
                }
                observed
            }
            None => request.current_count,
        };

        if count >= request.target_count {
            return self.finish(request.id, Termination::Full, failures).await;
        }
        Some(TickOutcome::Active)
    }

    /// Interest count from the last message that answered, bot seed excluded.
    /// Counts are not summed across channels.
    async fn observe_count(&self, request: &GroupRequest, failures: &mut u32) -> Option<u32> {
        let marker = self.settings.interest_marker.as_str();
        let mut observed = None;
        for dm in request.distributed_messages() {
            match self
                .platform
                .get_reaction_count(dm.channel, dm.message, marker)
                .await
            {
                Ok(Some(count)) => observed = Some(count.saturating_sub(1)),
                Ok(None) => {
                    tracing::debug!("BigLFG {}: no {marker} on #{}/{}", request.id, dm.channel, dm.message);
                }
                Err(e) => {
                    *failures += 1;
                    tracing::warn!(
                        "⚠️ BigLFG {}: reaction fetch on #{}/{} failed: {e}",
                        request.id,
                        dm.channel,
                        dm.message
                    );
                }
            }
        }
        if let Some(count) = observed {
            tracing::debug!("BigLFG {}: {count}/{} interested", request.id, request.target_count);
        }
        observed
    }

    /// Remove the request, then edit and clear every copy of it.
    /// Only the caller that removed it applies the presentation.
    async fn finish(
        &self,
        id: MessageId,
        termination: Termination,
        failures: &mut u32,
    ) -> Option<TickOutcome> {
        let request = self.store.remove(id)?;
        let content = render::terminal_message(&request, termination);
        for dm in request.distributed_messages() {
            if let Err(e) = self.platform.edit(dm.channel, dm.message, &content).await {
                *failures += 1;
                tracing::warn!("⚠️ BigLFG {id}: edit on #{}/{} failed: {e}", dm.channel, dm.message);
            }
            if let Err(e) = self.platform.clear_reactions(dm.channel, dm.message).await {
                *failures += 1;
                tracing::warn!(
                    "⚠️ BigLFG {id}: clearing reactions on #{}/{} failed: {e}",
                    dm.channel,
                    dm.message
                );
            }
        }
        tracing::info!("🏁 BigLFG {id} closed: {termination:?} ('{}')", request.prompt);
        Some(termination.outcome())
    }

    /// Start the reconciliation loop as a background tokio task.
    pub fn spawn(self: Arc<Self>) -> LifecycleHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let join = tokio::spawn(self.run(shutdown_rx));
        LifecycleHandle { shutdown_tx, join }
    }

    async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        tracing::info!(
            "⏰ BigLFG loop started (check every {}s)",
            self.settings.poll_interval.as_secs_f32()
        );
        let mut interval = tokio::time::interval(self.settings.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                changed = shutdown_rx.changed() => {
                    if changed.is_err() || *shutdown_rx.borrow() {
                        break;
                    }
                }
                _ = interval.tick() => {
                    // Runs to completion before the next tick or shutdown is observed.
                    let report = self.reconcile().await;
                    if !report.outcomes.is_empty() {
                        tracing::debug!(
                            "BigLFG pass: {} requests, {} adapter failures",
                            report.outcomes.len(),
                            report.adapter_failures
                        );
                    }
                }
            }
        }
        tracing::info!("🛑 BigLFG loop stopped ({} requests still active)", self.store.len());
    }
}

/// Handle to the background reconciliation loop. Dropping it also stops the loop.
pub struct LifecycleHandle {
    shutdown_tx: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl LifecycleHandle {
    /// Signal the loop and wait for the in-flight pass to finish.
    pub async fn shutdown(self) {
        self.shutdown_tx.send(true).ok();
        if let Err(e) = self.join.await {
            tracing::warn!("⚠️ BigLFG loop ended abnormally: {e}");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
