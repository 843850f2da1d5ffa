//! Paced invites of stored handles into a target channel.
//!
//! Attempts are strictly sequential with a randomized gap between them. The run
//! stops at the first flood-control signal or unclassified error and returns the
//! partial summary.

use std::{sync::OnceLock, time::Duration};

use rand::Rng;
use regex::Regex;
use serde::Serialize;
use tokio::time::sleep;

use crate::{
    errors::{Error, PlatformError},
    ports::AccountPort,
    progress::Progress,
    store::IdentityStore,
    Result,
};

pub const DEFAULT_INVITE_LIMIT: usize = 20;

/// Randomized gap between two invite attempts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct InvitePacing {
    pub min_delay: Duration,
    pub max_delay: Duration,
}

impl Default for InvitePacing {
    fn default() -> Self {
        Self {
            min_delay: Duration::from_secs(15),
            max_delay: Duration::from_secs(40),
        }
    }
}

impl InvitePacing {
    pub fn new(min_delay: Duration, max_delay: Duration) -> Self {
        Self {
            min_delay,
            max_delay: max_delay.max(min_delay),
        }
    }

    pub fn next_delay(&self) -> Duration {
        if self.max_delay <= self.min_delay {
            return self.min_delay;
        }
        let lo = self.min_delay.as_millis() as u64;
        let hi = self.max_delay.as_millis() as u64;
        Duration::from_millis(rand::thread_rng().gen_range(lo..=hi))
    }
}

/// Classified result of one invite attempt.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InviteOutcome {
    Invited,
    AlreadyMember,
    PrivacyRestricted,
    AdminRequired,
    FloodWait { seconds: u32 },
    Failed(String),
}

impl InviteOutcome {
    pub fn classify(result: std::result::Result<(), PlatformError>) -> Self {
        match result {
            Ok(()) => InviteOutcome::Invited,
            Err(PlatformError::AlreadyParticipant) => InviteOutcome::AlreadyMember,
            Err(PlatformError::PrivacyRestricted) => InviteOutcome::PrivacyRestricted,
            Err(PlatformError::AdminRequired) => InviteOutcome::AdminRequired,
            Err(PlatformError::FloodWait { seconds }) => InviteOutcome::FloodWait { seconds },
            Err(PlatformError::Other(msg)) => InviteOutcome::Failed(msg),
        }
    }

    /// Flood control and unclassified errors end the run.
    pub fn halts(&self) -> bool {
        matches!(self, InviteOutcome::FloodWait { .. } | InviteOutcome::Failed(_))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct InviteSummary {
    pub channel: String,
    pub attempted: u64,
    pub invited: u64,
    pub already_member: u64,
    pub skipped_privacy: u64,
    pub admin_required: u64,
    pub flood_wait: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    /// Wait requested by the platform on the flood-control stop.
    pub flood_wait_seconds: Option<u32>,
}

impl InviteSummary {
    fn new(channel: &str) -> Self {
        Self {
            channel: channel.to_string(),
            ..Default::default()
        }
    }

    fn record(&mut self, outcome: &InviteOutcome) {
        match outcome {
            InviteOutcome::Invited => self.invited += 1,
            InviteOutcome::AlreadyMember => self.already_member += 1,
            InviteOutcome::PrivacyRestricted => self.skipped_privacy += 1,
            InviteOutcome::AdminRequired => self.admin_required += 1,
            InviteOutcome::FloodWait { seconds } => {
                self.flood_wait += 1;
                self.flood_wait_seconds = Some(*seconds);
                self.last_error = Some(format!("flood wait {seconds}s"));
            }
            InviteOutcome::Failed(msg) => {
                self.errors += 1;
                self.last_error = Some(msg.clone());
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct InviteEngine {
    pacing: InvitePacing,
}

impl InviteEngine {
    pub fn new(pacing: InvitePacing) -> Self {
        Self { pacing }
    }

    /// Invite the first `limit` stored handles (default 20).
    pub async fn invite_from_store(
        &self,
        account: &dyn AccountPort,
        store: &IdentityStore,
        channel: &str,
        limit: Option<usize>,
        progress: &Progress,
    ) -> Result<InviteSummary> {
        let handles = store.all_handles()?;
        self.invite(account, &handles, channel, limit, progress)
            .await
    }

    pub async fn invite(
        &self,
        account: &dyn AccountPort,
        handles: &[String],
        channel: &str,
        limit: Option<usize>,
        progress: &Progress,
    ) -> Result<InviteSummary> {
        let channel = normalize_channel(channel)?;
        let limit = limit.unwrap_or(DEFAULT_INVITE_LIMIT);
        if limit == 0 {
            return Err(Error::InvalidArgument(
                "invite limit must be at least 1".to_string(),
            ));
        }

        let queue = &handles[..handles.len().min(limit)];
        progress.set_total(queue.len() as u64);
        let mut summary = InviteSummary::new(&channel);
        tracing::info!(channel = %channel, queued = queue.len(), "invite run started");

        for (i, handle) in queue.iter().enumerate() {
            if i > 0 {
                sleep(self.pacing.next_delay()).await;
            }

            summary.attempted += 1;
            let outcome = InviteOutcome::classify(account.invite(&channel, handle).await);
            progress.advance(1);
            summary.record(&outcome);

            if outcome.halts() {
                tracing::warn!(
                    channel = %channel,
                    handle = %handle,
                    outcome = ?outcome,
                    remaining = queue.len() - i - 1,
                    "invite run stopped early"
                );
                break;
            }
            tracing::debug!(channel = %channel, handle = %handle, outcome = ?outcome, "invite attempt");
        }

        tracing::info!(
            channel = %channel,
            attempted = summary.attempted,
            invited = summary.invited,
            "invite run finished"
        );
        Ok(summary)
    }
}

/// Strip a leading `@` and validate a public channel username.
pub fn normalize_channel(raw: &str) -> Result<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"^[A-Za-z0-9_]{5,32}$").expect("valid regex"));

    let name = raw.trim().trim_start_matches('@');
    if !re.is_match(name) {
        return Err(Error::InvalidArgument(format!("invalid channel: {raw}")));
    }
    Ok(name.to_string())
}
