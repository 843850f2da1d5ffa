//! Member extraction: enumerate → filter → dedupe → persist.
//!
//! Two modes:
//! - `Members`: the full participant list of each selected group
//! - `ActiveSenders`: distinct authors of the most recent messages
//!
//! A failure while enumerating one group is counted and that group is skipped;
//! store I/O failures abort the whole run.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::{
    domain::{EligibleGroup, Group, Identity, MessageId, UserId},
    filter::{FilterConfig, MemberFilter, Verdict},
    ports::AccountPort,
    progress::Progress,
    settings::CaptureSettings,
    store::IdentityStore,
    Result,
};

pub const DEFAULT_BATCH_SIZE: usize = 100;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GroupSelector {
    All,
    /// Dense index into [`ExtractionEngine::list_eligible_groups`].
    Index(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScanMode {
    Members,
    /// Scan at most `limit` recent messages per group (whole history when `None`).
    ActiveSenders { limit: Option<usize> },
}

#[derive(Clone, Copy, Debug)]
pub struct ExtractionRequest {
    pub target: GroupSelector,
    pub filter: FilterConfig,
    pub mode: ScanMode,
    pub capture: CaptureSettings,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ExtractionStats {
    pub groups_processed: u64,
    /// Participants (members mode) or messages (active mode) looked at.
    pub scanned: u64,
    /// Distinct message authors; active mode only.
    pub unique_senders: u64,
    pub matched: u64,
    pub written_handles: u64,
    pub written_ids: u64,
    pub excluded_admins: u64,
    pub excluded_inactive: u64,
    /// Matched identities whose handle was refused because they look like bots.
    pub excluded_bots: u64,
    pub errors: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExtractionOutcome {
    Completed(ExtractionStats),
    InvalidIndex { index: usize, available: usize },
}

#[derive(Clone, Copy, Debug)]
pub struct ExtractionEngine {
    batch_size: usize,
}

impl Default for ExtractionEngine {
    fn default() -> Self {
        Self::new(DEFAULT_BATCH_SIZE)
    }
}

impl ExtractionEngine {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Megagroups in dialog order, re-indexed from 0.
    pub async fn list_eligible_groups(account: &dyn AccountPort) -> Result<Vec<EligibleGroup>> {
        Ok(eligible_groups(account)
            .await?
            .into_iter()
            .enumerate()
            .map(|(index, g)| EligibleGroup {
                index,
                title: g.title,
                handle: g.handle,
            })
            .collect())
    }

    pub async fn extract(
        &self,
        account: &dyn AccountPort,
        store: &IdentityStore,
        req: &ExtractionRequest,
        progress: &Progress,
    ) -> Result<ExtractionOutcome> {
        self.extract_at(account, store, req, progress, Utc::now())
            .await
    }

    /// Same as [`extract`](Self::extract) with an explicit clock for recency checks.
    pub async fn extract_at(
        &self,
        account: &dyn AccountPort,
        store: &IdentityStore,
        req: &ExtractionRequest,
        progress: &Progress,
        now: DateTime<Utc>,
    ) -> Result<ExtractionOutcome> {
        let groups = eligible_groups(account).await?;
        let selected = match req.target {
            GroupSelector::All => groups,
            GroupSelector::Index(index) => {
                let available = groups.len();
                match groups.into_iter().nth(index) {
                    Some(g) => vec![g],
                    None => {
                        tracing::info!(index, available, "group index out of range");
                        return Ok(ExtractionOutcome::InvalidIndex { index, available });
                    }
                }
            }
        };

        let mut run = Run {
            store,
            filter: MemberFilter::new(req.filter),
            capture: req.capture,
            now,
            stats: ExtractionStats::default(),
        };

        // Upper bound on messages in limited active mode; shrinks as groups end early.
        let mut expected = 0u64;
        match req.mode {
            ScanMode::Members => progress.set_total(selected.len() as u64),
            ScanMode::ActiveSenders { limit: Some(limit) } => {
                expected = (limit as u64).saturating_mul(selected.len() as u64);
                progress.set_total(expected);
            }
            ScanMode::ActiveSenders { limit: None } => {}
        }

        for group in &selected {
            tracing::info!(group = %group.title, mode = ?req.mode, "extracting");
            match req.mode {
                ScanMode::Members => {
                    self.scan_members(account, group, &mut run).await?;
                    progress.advance(1);
                }
                ScanMode::ActiveSenders { limit } => {
                    let scanned = self
                        .scan_senders(account, group, limit, &mut run, progress)
                        .await?;
                    if let Some(limit) = limit {
                        let shortfall = limit.saturating_sub(scanned) as u64;
                        if shortfall > 0 {
                            expected = expected.saturating_sub(shortfall);
                            progress.set_total(expected);
                        }
                    }
                }
            }
        }

        let stats = run.stats;
        tracing::info!(
            groups = stats.groups_processed,
            scanned = stats.scanned,
            matched = stats.matched,
            handles = stats.written_handles,
            ids = stats.written_ids,
            errors = stats.errors,
            "extraction finished"
        );
        Ok(ExtractionOutcome::Completed(stats))
    }

    async fn scan_members(
        &self,
        account: &dyn AccountPort,
        group: &Group,
        run: &mut Run<'_>,
    ) -> Result<()> {
        let members = match account.members(group.id).await {
            Ok(m) => m,
            Err(e) => {
                tracing::warn!(group = %group.title, error = %e, "member listing failed; skipping group");
                run.stats.errors += 1;
                return Ok(());
            }
        };

        for identity in &members {
            run.stats.scanned += 1;
            run.consider(identity)?;
        }
        run.stats.groups_processed += 1;
        Ok(())
    }

    async fn scan_senders(
        &self,
        account: &dyn AccountPort,
        group: &Group,
        limit: Option<usize>,
        run: &mut Run<'_>,
        progress: &Progress,
    ) -> Result<usize> {
        let mut seen: HashSet<UserId> = HashSet::new();
        let mut before: Option<MessageId> = None;
        let mut scanned = 0usize;

        loop {
            let want = match limit {
                Some(limit) => limit.saturating_sub(scanned).min(self.batch_size),
                None => self.batch_size,
            };
            if want == 0 {
                break;
            }

            let page = match account.messages(group.id, before, want).await {
                Ok(p) => p,
                Err(e) => {
                    tracing::warn!(group = %group.title, error = %e, "history scan failed; skipping group");
                    run.stats.errors += 1;
                    return Ok(scanned);
                }
            };
            if page.is_empty() {
                break;
            }

            let oldest = page.iter().map(|m| m.id).min();
            if before.is_some() && oldest >= before {
                tracing::warn!(group = %group.title, "history page did not move backwards; stopping");
                break;
            }
            before = oldest;
            scanned += page.len();
            run.stats.scanned += page.len() as u64;

            let fresh: Vec<UserId> = page
                .iter()
                .filter_map(|m| m.sender)
                .filter(|s| seen.insert(*s))
                .collect();

            for sender in fresh {
                run.stats.unique_senders += 1;
                match account.resolve_member(group.id, sender).await {
                    Ok(Some(identity)) => run.consider(&identity)?,
                    Ok(None) => {}
                    Err(e) => {
                        tracing::warn!(group = %group.title, user = sender.0, error = %e, "sender lookup failed");
                        run.stats.errors += 1;
                    }
                }
            }

            progress.advance(page.len() as u64);
        }

        run.stats.groups_processed += 1;
        Ok(scanned)
    }
}

/// Mutable state of one extraction run.
struct Run<'a> {
    store: &'a IdentityStore,
    filter: MemberFilter,
    capture: CaptureSettings,
    now: DateTime<Utc>,
    stats: ExtractionStats,
}

impl Run<'_> {
    fn consider(&mut self, identity: &Identity) -> Result<()> {
        match self.filter.evaluate(identity, self.now) {
            Verdict::ExcludedAdmin => {
                self.stats.excluded_admins += 1;
                return Ok(());
            }
            Verdict::ExcludedInactive => {
                self.stats.excluded_inactive += 1;
                return Ok(());
            }
            Verdict::Accepted => {}
        }
        self.stats.matched += 1;

        if self.capture.handles {
            if let Some(handle) = identity.handle.as_deref() {
                if !MemberFilter::accepts_handle(identity) {
                    self.stats.excluded_bots += 1;
                } else if self.store.add_handle(handle)? {
                    self.stats.written_handles += 1;
                }
            }
        }
        if self.capture.ids && self.store.add_id(identity.id)? {
            self.stats.written_ids += 1;
        }
        Ok(())
    }
}

async fn eligible_groups(account: &dyn AccountPort) -> Result<Vec<Group>> {
    Ok(account
        .dialogs()
        .await?
        .into_iter()
        .filter(|g| g.megagroup)
        .collect())
}
