use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Identity;

/// Role/recency filter applied to every enumerated identity.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterConfig {
    pub exclude_admins: bool,
    /// Reject identities whose exact last-seen is older than this many days.
    pub max_inactivity_days: Option<u32>,
    /// Accept identities whose recency is unknown (coarse "recently" buckets, hidden).
    pub include_recently_online: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    ExcludedAdmin,
    ExcludedInactive,
}

/// Pure predicates over [`Identity`]; counters are kept by the caller.
#[derive(Clone, Copy, Debug)]
pub struct MemberFilter {
    cfg: FilterConfig,
}

impl MemberFilter {
    pub fn new(cfg: FilterConfig) -> Self {
        Self { cfg }
    }

    /// Admin exclusion is checked before recency, so an excluded admin is never
    /// also reported as inactive.
    pub fn evaluate(&self, identity: &Identity, now: DateTime<Utc>) -> Verdict {
        if self.cfg.exclude_admins && identity.is_admin {
            return Verdict::ExcludedAdmin;
        }
        if !self.recent_enough(identity, now) {
            return Verdict::ExcludedInactive;
        }
        Verdict::Accepted
    }

    pub fn accepts(&self, identity: &Identity, now: DateTime<Utc>) -> bool {
        self.evaluate(identity, now) == Verdict::Accepted
    }

    /// Bots never make it into the handle store, whatever the filter says.
    pub fn accepts_handle(identity: &Identity) -> bool {
        identity.handle.is_some() && !identity.is_bot()
    }

    fn recent_enough(&self, identity: &Identity, now: DateTime<Utc>) -> bool {
        match identity.presence.last_seen(now) {
            Some(seen) => match self.cfg.max_inactivity_days {
                Some(days) => now.signed_duration_since(seen) <= Duration::days(i64::from(days)),
                None => true,
            },
            None => self.cfg.include_recently_online || self.cfg.max_inactivity_days.is_none(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Presence, UserId};

    fn user(presence: Presence) -> Identity {
        Identity::new(UserId(1))
            .with_handle("alice")
            .with_presence(presence)
    }

    #[test]
    fn admin_is_excluded_before_recency() {
        let now = Utc::now();
        let f = MemberFilter::new(FilterConfig {
            exclude_admins: true,
            max_inactivity_days: Some(1),
            include_recently_online: false,
        });
        let stale_admin = user(Presence::Offline(now - Duration::days(30))).admin();
        assert_eq!(f.evaluate(&stale_admin, now), Verdict::ExcludedAdmin);
    }

    #[test]
    fn admins_pass_when_not_excluded() {
        let now = Utc::now();
        let f = MemberFilter::new(FilterConfig::default());
        assert!(f.accepts(&user(Presence::Online).admin(), now));
    }

    #[test]
    fn stale_last_seen_is_excluded() {
        let now = Utc::now();
        let f = MemberFilter::new(FilterConfig {
            max_inactivity_days: Some(7),
            ..Default::default()
        });
        assert_eq!(
            f.evaluate(&user(Presence::Offline(now - Duration::days(8))), now),
            Verdict::ExcludedInactive
        );
        assert!(f.accepts(&user(Presence::Offline(now - Duration::days(6))), now));
        assert!(f.accepts(&user(Presence::Online), now));
    }

    #[test]
    fn unknown_recency_depends_on_bound_and_flag() {
        let now = Utc::now();
        let unbounded = MemberFilter::new(FilterConfig::default());
        assert!(unbounded.accepts(&user(Presence::Recently), now));
        assert!(unbounded.accepts(&user(Presence::Hidden), now));

        let bounded = MemberFilter::new(FilterConfig {
            max_inactivity_days: Some(3),
            ..Default::default()
        });
        assert_eq!(
            bounded.evaluate(&user(Presence::Recently), now),
            Verdict::ExcludedInactive
        );

        let bounded_recent = MemberFilter::new(FilterConfig {
            max_inactivity_days: Some(3),
            include_recently_online: true,
            ..Default::default()
        });
        for p in [
            Presence::Recently,
            Presence::LastWeek,
            Presence::LastMonth,
            Presence::Hidden,
        ] {
            assert!(bounded_recent.accepts(&user(p), now), "{p:?}");
        }
    }

    #[test]
    fn include_recently_does_not_rescue_exact_stale() {
        let now = Utc::now();
        let f = MemberFilter::new(FilterConfig {
            max_inactivity_days: Some(3),
            include_recently_online: true,
            ..Default::default()
        });
        assert!(!f.accepts(&user(Presence::Offline(now - Duration::days(10))), now));
    }

    #[test]
    fn handle_acceptance_rejects_bots_and_missing_handles() {
        assert!(MemberFilter::accepts_handle(&user(Presence::Online)));
        assert!(!MemberFilter::accepts_handle(
            &Identity::new(UserId(2)).with_handle("spam_bot")
        ));
        assert!(!MemberFilter::accepts_handle(
            &Identity::new(UserId(3)).with_handle("carol").bot()
        ));
        assert!(!MemberFilter::accepts_handle(&Identity::new(UserId(4))));
    }
}
