//! Telegram-HTML renderings of pipeline results.

use crate::{
    catalog::SessionFile,
    domain::EligibleGroup,
    extract::ExtractionStats,
    invite::InviteSummary,
    progress::ProgressSnapshot,
};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn format_sessions(sessions: &[SessionFile]) -> String {
    if sessions.is_empty() {
        return "No .session files found.".to_string();
    }
    let lines = sessions
        .iter()
        .enumerate()
        .map(|(i, s)| format!("[{i}] <code>{}</code>", escape_html(&s.name)))
        .collect::<Vec<_>>()
        .join("\n");
    format!("<b>Sessions</b>\n{lines}")
}

pub fn format_groups(groups: &[EligibleGroup]) -> String {
    if groups.is_empty() {
        return "No groups found.".to_string();
    }
    let lines = groups
        .iter()
        .map(|g| match &g.handle {
            Some(h) => format!("[{}] {} @{}", g.index, escape_html(&g.title), escape_html(h)),
            None => format!("[{}] {}", g.index, escape_html(&g.title)),
        })
        .collect::<Vec<_>>()
        .join("\n");
    format!("<b>Groups</b>\n{lines}")
}

pub fn format_extraction(stats: &ExtractionStats) -> String {
    let mut out = String::from("✅ <b>Extraction finished</b>\n");
    out.push_str(&format!("Groups: {}\n", stats.groups_processed));
    out.push_str(&format!("Scanned: {}\n", stats.scanned));
    if stats.unique_senders > 0 {
        out.push_str(&format!("Unique senders: {}\n", stats.unique_senders));
    }
    out.push_str(&format!("Matched filter: {}\n", stats.matched));
    out.push_str(&format!(
        "New handles: {} · new ids: {}\n",
        stats.written_handles, stats.written_ids
    ));
    out.push_str(&format!(
        "Excluded: admins {} · inactive {} · bots {}",
        stats.excluded_admins, stats.excluded_inactive, stats.excluded_bots
    ));
    if stats.errors > 0 {
        out.push_str(&format!("\n⚠️ Groups/senders with errors: {}", stats.errors));
    }
    out
}

pub fn format_invite(summary: &InviteSummary) -> String {
    let mut out = format!(
        "📨 <b>Invites to @{}</b>\n",
        escape_html(&summary.channel)
    );
    out.push_str(&format!("Attempted: {}\n", summary.attempted));
    out.push_str(&format!("Invited: {}\n", summary.invited));
    out.push_str(&format!("Already members: {}\n", summary.already_member));
    out.push_str(&format!("Privacy restricted: {}\n", summary.skipped_privacy));
    out.push_str(&format!("Admin rights required: {}", summary.admin_required));
    if summary.flood_wait > 0 {
        match summary.flood_wait_seconds {
            Some(s) => out.push_str(&format!("\n⏳ Flood control: wait {s}s before retrying")),
            None => out.push_str("\n⏳ Flood control hit"),
        }
    }
    if summary.errors > 0 {
        out.push_str(&format!("\n❌ Errors: {}", summary.errors));
    }
    if let Some(err) = &summary.last_error {
        out.push_str(&format!("\nLast error: <code>{}</code>", escape_html(err)));
    }
    out
}

/// Ten-cell text bar, e.g. `▓▓▓░░░░░░░ 3/10 (30%)`.
pub fn format_progress(p: ProgressSnapshot) -> String {
    match p.percent() {
        Some(pct) => {
            let filled = (pct / 10) as usize;
            format!(
                "{}{} {}/{} ({pct}%)",
                "▓".repeat(filled),
                "░".repeat(10 - filled),
                p.processed,
                p.total
            )
        }
        None => format!("{} processed", p.processed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_html() {
        assert_eq!(escape_html("<a & \"b\">"), "&lt;a &amp; &quot;b&quot;&gt;");
    }

    #[test]
    fn group_listing_shows_handles_when_present() {
        let groups = vec![
            EligibleGroup {
                index: 0,
                title: "Rust <3".to_string(),
                handle: Some("rustlang".to_string()),
            },
            EligibleGroup {
                index: 1,
                title: "Private".to_string(),
                handle: None,
            },
        ];
        let html = format_groups(&groups);
        assert!(html.contains("[0] Rust &lt;3 @rustlang"));
        assert!(html.contains("[1] Private"));
        assert_eq!(format_groups(&[]), "No groups found.");
    }

    #[test]
    fn invite_summary_mentions_flood_wait() {
        let summary = InviteSummary {
            channel: "target".to_string(),
            attempted: 3,
            invited: 2,
            flood_wait: 1,
            flood_wait_seconds: Some(120),
            last_error: Some("flood wait 120s".to_string()),
            ..Default::default()
        };
        let html = format_invite(&summary);
        assert!(html.contains("@target"));
        assert!(html.contains("Attempted: 3"));
        assert!(html.contains("wait 120s"));
    }

    #[test]
    fn progress_bar() {
        assert_eq!(
            format_progress(ProgressSnapshot {
                processed: 3,
                total: 10
            }),
            "▓▓▓░░░░░░░ 3/10 (30%)"
        );
        assert_eq!(
            format_progress(ProgressSnapshot {
                processed: 42,
                total: 0
            }),
            "42 processed"
        );
    }
}
