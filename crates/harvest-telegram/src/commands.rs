//! Bot command grammar.
//!
//! ```text
//! /start
//! /sessions
//! /groups <s>
//! /parse  <s> <g|all> [flags]
//! /active <s> <g|all> [limit] [flags]
//!
//! flags: admins | no-admins | recent | no-recent | days=N  (days=0 lifts the limit)
//! /invite <s> <channel> [limit]
//! /status  /cancel  /toggle_id  /toggle_name  /clear  /config
//! ```

use harvest_core::{
    extract::{GroupSelector, ScanMode},
    filter::FilterConfig,
    invite::normalize_channel,
};

pub const HELP_TEXT: &str = "Commands:\n\
/start - this help\n\
/sessions - list .session files\n\
/groups &lt;s&gt; - groups of an account\n\
/parse &lt;s&gt; &lt;g|all&gt; [flags] - members of a group or all groups\n\
/active &lt;s&gt; &lt;g|all&gt; [limit] [flags] - recent message senders\n\
/invite &lt;s&gt; &lt;channel&gt; [limit] - invite stored usernames\n\
/status - progress of the running operation\n\
/cancel - stop the running operation\n\
/toggle_id - capture user ids on/off\n\
/toggle_name - capture usernames on/off\n\
/clear - empty usernames.txt and userids.txt\n\
/config - current settings\n\n\
Flags override the configured defaults:\n\
admins / no-admins - skip or keep admins\n\
recent / no-recent - keep or drop users with hidden last-seen\n\
days=N - skip users offline longer than N days; days=0 turns the limit off";

/// Filter flags given on the command line. Each one that is set replaces the
/// configured default; unset flags keep it.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FilterFlags {
    pub exclude_admins: Option<bool>,
    pub include_recently_online: Option<bool>,
    /// `Some(0)` lifts the inactivity limit.
    pub max_inactivity_days: Option<u32>,
}

impl FilterFlags {
    pub fn apply(&self, base: FilterConfig) -> FilterConfig {
        let max_inactivity_days = match self.max_inactivity_days {
            Some(0) => None,
            Some(days) => Some(days),
            None => base.max_inactivity_days,
        };
        FilterConfig {
            exclude_admins: self.exclude_admins.unwrap_or(base.exclude_admins),
            max_inactivity_days,
            include_recently_online: self
                .include_recently_online
                .unwrap_or(base.include_recently_online),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BotCommand {
    Help,
    Sessions,
    Groups {
        session: usize,
    },
    Extract {
        session: usize,
        target: GroupSelector,
        mode: ScanMode,
        flags: FilterFlags,
    },
    Invite {
        session: usize,
        channel: String,
        limit: Option<usize>,
    },
    Status,
    Cancel,
    ToggleIds,
    ToggleHandles,
    Clear,
    Config,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParseError {
    Unknown(String),
    Usage(&'static str),
}

impl ParseError {
    pub fn reply(&self) -> String {
        match self {
            ParseError::Unknown(cmd) => format!("Unknown command: /{cmd}. Send /start for help."),
            ParseError::Usage(usage) => format!("Usage: {usage}"),
        }
    }
}

const GROUPS_USAGE: &str = "/groups <s>";
const PARSE_USAGE: &str = "/parse <s> <g|all> [admins|no-admins] [recent|no-recent] [days=N]";
const ACTIVE_USAGE: &str =
    "/active <s> <g|all> [limit] [admins|no-admins] [recent|no-recent] [days=N]";
const INVITE_USAGE: &str = "/invite <s> <channel> [limit]";

/// Split `/cmd@botname args...` into the lowercase command and its arguments.
fn split_command(text: &str) -> (String, Vec<&str>) {
    let mut parts = text.split_whitespace();
    let first = parts.next().unwrap_or("");
    let cmd = first
        .trim_start_matches('/')
        .split('@')
        .next()
        .unwrap_or("")
        .to_lowercase();
    (cmd, parts.collect())
}

pub fn parse_command(text: &str) -> Result<BotCommand, ParseError> {
    let (cmd, args) = split_command(text);

    let simple = |c: BotCommand| {
        if args.is_empty() {
            Ok(c)
        } else {
            Err(ParseError::Unknown(cmd.clone()))
        }
    };

    match cmd.as_str() {
        "start" | "help" => Ok(BotCommand::Help),
        "sessions" => simple(BotCommand::Sessions),
        "status" => simple(BotCommand::Status),
        "cancel" => simple(BotCommand::Cancel),
        "toggle_id" => simple(BotCommand::ToggleIds),
        "toggle_name" => simple(BotCommand::ToggleHandles),
        "clear" => simple(BotCommand::Clear),
        "config" => simple(BotCommand::Config),

        "groups" => match args.as_slice() {
            [s] => Ok(BotCommand::Groups {
                session: parse_index(s).ok_or(ParseError::Usage(GROUPS_USAGE))?,
            }),
            _ => Err(ParseError::Usage(GROUPS_USAGE)),
        },

        "parse" => {
            let (session, target, rest) = session_and_target(&args, PARSE_USAGE)?;
            Ok(BotCommand::Extract {
                session,
                target,
                mode: ScanMode::Members,
                flags: parse_flags(rest, PARSE_USAGE)?,
            })
        }

        "active" => {
            let (session, target, mut rest) = session_and_target(&args, ACTIVE_USAGE)?;
            let mut limit = None;
            if let Some(first) = rest.first() {
                if first.chars().all(|c| c.is_ascii_digit()) {
                    limit = Some(parse_positive(first).ok_or(ParseError::Usage(ACTIVE_USAGE))?);
                    rest = &rest[1..];
                }
            }
            Ok(BotCommand::Extract {
                session,
                target,
                mode: ScanMode::ActiveSenders { limit },
                flags: parse_flags(rest, ACTIVE_USAGE)?,
            })
        }

        "invite" => {
            let (s, channel, limit) = match args.as_slice() {
                [s, c] => (s, c, None),
                [s, c, l] => (
                    s,
                    c,
                    Some(parse_positive(l).ok_or(ParseError::Usage(INVITE_USAGE))?),
                ),
                _ => return Err(ParseError::Usage(INVITE_USAGE)),
            };
            Ok(BotCommand::Invite {
                session: parse_index(s).ok_or(ParseError::Usage(INVITE_USAGE))?,
                channel: normalize_channel(channel).map_err(|_| ParseError::Usage(INVITE_USAGE))?,
                limit,
            })
        }

        _ => Err(ParseError::Unknown(cmd)),
    }
}

fn session_and_target<'a, 'b>(
    args: &'b [&'a str],
    usage: &'static str,
) -> Result<(usize, GroupSelector, &'b [&'a str]), ParseError> {
    let [s, g, rest @ ..] = args else {
        return Err(ParseError::Usage(usage));
    };
    let session = parse_index(s).ok_or(ParseError::Usage(usage))?;
    let target = if g.eq_ignore_ascii_case("all") {
        GroupSelector::All
    } else {
        GroupSelector::Index(parse_index(g).ok_or(ParseError::Usage(usage))?)
    };
    Ok((session, target, rest))
}

fn parse_flags(args: &[&str], usage: &'static str) -> Result<FilterFlags, ParseError> {
    let mut flags = FilterFlags::default();
    for arg in args {
        match arg.to_lowercase().as_str() {
            "admins" => flags.exclude_admins = Some(true),
            "no-admins" => flags.exclude_admins = Some(false),
            "recent" => flags.include_recently_online = Some(true),
            "no-recent" => flags.include_recently_online = Some(false),
            other => {
                let days = other
                    .strip_prefix("days=")
                    .and_then(|d| d.parse::<u32>().ok())
                    .ok_or(ParseError::Usage(usage))?;
                flags.max_inactivity_days = Some(days);
            }
        }
    }
    Ok(flags)
}

fn parse_index(s: &str) -> Option<usize> {
    if !s.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    s.parse::<usize>().ok()
}

fn parse_positive(s: &str) -> Option<usize> {
    parse_index(s).filter(|n| *n > 0)
}
