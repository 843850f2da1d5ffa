use std::{env, path::PathBuf, time::Duration};

use crate::{
    errors::Error,
    extract::DEFAULT_BATCH_SIZE,
    filter::FilterConfig,
    invite::{InvitePacing, DEFAULT_INVITE_LIMIT},
    settings::CaptureSettings,
    Result,
};

/// Platform application credentials.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_id: i32,
    /// 32-character lowercase hex.
    pub api_hash: String,
}

impl Credentials {
    /// Validate raw values the way the platform issues them: a positive numeric id and
    /// a 32-character hex hash.
    pub fn parse(api_id: &str, api_hash: &str) -> Result<Self> {
        let mut problems = Vec::new();

        let id = match api_id.trim().parse::<i32>() {
            Ok(id) if id > 0 => Some(id),
            _ => {
                problems.push("API_ID must be a positive number");
                None
            }
        };

        let hash = api_hash.trim().to_lowercase();
        if hash.len() != 32 || !hash.chars().all(|c| c.is_ascii_hexdigit()) {
            problems.push("API_HASH must be a 32-character hex string");
        }

        match id {
            Some(api_id) if problems.is_empty() => Ok(Self {
                api_id,
                api_hash: hash,
            }),
            _ => Err(Error::Config(problems.join("; "))),
        }
    }

    /// Hash with all but the first and last four characters hidden.
    pub fn masked_hash(&self) -> String {
        let n = self.api_hash.len();
        if n <= 8 {
            return "*".repeat(n);
        }
        format!(
            "{}{}{}",
            &self.api_hash[..4],
            "*".repeat(n - 8),
            &self.api_hash[n - 4..]
        )
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_id", &self.api_id)
            .field("api_hash", &self.masked_hash())
            .finish()
    }
}

/// Typed configuration for the harvester.
#[derive(Clone, Debug)]
pub struct Config {
    pub credentials: Credentials,

    // Storage
    pub data_dir: PathBuf,
    pub sessions_dir: PathBuf,

    // Defaults for runs
    pub capture: CaptureSettings,
    pub filter: FilterConfig,
    pub invite_limit: usize,
    pub invite_pacing: InvitePacing,
    pub active_batch_size: usize,
}

impl Config {
    /// Load from the process environment, after merging a `.env` file if present.
    pub fn load() -> Result<Self> {
        // Existing variables win over `.env` entries.
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production).
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_id = get("API_ID").unwrap_or_default();
        let api_hash = get("API_HASH").unwrap_or_default();
        if api_id.trim().is_empty() || api_hash.trim().is_empty() {
            return Err(Error::Config(
                "API_ID and API_HASH environment variables are required".to_string(),
            ));
        }
        let credentials = Credentials::parse(&api_id, &api_hash)?;

        let data_dir = get("DATA_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));
        let sessions_dir = get("SESSIONS_DIR")
            .and_then(non_empty)
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.clone());

        let capture = CaptureSettings {
            handles: parse_bool(get("CAPTURE_HANDLES")).unwrap_or(true),
            ids: parse_bool(get("CAPTURE_IDS")).unwrap_or(true),
        };

        let max_inactivity_days = match get("MAX_INACTIVITY_DAYS").and_then(non_empty) {
            Some(v) => Some(v.trim().parse::<u32>().map_err(|_| {
                Error::Config(format!("MAX_INACTIVITY_DAYS must be a number, got {v:?}"))
            })?),
            None => None,
        };
        let filter = FilterConfig {
            exclude_admins: parse_bool(get("EXCLUDE_ADMINS")).unwrap_or(false),
            max_inactivity_days,
            include_recently_online: parse_bool(get("INCLUDE_RECENTLY_ONLINE")).unwrap_or(false),
        };

        let invite_limit = parse_usize(get("INVITE_LIMIT"))
            .unwrap_or(DEFAULT_INVITE_LIMIT)
            .max(1);
        let defaults = InvitePacing::default();
        let min_delay = parse_u64(get("INVITE_DELAY_MIN_SECS"))
            .map(Duration::from_secs)
            .unwrap_or(defaults.min_delay);
        let max_delay = parse_u64(get("INVITE_DELAY_MAX_SECS"))
            .map(Duration::from_secs)
            .unwrap_or(defaults.max_delay);
        if max_delay < min_delay {
            return Err(Error::Config(
                "INVITE_DELAY_MAX_SECS must not be below INVITE_DELAY_MIN_SECS".to_string(),
            ));
        }

        let active_batch_size = parse_usize(get("ACTIVE_BATCH_SIZE"))
            .unwrap_or(DEFAULT_BATCH_SIZE)
            .clamp(1, 100);

        Ok(Self {
            credentials,
            data_dir,
            sessions_dir,
            capture,
            filter,
            invite_limit,
            invite_pacing: InvitePacing::new(min_delay, max_delay),
            active_batch_size,
        })
    }

    pub fn settings_file(&self) -> PathBuf {
        self.data_dir.join("settings.json")
    }
}

pub fn parse_bool(v: Option<String>) -> Option<bool> {
    let v = v?;
    match v.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn parse_u64(v: Option<String>) -> Option<u64> {
    v.and_then(|s| s.trim().parse::<u64>().ok())
}

fn parse_usize(v: Option<String>) -> Option<usize> {
    v.and_then(|s| s.trim().parse::<usize>().ok())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const HASH: &str = "0123456789abcdef0123456789ABCDEF";

    fn load(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn defaults_with_minimal_env() {
        let cfg = load(&[("API_ID", "12345"), ("API_HASH", HASH)]).unwrap();
        assert_eq!(cfg.credentials.api_id, 12345);
        assert_eq!(cfg.credentials.api_hash, HASH.to_lowercase());
        assert_eq!(cfg.data_dir, PathBuf::from("."));
        assert_eq!(cfg.sessions_dir, PathBuf::from("."));
        assert_eq!(cfg.capture, CaptureSettings::default());
        assert_eq!(cfg.filter, FilterConfig::default());
        assert_eq!(cfg.invite_limit, 20);
        assert_eq!(cfg.invite_pacing, InvitePacing::default());
        assert_eq!(cfg.active_batch_size, 100);
    }

    #[test]
    fn missing_credentials_are_fatal() {
        assert!(matches!(load(&[]), Err(Error::Config(_))));
        assert!(matches!(load(&[("API_ID", "1")]), Err(Error::Config(_))));
    }

    #[test]
    fn malformed_credentials_are_rejected() {
        assert!(load(&[("API_ID", "abc"), ("API_HASH", HASH)]).is_err());
        assert!(load(&[("API_ID", "-4"), ("API_HASH", HASH)]).is_err());
        assert!(load(&[("API_ID", "1"), ("API_HASH", "xyz")]).is_err());
        let not_hex = "g".repeat(32);
        assert!(load(&[("API_ID", "1"), ("API_HASH", not_hex.as_str())]).is_err());
    }

    #[test]
    fn overrides_are_parsed() {
        let cfg = load(&[
            ("API_ID", "1"),
            ("API_HASH", HASH),
            ("DATA_DIR", "/var/lib/harvest"),
            ("CAPTURE_IDS", "off"),
            ("EXCLUDE_ADMINS", "yes"),
            ("MAX_INACTIVITY_DAYS", "14"),
            ("INCLUDE_RECENTLY_ONLINE", "1"),
            ("INVITE_LIMIT", "5"),
            ("INVITE_DELAY_MIN_SECS", "2"),
            ("INVITE_DELAY_MAX_SECS", "3"),
        ])
        .unwrap();
        assert_eq!(cfg.sessions_dir, PathBuf::from("/var/lib/harvest"));
        assert_eq!(cfg.settings_file(), PathBuf::from("/var/lib/harvest/settings.json"));
        assert!(cfg.capture.handles);
        assert!(!cfg.capture.ids);
        assert!(cfg.filter.exclude_admins);
        assert_eq!(cfg.filter.max_inactivity_days, Some(14));
        assert!(cfg.filter.include_recently_online);
        assert_eq!(cfg.invite_limit, 5);
        assert_eq!(cfg.invite_pacing.min_delay, Duration::from_secs(2));
        assert_eq!(cfg.invite_pacing.max_delay, Duration::from_secs(3));
    }

    #[test]
    fn inverted_delay_range_is_rejected() {
        let r = load(&[
            ("API_ID", "1"),
            ("API_HASH", HASH),
            ("INVITE_DELAY_MIN_SECS", "30"),
            ("INVITE_DELAY_MAX_SECS", "10"),
        ]);
        assert!(matches!(r, Err(Error::Config(_))));
    }

    #[test]
    fn debug_masks_the_hash() {
        let creds = Credentials::parse("7", HASH).unwrap();
        let dbg = format!("{creds:?}");
        assert!(!dbg.contains(&HASH.to_lowercase()));
        assert!(dbg.contains("0123"));
        assert!(dbg.contains("cdef"));
    }
}
