use std::{env, time::Duration};

use harvest_core::{domain::OperatorId, errors::Error, Result};

/// Bot-side settings, kept apart from the account credentials in `harvest_core::config`.
#[derive(Clone)]
pub struct BotConfig {
    pub bot_token: String,
    pub owner_ids: Vec<i64>,
    /// How often the progress message of a running operation is refreshed.
    pub progress_interval: Duration,
}

impl BotConfig {
    pub fn load() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let bot_token = get("BOT_TOKEN").unwrap_or_default().trim().to_string();
        let owner_ids = parse_csv_i64(get("BOT_OWNER_IDS"));

        if bot_token.is_empty() {
            return Err(Error::Config(
                "BOT_TOKEN environment variable is required".to_string(),
            ));
        }
        if owner_ids.is_empty() {
            return Err(Error::Config(
                "BOT_OWNER_IDS environment variable is required".to_string(),
            ));
        }

        let progress_interval = get("PROGRESS_INTERVAL_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(|s| Duration::from_secs(s.max(1)))
            .unwrap_or(Duration::from_secs(5));

        Ok(Self {
            bot_token,
            owner_ids,
            progress_interval,
        })
    }

    pub fn is_authorized(&self, user: Option<OperatorId>) -> bool {
        let Some(user) = user else {
            return false;
        };
        self.owner_ids.contains(&user.0)
    }
}

impl std::fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BotConfig")
            .field("bot_token", &"***")
            .field("owner_ids", &self.owner_ids)
            .field("progress_interval", &self.progress_interval)
            .finish()
    }
}

fn parse_csv_i64(v: Option<String>) -> Vec<i64> {
    v.unwrap_or_default()
        .split(',')
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .filter_map(|s| s.parse::<i64>().ok())
        .collect()
}
