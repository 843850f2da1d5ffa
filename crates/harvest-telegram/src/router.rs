use std::sync::Arc;

use teloxide::{dispatching::Dispatcher, dptree, prelude::*};

use tokio::sync::Mutex;

use harvest_core::messaging::throttled::{ThrottleConfig, ThrottledMessenger};
use harvest_core::{
    catalog::SessionCatalog, config::Config, messaging::port::MessagingPort,
    ports::AccountConnector, session::OperatorSessions, settings::SettingsStore,
    store::IdentityStore, Result,
};

use crate::config::BotConfig;
use crate::handlers;
use crate::TelegramMessenger;

#[derive(Clone)]
pub struct AppState {
    pub cfg: Arc<Config>,
    pub bot_cfg: Arc<BotConfig>,
    pub connector: Arc<dyn AccountConnector>,
    pub catalog: SessionCatalog,
    pub store: Arc<IdentityStore>,
    pub settings: Arc<Mutex<SettingsStore>>,
    pub operators: Arc<OperatorSessions>,
    pub messenger: Arc<dyn MessagingPort>,
}

impl AppState {
    /// Open the store and settings under `cfg.data_dir`.
    pub fn new(
        cfg: Arc<Config>,
        bot_cfg: Arc<BotConfig>,
        connector: Arc<dyn AccountConnector>,
        messenger: Arc<dyn MessagingPort>,
    ) -> Result<Self> {
        std::fs::create_dir_all(&cfg.data_dir)?;
        let store = IdentityStore::open_in(&cfg.data_dir)?;
        let settings = SettingsStore::load(cfg.settings_file(), cfg.capture)?;
        Ok(Self {
            catalog: SessionCatalog::new(cfg.sessions_dir.clone()),
            store: Arc::new(store),
            settings: Arc::new(Mutex::new(settings)),
            operators: Arc::new(OperatorSessions::new()),
            cfg,
            bot_cfg,
            connector,
            messenger,
        })
    }
}

/// Entry point for a binary that provides the account transport: sets up logging,
/// loads both configs from the environment and serves until the dispatcher exits.
pub async fn run(service_name: &str, connector: Arc<dyn AccountConnector>) -> anyhow::Result<()> {
    harvest_core::logging::init(service_name)?;

    let cfg = Arc::new(Config::load()?);
    let bot_cfg = Arc::new(BotConfig::load()?);
    tracing::debug!(credentials = ?cfg.credentials, bot = ?bot_cfg, "environment loaded");

    run_polling(cfg, bot_cfg, connector).await
}

pub async fn run_polling(
    cfg: Arc<Config>,
    bot_cfg: Arc<BotConfig>,
    connector: Arc<dyn AccountConnector>,
) -> anyhow::Result<()> {
    let bot = Bot::new(bot_cfg.bot_token.clone());

    if let Ok(me) = bot.get_me().await {
        tracing::info!(bot = %me.username(), "harvester bot started");
    }
    tracing::info!(
        data_dir = %cfg.data_dir.display(),
        sessions_dir = %cfg.sessions_dir.display(),
        operators = bot_cfg.owner_ids.len(),
        "configuration loaded"
    );

    // Progress messages are edited every few seconds per running operation; the
    // throttle keeps those edits under the Bot API per-chat limits.
    let raw_messenger: Arc<dyn MessagingPort> = Arc::new(TelegramMessenger::new(bot.clone()));
    let messenger: Arc<dyn MessagingPort> = Arc::new(ThrottledMessenger::new(
        raw_messenger,
        ThrottleConfig::default(),
    ));

    let state = Arc::new(AppState::new(cfg, bot_cfg, connector, messenger)?);
    let (handles, ids) = state.store.counts();
    tracing::info!(handles, ids, "identity store opened");

    let handler = dptree::entry().branch(Update::filter_message().endpoint(handlers::handle_message));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![state])
        .build()
        .dispatch()
        .await;

    Ok(())
}
