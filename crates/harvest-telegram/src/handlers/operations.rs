use std::{future::Future, sync::Arc, time::Duration};

use chrono::Utc;
use tokio::{sync::oneshot, time::sleep};
use tokio_util::sync::CancellationToken;

use harvest_core::{
    catalog::SessionFile,
    domain::OperatorId,
    extract::{ExtractionEngine, ExtractionOutcome, ExtractionRequest, GroupSelector, ScanMode},
    formatting::{
        escape_html, format_extraction, format_groups, format_invite, format_progress,
        format_sessions,
    },
    invite::InviteEngine,
    messaging::{
        port::MessagingPort,
        types::{ChatId, MessageRef},
    },
    progress::Progress,
    session::OperationKind,
    settings::CaptureToggle,
    Error,
};

use crate::commands::{parse_command, BotCommand, FilterFlags, HELP_TEXT};
use crate::router::AppState;

const BUSY: &str = "⚠️ An operation is already running. Use /status or /cancel.";
const HINT: &str = "Send /start for the list of commands.";

fn format_duration(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let mins = (seconds % 3600) / 60;
    let secs = seconds % 60;
    if hours > 0 {
        return format!("{hours}h {mins}m {secs}s");
    }
    if mins > 0 {
        return format!("{mins}m {secs}s");
    }
    format!("{secs}s")
}

fn on_off(v: bool) -> &'static str {
    if v {
        "on"
    } else {
        "off"
    }
}

fn error_html(context: &str, e: &Error) -> String {
    format!(
        "❌ {}: <code>{}</code>",
        escape_html(context),
        escape_html(&e.to_string())
    )
}

/// Split on line boundaries so that no chunk exceeds `limit` bytes.
fn split_lines(html: &str, limit: usize) -> Vec<String> {
    if html.len() <= limit {
        return vec![html.to_string()];
    }

    let mut out = Vec::new();
    let mut chunk = String::new();
    for line in html.lines() {
        if !chunk.is_empty() && chunk.len() + 1 + line.len() > limit {
            out.push(std::mem::take(&mut chunk));
        }
        if !chunk.is_empty() {
            chunk.push('\n');
        }
        chunk.push_str(line);
    }
    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}

async fn send_html_split(state: &AppState, chat: ChatId, html: &str) {
    let limit = state.messenger.capabilities().max_message_len.max(200);
    for chunk in split_lines(html, limit) {
        if let Err(e) = state.messenger.send_html(chat, &chunk).await {
            tracing::warn!(chat = chat.0, error = %e, "failed to send reply");
        }
    }
}

/// Gate on `BOT_OWNER_IDS`, then run the text as a command. Anyone else gets no reply.
pub async fn handle_text(state: Arc<AppState>, user: Option<OperatorId>, chat: ChatId, text: &str) {
    if !state.bot_cfg.is_authorized(user) {
        tracing::warn!(user = ?user.map(|u| u.0), chat = chat.0, "unauthorized message ignored");
        return;
    }
    let Some(operator) = user else {
        return;
    };
    if !text.starts_with('/') {
        send_html_split(&state, chat, HINT).await;
        return;
    }
    handle_command(state, operator, chat, text).await;
}

pub async fn handle_command(state: Arc<AppState>, operator: OperatorId, chat: ChatId, text: &str) {
    let cmd = match parse_command(text) {
        Ok(cmd) => cmd,
        Err(e) => {
            send_html_split(&state, chat, &escape_html(&e.reply())).await;
            return;
        }
    };
    tracing::info!(operator = operator.0, command = ?cmd, "command received");

    match cmd {
        BotCommand::Help => send_html_split(&state, chat, HELP_TEXT).await,

        BotCommand::Sessions => {
            let body = match state.catalog.list() {
                Ok(sessions) => format_sessions(&sessions),
                Err(e) => error_html("Failed to list sessions", &e),
            };
            send_html_split(&state, chat, &body).await;
        }

        BotCommand::Groups { session } => {
            let Some(session) = session_at(&state, chat, session).await else {
                return;
            };
            let body = match list_groups(&state, &session).await {
                Ok(body) => body,
                Err(e) => error_html("Failed to list groups", &e),
            };
            send_html_split(&state, chat, &body).await;
        }

        BotCommand::Extract {
            session,
            target,
            mode,
            flags,
        } => start_extraction(state, operator, chat, session, target, mode, flags).await,

        BotCommand::Invite {
            session,
            channel,
            limit,
        } => start_invite(state, operator, chat, session, channel, limit).await,

        BotCommand::Status => {
            let body = match state.operators.status(operator).await {
                Some(s) => {
                    let elapsed = Utc::now().signed_duration_since(s.started_at).num_seconds();
                    format!(
                        "⏳ <b>{}</b>\n{}\nRunning for {}",
                        escape_html(&s.kind.label()),
                        format_progress(s.progress),
                        format_duration(elapsed)
                    )
                }
                None => "Nothing is running.".to_string(),
            };
            send_html_split(&state, chat, &body).await;
        }

        BotCommand::Cancel => {
            let body = if state.operators.cancel(operator).await {
                "🛑 Cancelled. Entries written so far are kept."
            } else {
                "Nothing is running."
            };
            send_html_split(&state, chat, body).await;
        }

        BotCommand::ToggleIds => toggle(&state, chat, CaptureToggle::Ids, "User id").await,
        BotCommand::ToggleHandles => {
            toggle(&state, chat, CaptureToggle::Handles, "Username").await
        }

        BotCommand::Clear => {
            let body = if state.operators.status(operator).await.is_some() {
                BUSY.to_string()
            } else {
                match state.store.clear() {
                    Ok(()) => "🧹 usernames.txt and userids.txt cleared.".to_string(),
                    Err(e) => error_html("Failed to clear the store", &e),
                }
            };
            send_html_split(&state, chat, &body).await;
        }

        BotCommand::Config => {
            let body = render_config(&state).await;
            send_html_split(&state, chat, &body).await;
        }
    }
}

async fn session_at(state: &AppState, chat: ChatId, index: usize) -> Option<SessionFile> {
    match state.catalog.get(index) {
        Ok(Some(session)) => Some(session),
        Ok(None) => {
            let body = format!("Invalid session index {index}. Use /sessions.");
            send_html_split(state, chat, &body).await;
            None
        }
        Err(e) => {
            send_html_split(state, chat, &error_html("Failed to list sessions", &e)).await;
            None
        }
    }
}

async fn list_groups(state: &AppState, session: &SessionFile) -> harvest_core::Result<String> {
    let account = state.connector.connect(session).await?;
    let groups = ExtractionEngine::list_eligible_groups(account.as_ref()).await?;
    Ok(format_groups(&groups))
}

async fn start_extraction(
    state: Arc<AppState>,
    operator: OperatorId,
    chat: ChatId,
    session: usize,
    target: GroupSelector,
    mode: ScanMode,
    flags: FilterFlags,
) {
    let Some(session) = session_at(&state, chat, session).await else {
        return;
    };

    let target_label = match (target, mode) {
        (GroupSelector::All, ScanMode::Members) => "members of all groups".to_string(),
        (GroupSelector::Index(i), ScanMode::Members) => format!("members of group {i}"),
        (GroupSelector::All, ScanMode::ActiveSenders { .. }) => {
            "active senders of all groups".to_string()
        }
        (GroupSelector::Index(i), ScanMode::ActiveSenders { .. }) => {
            format!("active senders of group {i}")
        }
    };
    let kind = OperationKind::Extract {
        session: session.name.clone(),
        target: target_label,
    };
    let Some(progress) = state.operators.begin(operator, kind.clone()).await else {
        send_html_split(&state, chat, BUSY).await;
        return;
    };

    let req = ExtractionRequest {
        target,
        filter: flags.apply(state.cfg.filter),
        mode,
        capture: state.settings.lock().await.current(),
    };
    let engine = ExtractionEngine::new(state.cfg.active_batch_size);
    let st = state.clone();
    let p = progress.clone();
    let work = async move {
        let account = st.connector.connect(&session).await?;
        let outcome = engine.extract(account.as_ref(), &st.store, &req, &p).await?;
        Ok::<_, Error>(match outcome {
            ExtractionOutcome::Completed(stats) => format_extraction(&stats),
            ExtractionOutcome::InvalidIndex { index, available } => format!(
                "Invalid group index {index}: {available} groups available. Use /groups."
            ),
        })
    };

    spawn_operation(state, operator, chat, kind, progress, work).await;
}

async fn start_invite(
    state: Arc<AppState>,
    operator: OperatorId,
    chat: ChatId,
    session: usize,
    channel: String,
    limit: Option<usize>,
) {
    let Some(session) = session_at(&state, chat, session).await else {
        return;
    };

    let kind = OperationKind::Invite {
        session: session.name.clone(),
        channel: channel.clone(),
    };
    let Some(progress) = state.operators.begin(operator, kind.clone()).await else {
        send_html_split(&state, chat, BUSY).await;
        return;
    };

    let engine = InviteEngine::new(state.cfg.invite_pacing);
    let limit = limit.or(Some(state.cfg.invite_limit));
    let st = state.clone();
    let p = progress.clone();
    let work = async move {
        let account = st.connector.connect(&session).await?;
        let summary = engine
            .invite_from_store(account.as_ref(), &st.store, &channel, limit, &p)
            .await?;
        Ok::<_, Error>(format_invite(&summary))
    };

    spawn_operation(state, operator, chat, kind, progress, work).await;
}

/// Run `work` on its own task, with a progress message that is refreshed until the
/// work ends. The task is registered with the operator so `/cancel` can abort it, and
/// it does nothing until that registration has happened.
async fn spawn_operation<F>(
    state: Arc<AppState>,
    operator: OperatorId,
    chat: ChatId,
    kind: OperationKind,
    progress: Arc<Progress>,
    work: F,
) where
    F: Future<Output = harvest_core::Result<String>> + Send + 'static,
{
    let label = kind.label();
    let st = state.clone();
    let (registered_tx, registered_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        if registered_rx.await.is_err() {
            tracing::info!(operator = operator.0, op = %label, "operation cancelled before start");
            return;
        }
        let ticker = CancellationToken::new();
        // Stops the progress loop when this task is aborted.
        let _ticker_guard = ticker.clone().drop_guard();

        match st
            .messenger
            .send_html(chat, &format!("⏳ {}", escape_html(&label)))
            .await
        {
            Ok(msg) => {
                tokio::spawn(show_progress(
                    st.messenger.clone(),
                    msg,
                    label.clone(),
                    progress,
                    st.bot_cfg.progress_interval,
                    ticker.clone(),
                ));
            }
            Err(e) => tracing::warn!(error = %e, "failed to send progress message"),
        }

        let body = match work.await {
            Ok(body) => body,
            Err(e) => {
                tracing::warn!(operator = operator.0, op = %label, error = %e, "operation failed");
                error_html(&format!("{label} failed"), &e)
            }
        };
        ticker.cancel();
        send_html_split(&st, chat, &body).await;
        st.operators.finish(operator).await;
    });
    if state.operators.attach(operator, task.abort_handle()).await {
        let _ = registered_tx.send(());
    }
}

async fn show_progress(
    messenger: Arc<dyn MessagingPort>,
    msg: MessageRef,
    label: String,
    progress: Arc<Progress>,
    every: Duration,
    stop: CancellationToken,
) {
    let mut last = None;
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            _ = sleep(every) => {}
        }
        let snap = progress.snapshot();
        if last == Some(snap) {
            continue;
        }
        last = Some(snap);
        let html = format!("⏳ {}\n{}", escape_html(&label), format_progress(snap));
        if let Err(e) = messenger.edit_html(msg, &html).await {
            tracing::debug!(error = %e, "progress edit failed");
        }
    }
}

async fn toggle(state: &AppState, chat: ChatId, which: CaptureToggle, name: &str) {
    let res = state.settings.lock().await.toggle(which);
    let body = match res {
        Ok(on) => format!("{name} capture: <b>{}</b>", on_off(on)),
        Err(e) => error_html("Failed to save settings", &e),
    };
    send_html_split(state, chat, &body).await;
}

async fn render_config(state: &AppState) -> String {
    let cfg = &state.cfg;
    let capture = state.settings.lock().await.current();
    let (handles, ids) = state.store.counts();
    let inactivity = match cfg.filter.max_inactivity_days {
        Some(days) => format!("{days} days"),
        None => "off".to_string(),
    };

    let mut out = String::from("⚙️ <b>Configuration</b>\n");
    out.push_str(&format!("API_ID: <code>{}</code>\n", cfg.credentials.api_id));
    out.push_str(&format!(
        "API_HASH: <code>{}</code>\n",
        escape_html(&cfg.credentials.masked_hash())
    ));
    out.push_str(&format!(
        "Sessions dir: <code>{}</code>\n",
        escape_html(&cfg.sessions_dir.display().to_string())
    ));
    out.push_str(&format!(
        "Data dir: <code>{}</code>\n",
        escape_html(&cfg.data_dir.display().to_string())
    ));
    out.push_str(&format!(
        "Capture usernames: {} · ids: {}\n",
        on_off(capture.handles),
        on_off(capture.ids)
    ));
    out.push_str(&format!("Stored: {handles} usernames · {ids} ids\n"));
    out.push_str(&format!(
        "Default filter: skip admins {} · max inactivity {inactivity} · keep recently online {}\n",
        on_off(cfg.filter.exclude_admins),
        on_off(cfg.filter.include_recently_online)
    ));
    out.push_str(&format!(
        "Invites: limit {} · delay {}-{}s",
        cfg.invite_limit,
        cfg.invite_pacing.min_delay.as_secs(),
        cfg.invite_pacing.max_delay.as_secs()
    ));
    out
}
