/// Chat session: one dispatch loop over everything that can happen
///
/// The session is an explicit context object with a `start`/`dispose`
/// lifecycle — no process-wide mutable state. Network work runs in spawned
/// tasks that report back through a single mpsc; every conversation-scoped
/// completion carries the key it was issued for and is discarded when the
/// user has switched away in the meantime.
use crate::api::ApiClient;
use crate::channel::{ChannelEvent, ChatChannel};
use crate::config::ChatConfig;
use crate::error::{ChatError, Result};
use crate::roster::{RosterState, SelectionChange};
use crate::store::ConversationStore;
use crate::types::{ChatMessage, Conversation, ConversationKey, HistoryPage, PushEvent};
use crate::viewport::{ScrollAction, ViewportCoordinator};
use std::collections::HashSet;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Lifecycle of the conversation view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewPhase {
    Idle,
    InitialLoading,
    Ready,
}

/// Everything the dispatch loop consumes
#[derive(Debug)]
pub enum SessionEvent {
    HistoryLoaded {
        key: ConversationKey,
        page: u32,
        result: Result<HistoryPage>,
    },
    SendCompleted {
        key: ConversationKey,
        draft: String,
        result: Result<ChatMessage>,
    },
    Channel {
        key: ConversationKey,
        event: ChannelEvent,
    },
    RosterLoaded {
        result: Result<Vec<Conversation>>,
    },
}

pub struct ChatSession {
    config: ChatConfig,
    api: ApiClient,

    tx: mpsc::UnboundedSender<SessionEvent>,
    rx: mpsc::UnboundedReceiver<SessionEvent>,

    store: ConversationStore,
    roster: RosterState,
    viewport: ViewportCoordinator,

    phase: ViewPhase,
    backfilling: bool,
    sending: bool,
    composer: String,
    error: Option<String>,
    pending_scroll: ScrollAction,

    active: Option<ConversationKey>,
    channel: Option<ChatChannel>,
    channel_rx: Option<mpsc::UnboundedReceiver<ChannelEvent>>,
    online_users: HashSet<i64>,

    roster_task: Option<tokio::task::JoinHandle<()>>,
}

impl ChatSession {
    pub fn new(config: ChatConfig) -> Self {
        let api = ApiClient::new(&config);
        Self::with_api(config, api)
    }

    pub fn with_api(config: ChatConfig, api: ApiClient) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let page_size = config.page_size;
        Self {
            config,
            api,
            tx,
            rx,
            store: ConversationStore::new(page_size),
            roster: RosterState::new(),
            viewport: ViewportCoordinator::new(),
            phase: ViewPhase::Idle,
            backfilling: false,
            sending: false,
            composer: String::new(),
            error: None,
            pending_scroll: ScrollAction::None,
            active: None,
            channel: None,
            channel_rx: None,
            online_users: HashSet::new(),
            roster_task: None,
        }
    }

    /// Fetch the roster now and keep it fresh on a fixed interval. The timer
    /// is a fallback against missed pushes; the per-conversation channel
    /// never drives roster updates.
    pub fn start(&mut self) {
        self.spawn_roster_fetch();

        let api = self.api.clone();
        let tx = self.tx.clone();
        let period = self.config.roster_refresh_interval;
        self.roster_task = Some(tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // First tick fires immediately; start() already fetched
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let result = api.roster().await;
                if tx.send(SessionEvent::RosterLoaded { result }).is_err() {
                    break;
                }
            }
        }));
    }

    /// Tear down the channel and background tasks. The session can be
    /// restarted with `start()`.
    pub fn dispose(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.channel_rx = None;
        if let Some(task) = self.roster_task.take() {
            task.abort();
        }
        self.store.reset();
        self.viewport.reset();
        self.online_users.clear();
        self.active = None;
        self.phase = ViewPhase::Idle;
        self.backfilling = false;
        self.sending = false;
    }

    /// Switch the active conversation: close the old channel, reset the
    /// store, fetch page 1, open a new channel.
    pub fn select_conversation(&mut self, conversation: &Conversation) {
        let key = conversation.key();
        if self.active == Some(key) && self.phase != ViewPhase::Idle {
            return;
        }

        info!(
            listing_id = key.listing_id,
            other_user_id = key.other_user_id,
            "selecting conversation"
        );

        // Old channel is closed before the new one opens; at most one is live
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
        self.channel_rx = None;

        self.store.reset();
        self.viewport.reset();
        self.online_users.clear();
        self.error = None;
        self.backfilling = false;
        self.sending = false;
        self.pending_scroll = ScrollAction::None;

        self.active = Some(key);
        self.roster.select(key);
        self.phase = ViewPhase::InitialLoading;

        self.spawn_history_fetch(key, 1);

        match ChatChannel::open(
            &self.config.ws_base_url,
            self.config.access_token.as_deref(),
            key.listing_id,
        ) {
            Ok((channel, rx)) => {
                self.channel = Some(channel);
                self.channel_rx = Some(rx);
            }
            Err(e) => {
                // Backfill-only mode: history and sends still work
                warn!("push channel unavailable: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    /// Re-fetch page 1 for the active conversation (inline error retry)
    pub fn reload(&mut self) {
        let Some(key) = self.active else { return };
        self.store.reset();
        self.viewport.reset();
        self.error = None;
        self.backfilling = false;
        self.phase = ViewPhase::InitialLoading;
        self.spawn_history_fetch(key, 1);
    }

    /// Send the composer content. The composer is cleared before the round
    /// trip and restored verbatim if the send fails — no placeholder message
    /// is ever shown.
    pub fn send_message(&mut self) {
        let Some(key) = self.active else { return };
        if self.sending || self.composer.trim().is_empty() {
            return;
        }

        let draft = std::mem::take(&mut self.composer);
        self.sending = true;

        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.send_message(key.listing_id, &draft).await;
            let _ = tx.send(SessionEvent::SendCompleted { key, draft, result });
        });
    }

    /// Fetch the next older page. Re-entrant calls while a backfill is in
    /// flight are no-ops.
    pub fn load_older_messages(&mut self) {
        let Some(key) = self.active else { return };
        if self.phase != ViewPhase::Ready || self.backfilling || !self.store.has_more() {
            return;
        }

        self.backfilling = true;
        self.viewport.begin_backfill();
        self.spawn_history_fetch(key, self.store.current_page() + 1);
    }

    /// Wait for the next event from any source (fetch completions, channel
    /// pushes, roster refreshes). Returns `None` once the session is disposed
    /// and drained.
    pub async fn next_event(&mut self) -> Option<SessionEvent> {
        loop {
            match (&mut self.channel_rx, self.active) {
                (Some(rx), Some(key)) => {
                    tokio::select! {
                        ev = self.rx.recv() => return ev,
                        ch = rx.recv() => match ch {
                            Some(event) => return Some(SessionEvent::Channel { key, event }),
                            None => {
                                // Reader task ended; stop polling its channel
                                self.channel_rx = None;
                                continue;
                            }
                        },
                    }
                }
                _ => return self.rx.recv().await,
            }
        }
    }

    /// Apply one event to the session state
    pub fn handle_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::HistoryLoaded { key, page, result } => {
                if self.active != Some(key) {
                    debug!(
                        listing_id = key.listing_id,
                        page, "discarding stale history result"
                    );
                    return;
                }
                self.handle_history(page, result);
            }
            SessionEvent::SendCompleted { key, draft, result } => {
                if self.active != Some(key) {
                    debug!(listing_id = key.listing_id, "discarding stale send result");
                    return;
                }
                self.handle_send(draft, result);
            }
            SessionEvent::Channel { key, event } => {
                if self.active != Some(key) {
                    return;
                }
                self.handle_channel(event);
            }
            SessionEvent::RosterLoaded { result } => self.handle_roster(result),
        }
    }

    fn handle_history(&mut self, page: u32, result: Result<HistoryPage>) {
        if page == 1 {
            match result {
                Ok(history) => {
                    self.store.load_initial(history.messages, history.total_pages);
                    self.phase = ViewPhase::Ready;
                    self.pending_scroll = self.viewport.after_initial_load();
                }
                Err(e) => {
                    warn!("initial history load failed: {}", e);
                    self.error = Some(e.to_string());
                    self.phase = ViewPhase::Ready;
                }
            }
        } else {
            self.backfilling = false;
            match result {
                Ok(history) => {
                    self.store.prepend_older(history.messages, history.total_pages);
                    self.pending_scroll = self.viewport.after_backfill();
                }
                Err(e) => {
                    warn!("backfill failed: {}", e);
                    self.viewport.cancel_backfill();
                    self.error = Some(e.to_string());
                }
            }
        }
    }

    fn handle_send(&mut self, draft: String, result: Result<ChatMessage>) {
        self.sending = false;
        match result {
            Ok(message) => {
                if self.store.append_sent(message) {
                    self.pending_scroll = self.viewport.after_tail_growth();
                }
                // Bump last_message/ordering in the roster
                self.spawn_roster_fetch();
            }
            Err(e) => {
                warn!("send failed: {}", e);
                self.error = Some(e.to_string());
                self.composer = draft;
            }
        }
    }

    fn handle_channel(&mut self, event: ChannelEvent) {
        match event {
            ChannelEvent::Connected => {
                debug!("push channel ready");
            }
            ChannelEvent::Push(PushEvent::NewMessage(message)) => {
                // Live tail append; the echo of our own confirmed send is a no-op
                if self.store.append_live(message) {
                    self.pending_scroll = self.viewport.after_tail_growth();
                }
            }
            ChannelEvent::Push(PushEvent::UserOnline(p)) => {
                self.online_users.insert(p.user_id);
            }
            ChannelEvent::Push(PushEvent::UserOffline(p)) => {
                self.online_users.remove(&p.user_id);
            }
            ChannelEvent::Error(cause) => {
                // Degraded but alive: history and sends keep working, live
                // updates resume on the next conversation reselect
                warn!("push channel degraded: {}", cause);
                self.error = Some(ChatError::Channel(cause).to_string());
            }
            ChannelEvent::Closed => {
                debug!("push channel closed by server");
            }
        }
    }

    fn handle_roster(&mut self, result: Result<Vec<Conversation>>) {
        match result {
            Ok(conversations) => match self.roster.replace(conversations) {
                SelectionChange::Kept => {}
                SelectionChange::Switched(conversation) => {
                    self.select_conversation(&conversation);
                }
                SelectionChange::Cleared => {
                    if self.active.is_some() {
                        if let Some(mut channel) = self.channel.take() {
                            channel.close();
                        }
                        self.channel_rx = None;
                        self.store.reset();
                        self.viewport.reset();
                        self.online_users.clear();
                        self.active = None;
                        self.phase = ViewPhase::Idle;
                    }
                }
            },
            Err(e) => {
                // The stale roster stays usable; the failure is still surfaced
                warn!("roster refresh failed: {}", e);
                self.error = Some(e.to_string());
            }
        }
    }

    fn spawn_history_fetch(&self, key: ConversationKey, page: u32) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        let page_size = self.config.page_size;
        tokio::spawn(async move {
            let result = api
                .history(key.listing_id, key.other_user_id, page, page_size)
                .await;
            let _ = tx.send(SessionEvent::HistoryLoaded { key, page, result });
        });
    }

    fn spawn_roster_fetch(&self) {
        let api = self.api.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let result = api.roster().await;
            let _ = tx.send(SessionEvent::RosterLoaded { result });
        });
    }

    // ── Observable state ────────────────────────────────────────────────

    pub fn messages(&self) -> &[ChatMessage] {
        self.store.messages()
    }

    pub fn has_more_messages(&self) -> bool {
        self.store.has_more()
    }

    pub fn phase(&self) -> ViewPhase {
        self.phase
    }

    pub fn loading(&self) -> bool {
        self.phase == ViewPhase::InitialLoading
    }

    pub fn loading_more(&self) -> bool {
        self.backfilling
    }

    pub fn sending(&self) -> bool {
        self.sending
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn composer(&self) -> &str {
        &self.composer
    }

    pub fn set_composer(&mut self, text: impl Into<String>) {
        self.composer = text.into();
    }

    pub fn roster(&self) -> &[Conversation] {
        self.roster.conversations()
    }

    pub fn selected_conversation(&self) -> Option<&Conversation> {
        self.roster.selected()
    }

    pub fn online_users(&self) -> &HashSet<i64> {
        &self.online_users
    }

    /// The scroll decision produced by the most recent mutation; consuming
    /// it resets to `None`
    pub fn take_scroll_action(&mut self) -> ScrollAction {
        std::mem::replace(&mut self.pending_scroll, ScrollAction::None)
    }

    /// The embedding view reports its scroll offset here so backfill can
    /// restore it
    pub fn set_viewport_offset(&mut self, offset_from_top: f64) {
        self.viewport.set_offset(offset_from_top);
    }
}

impl Drop for ChatSession {
    fn drop(&mut self) {
        if let Some(task) = self.roster_task.take() {
            task.abort();
        }
    }
}
