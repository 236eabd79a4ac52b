use std::io::{self, IsTerminal};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use chrono::Local;
use crossterm::event::{
    DisableMouseCapture, EnableMouseCapture, Event as CEvent, EventStream, KeyCode, KeyEvent,
    KeyEventKind, KeyModifiers,
};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use crossterm::{ExecutableCommand, execute, terminal};
use futures_util::StreamExt;
use log::{debug, info, trace, warn};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use tokio::sync::mpsc;

use crate::actions::{ActionId, ActionKeyMap};
use crate::config::AppConfig;
use crate::domain::{ActivePane, CommitRecord, Dimensions, SelectionState};
use crate::error::{RenderError, SourceError};
use crate::git::{self, CliGitClient, GitClient};
use crate::panes::{ContentPane, HistoryPane, PaneEffect};
use crate::render::{self, RenderedContent};
use crate::ui;

pub const WELCOME_TEXT: &str = "Hi welcome to Git Trisect!";
pub const SELECTION_CLEARED_TEXT: &str = "History reloaded, selection cleared.";
const TICK_INTERVAL_MS: u64 = 250;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorOrigin {
    History,
    Branch,
    Diff,
    Render,
}

impl ErrorOrigin {
    fn label(self) -> &'static str {
        match self {
            Self::History => "history unavailable",
            Self::Branch => "branch unavailable",
            Self::Diff => "diff failed",
            Self::Render => "render failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorIndicator {
    pub origin: ErrorOrigin,
    pub message: String,
}

/// Results of background work, delivered through the loop's channel.
#[derive(Debug)]
pub enum AppEvent {
    BranchFetched(String),
    BranchFailed(SourceError),
    HistoryFetched {
        request_id: u64,
        result: Result<Vec<CommitRecord>, SourceError>,
    },
    DiffFinished {
        request_id: u64,
        result: Result<String, SourceError>,
    },
    RenderFinished {
        request_id: u64,
        result: Result<RenderedContent, RenderError>,
    },
}

/// Everything the dispatcher reacts to, one at a time.
#[derive(Debug)]
pub enum Message {
    Terminal(CEvent),
    App(AppEvent),
    Tick,
}

pub struct App {
    pub config: AppConfig,
    pub active: ActivePane,
    pub selection: SelectionState,
    pub dimensions: Dimensions,
    pub history: HistoryPane,
    pub content: ContentPane,
    pub error: Option<ErrorIndicator>,
    pub should_quit: bool,
    pending_fetches: usize,
    spinner_frame: usize,
    history_request_id: u64,
    diff_request_id: u64,
    render_request_id: u64,
    last_render_source: String,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    git: Arc<dyn GitClient>,
    keymap: ActionKeyMap,
}

impl App {
    pub fn new(config: AppConfig) -> Result<Self> {
        let cwd = config
            .repo_dir()
            .context("failed reading current directory")?;
        let git = Arc::new(CliGitClient::new(cwd)) as Arc<dyn GitClient>;
        Self::with_client(config, git)
    }

    pub fn with_client(config: AppConfig, git: Arc<dyn GitClient>) -> Result<Self> {
        let keymap = ActionKeyMap::from_overrides(&config.keybinds)
            .map_err(|issues| anyhow::anyhow!("invalid keybindings: {}", issues.join("; ")))?;
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(Self {
            config,
            active: ActivePane::default(),
            selection: SelectionState::default(),
            dimensions: Dimensions::default(),
            history: HistoryPane::new(),
            content: ContentPane::new(),
            error: None,
            should_quit: false,
            pending_fetches: 0,
            spinner_frame: 0,
            history_request_id: 0,
            diff_request_id: 0,
            render_request_id: 0,
            last_render_source: String::new(),
            event_tx,
            event_rx,
            git,
            keymap,
        })
    }

    /// Issues the startup work: branch and history fetches plus the welcome text.
    pub fn start(&mut self) {
        self.fetch_branch();
        self.fetch_history();
        self.render_text(WELCOME_TEXT.to_string());
    }

    pub async fn run(&mut self) -> Result<()> {
        enable_raw_mode().context("failed enabling raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, terminal::EnterAlternateScreen, EnableMouseCapture)
            .context("failed entering alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("failed creating terminal")?;
        terminal.clear().ok();

        let run_result = self.event_loop(&mut terminal).await;

        self.restore_terminal(terminal)?;
        run_result
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    ) -> Result<()> {
        let size = terminal.size().context("failed reading terminal size")?;
        self.update(Message::Terminal(CEvent::Resize(size.width, size.height)));
        self.start();

        let mut event_stream = EventStream::new();
        let mut tick = tokio::time::interval(Duration::from_millis(TICK_INTERVAL_MS));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            terminal
                .draw(|f| ui::render(f, self))
                .context("terminal draw failed")?;
            if self.should_quit {
                info!("quit requested");
                return Ok(());
            }

            let message = tokio::select! {
                _ = tick.tick() => Message::Tick,
                maybe_ui_event = event_stream.next() => match maybe_ui_event {
                    Some(Ok(event)) => Message::Terminal(event),
                    Some(Err(err)) => bail!("failed reading terminal events: {err}"),
                    None => bail!("terminal event stream closed"),
                },
                maybe_app_event = self.event_rx.recv() => match maybe_app_event {
                    Some(app_event) => Message::App(app_event),
                    None => continue,
                },
            };
            self.update(message);
        }
    }

    fn restore_terminal(&self, mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        disable_raw_mode().ok();
        terminal
            .backend_mut()
            .execute(terminal::LeaveAlternateScreen)
            .ok();
        terminal.backend_mut().execute(DisableMouseCapture).ok();
        terminal.show_cursor().ok();
        Ok(())
    }

    /// Message of the `current` selection, printed after the session ends.
    pub fn outcome(&self) -> Option<String> {
        self.selection
            .current()
            .map(|record| record.message.clone())
    }

    pub fn update(&mut self, message: Message) {
        match message {
            Message::Terminal(CEvent::Key(key)) => {
                if key.kind == KeyEventKind::Press {
                    self.handle_key(key);
                }
            }
            Message::Terminal(CEvent::Resize(width, height)) => self.resize(width, height),
            Message::Terminal(event) => {
                self.forward(&event);
            }
            Message::App(event) => self.handle_app_event(event),
            Message::Tick => self.tick(),
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        let action = self.keymap.action_for_event(key);
        if action == Some(ActionId::TogglePane) {
            self.toggle_pane();
            return;
        }
        if self.active == ActivePane::History && self.history.is_editing_filter() {
            self.forward(&CEvent::Key(key));
            return;
        }

        match action {
            Some(action) => self.dispatch_action(action, key),
            None => {
                self.forward(&CEvent::Key(key));
            }
        }
    }

    fn dispatch_action(&mut self, action: ActionId, key: KeyEvent) {
        debug!("action {}", action.as_str());
        match action {
            ActionId::Quit => self.should_quit = true,
            ActionId::TogglePane => self.toggle_pane(),
            ActionId::ConfirmSelection => self.confirm_selection(),
            ActionId::RequestDiff => self.request_diff(),
            ActionId::Refresh => self.refresh(),
            ActionId::Filter => {
                if self.active == ActivePane::History {
                    self.history.begin_filter();
                } else {
                    self.forward(&CEvent::Key(key));
                }
            }
        }
    }

    /// Hands `event` to the active pane only. `Ignored` means no pane state changed.
    fn forward(&mut self, event: &CEvent) -> PaneEffect {
        let effect = match self.active {
            ActivePane::History => self.history.apply(event),
            ActivePane::Content => self.content.apply(event),
        };
        if effect == PaneEffect::Ignored {
            trace!("{:?} pane ignored {event:?}", self.active);
        }
        effect
    }

    fn toggle_pane(&mut self) {
        self.active = self.active.toggled();
    }

    fn resize(&mut self, width: u16, height: u16) {
        let previous_text_width = self.content.text_width();
        self.dimensions = Dimensions::new(width, height);
        let (pane_width, pane_height) = self.dimensions.pane_size();
        self.history.set_size(pane_width, pane_height);
        self.content.set_size(pane_width, pane_height);

        if self.content.text_width() != previous_text_width && !self.last_render_source.is_empty() {
            self.render_text(self.last_render_source.clone());
        }
    }

    fn tick(&mut self) {
        if self.pending_fetches > 0 {
            self.spinner_frame = self.spinner_frame.wrapping_add(1);
        }
    }

    pub fn is_loading(&self) -> bool {
        self.pending_fetches > 0
    }

    pub fn spinner_frame(&self) -> usize {
        self.spinner_frame
    }

    pub fn key_for_action(&self, action: ActionId) -> &str {
        self.keymap.key_for_action(action).unwrap_or("?")
    }

    fn confirm_selection(&mut self) {
        let Some(record) = self.history.highlighted().cloned() else {
            debug!("confirm ignored: nothing highlighted");
            return;
        };
        info!("selected {}", record.hash);
        self.selection.select(record);
        // A diff for the old pair no longer matches what is selected.
        self.diff_request_id = self.diff_request_id.wrapping_add(1);
        self.render_text(self.selection.status_text());
    }

    fn request_diff(&mut self) {
        let Some((from, to)) = self.selection.diff_refs() else {
            debug!("diff request ignored: selection not ready");
            return;
        };
        let request_id = self.diff_request_id.wrapping_add(1);
        self.diff_request_id = request_id;
        info!("diff #{request_id}: {from}..{to}");

        let tx = self.event_tx.clone();
        let git = Arc::clone(&self.git);
        tokio::spawn(async move {
            let result = git.diff(&from, &to).await;
            let _ = tx.send(AppEvent::DiffFinished { request_id, result });
        });
    }

    fn refresh(&mut self) {
        self.fetch_branch();
        self.fetch_history();
    }

    fn fetch_branch(&mut self) {
        self.pending_fetches += 1;
        let tx = self.event_tx.clone();
        let git = Arc::clone(&self.git);
        tokio::spawn(async move {
            let event = match git.branch().await {
                Ok(name) => AppEvent::BranchFetched(name),
                Err(error) => AppEvent::BranchFailed(error),
            };
            let _ = tx.send(event);
        });
    }

    fn fetch_history(&mut self) {
        self.pending_fetches += 1;
        let request_id = self.history_request_id.wrapping_add(1);
        self.history_request_id = request_id;
        debug!("history #{request_id}");

        let tx = self.event_tx.clone();
        let git = Arc::clone(&self.git);
        let limit = self.config.history_limit;
        tokio::spawn(async move {
            let result = git
                .history(limit)
                .await
                .map(|raw| git::parse_history(&raw));
            let _ = tx.send(AppEvent::HistoryFetched { request_id, result });
        });
    }

    fn render_text(&mut self, text: String) {
        let request_id = self.render_request_id.wrapping_add(1);
        self.render_request_id = request_id;
        let width = self.content.text_width();
        self.last_render_source = text.clone();
        debug!("render #{request_id} at width {width}");

        let tx = self.event_tx.clone();
        tokio::spawn(async move {
            let result = render::render(width, text).await;
            let _ = tx.send(AppEvent::RenderFinished { request_id, result });
        });
    }

    fn set_error(&mut self, origin: ErrorOrigin, message: impl Into<String>) {
        let message = message.into();
        warn!("{}: {message}", origin.label());
        let now = Local::now().format("%H:%M:%S");
        self.error = Some(ErrorIndicator {
            origin,
            message: format!("[{now}] {}: {message}", origin.label()),
        });
    }

    fn clear_error(&mut self, origin: ErrorOrigin) {
        if self.error.as_ref().is_some_and(|err| err.origin == origin) {
            self.error = None;
        }
    }

    fn replace_history(&mut self, records: Vec<CommitRecord>) {
        self.clear_error(ErrorOrigin::History);
        info!("history loaded: {} commits", records.len());
        self.history.set_records(records);
        self.diff_request_id = self.diff_request_id.wrapping_add(1);
        if self.selection.current().is_some() {
            self.selection.reset();
            self.render_text(SELECTION_CLEARED_TEXT.to_string());
        }
    }

    fn handle_app_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::BranchFetched(name) => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                self.clear_error(ErrorOrigin::Branch);
                self.history.set_branch(name);
            }
            AppEvent::BranchFailed(error) => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                self.set_error(ErrorOrigin::Branch, error.to_string());
            }
            AppEvent::HistoryFetched { request_id, result } => {
                self.pending_fetches = self.pending_fetches.saturating_sub(1);
                if request_id != self.history_request_id {
                    debug!("discarding stale history #{request_id}");
                    return;
                }
                match result {
                    Ok(records) => self.replace_history(records),
                    Err(err) => self.set_error(ErrorOrigin::History, err.to_string()),
                }
            }
            AppEvent::DiffFinished { request_id, result } => {
                if request_id != self.diff_request_id {
                    debug!("discarding stale diff #{request_id}");
                    return;
                }
                match result {
                    Ok(diff) => {
                        self.clear_error(ErrorOrigin::Diff);
                        self.render_text(render::diff_document(&diff));
                    }
                    Err(err) => self.set_error(ErrorOrigin::Diff, err.to_string()),
                }
            }
            AppEvent::RenderFinished { request_id, result } => {
                if request_id != self.render_request_id {
                    debug!("discarding stale render #{request_id}");
                    return;
                }
                match result {
                    Ok(content) => {
                        self.clear_error(ErrorOrigin::Render);
                        self.content.set_content(content);
                    }
                    Err(err) => {
                        let fallback = RenderedContent::plain_fallback(
                            self.content.text_width(),
                            &self.last_render_source,
                            &err,
                        );
                        self.set_error(ErrorOrigin::Render, err.to_string());
                        self.content.set_content(fallback);
                    }
                }
            }
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<Option<String>> {
    if !io::stdout().is_terminal() {
        bail!("gittrisect needs an interactive terminal (stdout is not a tty)");
    }
    let mut app = App::new(config)?;
    app.run().await?;
    Ok(app.outcome())
}
