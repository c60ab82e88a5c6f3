//! App: terminal host for the panel.
//!
//! Renders the current snapshot and turns key presses into intents.  Every
//! intent runs as its own task, so a slow `play` never blocks a volume
//! change.  Failures come back as error toasts; the model shows whatever the
//! dispatcher left in it.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame, Terminal,
};
use remote_panel::{ControlState, Dispatcher, Intent, Notification, Snapshot, StatusModel};
use remote_proto::protocol::{Channel, ShowInfo};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::theme::{
    style_border, style_default, style_disabled, style_playing, style_secondary, style_title,
    C_PLAYING,
};
use crate::widgets::toast::ToastManager;

#[derive(Debug)]
enum AppMessage {
    Event(Event),
    ModelChanged,
    Notice(Notification),
    CommandFailed(String),
}

pub struct App {
    model: StatusModel,
    dispatcher: Dispatcher,
    snapshot: Snapshot,
    toasts: ToastManager,
    should_quit: bool,
}

impl App {
    pub fn new(model: StatusModel, dispatcher: Dispatcher) -> Self {
        Self {
            model,
            dispatcher,
            snapshot: Snapshot::default(),
            toasts: ToastManager::new(),
            should_quit: false,
        }
    }

    pub async fn run(mut self, notices: mpsc::UnboundedReceiver<Notification>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let mut terminal = Terminal::new(CrosstermBackend::new(stdout))?;

        let res = self.event_loop(&mut terminal, notices).await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        res
    }

    async fn event_loop(
        &mut self,
        terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
        mut notices: mpsc::UnboundedReceiver<Notification>,
    ) -> anyhow::Result<()> {
        let (tx, mut rx) = mpsc::channel::<AppMessage>(256);

        // ── keyboard ──────────────────────────────────────────────────────────
        let key_tx = tx.clone();
        tokio::task::spawn_blocking(move || {
            while !key_tx.is_closed() {
                match event::poll(Duration::from_millis(250)) {
                    Ok(true) => match event::read() {
                        Ok(ev) => {
                            if key_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                                break;
                            }
                        }
                        Err(_) => break,
                    },
                    Ok(false) => {}
                    Err(_) => break,
                }
            }
        });

        // ── model changes ─────────────────────────────────────────────────────
        let model_tx = tx.clone();
        let mut changed = self.model.subscribe();
        tokio::spawn(async move {
            while changed.changed().await.is_ok() {
                if model_tx.send(AppMessage::ModelChanged).await.is_err() {
                    break;
                }
            }
        });

        // ── notifications ─────────────────────────────────────────────────────
        let notice_tx = tx.clone();
        tokio::spawn(async move {
            while let Some(n) = notices.recv().await {
                if notice_tx.send(AppMessage::Notice(n)).await.is_err() {
                    break;
                }
            }
        });

        let mut toast_tick = tokio::time::interval(Duration::from_millis(250));
        toast_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        self.snapshot = self.model.snapshot().await;

        while !self.should_quit {
            terminal.draw(|f| self.draw(f))?;

            tokio::select! {
                Some(msg) = rx.recv() => self.handle_message(msg, &tx).await,
                _ = toast_tick.tick() => {
                    self.toasts.tick();
                }
            }
        }

        info!("app: quit");
        Ok(())
    }

    async fn handle_message(&mut self, msg: AppMessage, tx: &mpsc::Sender<AppMessage>) {
        match msg {
            AppMessage::Event(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                self.handle_key(key, tx);
            }
            AppMessage::Event(_) => {}
            AppMessage::ModelChanged => {
                self.snapshot = self.model.snapshot().await;
            }
            AppMessage::Notice(n) => self.toasts.notification(n),
            AppMessage::CommandFailed(e) => self.toasts.error(e),
        }
    }

    fn handle_key(&mut self, key: KeyEvent, tx: &mpsc::Sender<AppMessage>) {
        let controls = ControlState::from_status(&self.snapshot.status);
        let intent = match key.code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('1') => Intent::Play(Channel::One),
            KeyCode::Char('2') => Intent::Play(Channel::Two),
            KeyCode::Char('s') | KeyCode::Char(' ') => Intent::Stop,
            KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right | KeyCode::Up => {
                controls.volume_up()
            }
            KeyCode::Char('-') | KeyCode::Left | KeyCode::Down => controls.volume_down(),
            KeyCode::Char('a') => controls.toggle_autoconnect(),
            _ => return,
        };

        if !controls.allows(&intent) {
            debug!("app: {:?} ignored, control disabled", intent);
            if !matches!(intent, Intent::Stop) {
                self.toasts.warning("No player available");
            }
            return;
        }

        let dispatcher = self.dispatcher.clone();
        let tx = tx.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatcher.dispatch(intent).await {
                warn!("app: {:?} failed: {}", intent, e);
                let _ = tx.send(AppMessage::CommandFailed(e.to_string())).await;
            }
        });
    }

    // ── rendering ─────────────────────────────────────────────────────────────

    fn draw(&self, frame: &mut Frame) {
        let area = frame.area();
        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Length(6),
                Constraint::Min(4),
                Constraint::Length(1),
            ])
            .split(area);

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(" NTS Radio", style_title()))),
            rows[0],
        );
        self.draw_status(frame, rows[1]);
        self.draw_now_playing(frame, rows[2]);
        self.draw_help(frame, rows[3]);
        self.toasts.draw(frame, area);
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect) {
        let status = &self.snapshot.status;
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border())
            .title(" Status ");
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let state = match (status.available, status.channel) {
            (false, _) => Span::styled("unavailable", style_disabled()),
            (true, Some(ch)) => Span::styled(format!("playing channel {ch}"), style_playing()),
            (true, None) => Span::styled("stopped", style_secondary()),
        };
        let player = status.player.as_deref().unwrap_or("none");
        let autoconnect = if status.autoconnect { "on" } else { "off" };

        let lines = vec![
            Line::from(vec![Span::styled("State        ", style_secondary()), state]),
            Line::from(vec![
                Span::styled("Player       ", style_secondary()),
                Span::styled(player.to_string(), style_default()),
            ]),
            Line::from(vec![
                Span::styled("Auto-reconnect ", style_secondary()),
                Span::styled(autoconnect, style_default()),
            ]),
        ];
        let split = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Length(1)])
            .split(inner);
        frame.render_widget(Paragraph::new(lines), split[0]);

        let gauge = Gauge::default()
            .gauge_style(ratatui::style::Style::default().fg(C_PLAYING))
            .percent(u16::from(status.volume))
            .label(format!("volume {}", status.volume));
        frame.render_widget(gauge, split[1]);
    }

    fn draw_now_playing(&self, frame: &mut Frame, area: Rect) {
        let np = &self.snapshot.now_playing;
        let title = match np.fetched_at {
            Some(at) => format!(
                " Now playing (updated {}) ",
                at.with_timezone(&chrono::Local).format("%H:%M")
            ),
            None => " Now playing ".to_string(),
        };
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(style_border())
            .title(title);

        let mut lines = Vec::new();
        for ch in [Channel::One, Channel::Two] {
            let active = self.snapshot.status.channel == Some(ch);
            lines.extend(show_lines(ch, np.for_channel(ch), active));
        }
        frame.render_widget(Paragraph::new(lines).block(block), area);
    }

    fn draw_help(&self, frame: &mut Frame, area: Rect) {
        let controls = ControlState::from_status(&self.snapshot.status);
        let key = |label: &str, enabled: bool| {
            Span::styled(
                format!(" {label} "),
                if enabled { style_default() } else { style_disabled() },
            )
        };
        let line = Line::from(vec![
            key("1/2 play", controls.play_enabled),
            key("s stop", controls.stop_enabled),
            key("-/+ volume", controls.volume_enabled),
            key("a auto-reconnect", controls.autoconnect_enabled),
            key("q quit", true),
        ]);
        frame.render_widget(Paragraph::new(line), area);
    }
}

fn show_lines(ch: Channel, show: Option<&ShowInfo>, active: bool) -> Vec<Line<'static>> {
    let marker = if active { "▶" } else { " " };
    let head_style = if active { style_playing() } else { style_default() };
    let now = show
        .and_then(|s| s.now_title.clone())
        .unwrap_or_else(|| "-".to_string());
    let next = show
        .and_then(|s| s.next_title.clone())
        .unwrap_or_else(|| "-".to_string());
    vec![
        Line::from(vec![
            Span::styled(format!("{marker} NTS {ch}  "), head_style),
            Span::styled(now, style_default()),
        ]),
        Line::from(Span::styled(format!("        next: {next}"), style_secondary())),
    ]
}
