//! Toasts: transient notifications stacked in the top-right corner.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};
use remote_panel::Notification;

use crate::theme::{C_SECONDARY, C_TOAST_ERROR, C_TOAST_INFO, C_TOAST_WARNING};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl Severity {
    fn lifetime(self) -> Duration {
        match self {
            Severity::Info => Duration::from_secs(3),
            Severity::Warning => Duration::from_secs(4),
            Severity::Error => Duration::from_secs(5),
        }
    }
}

struct Toast {
    title: String,
    body: Option<String>,
    severity: Severity,
    expires: Instant,
}

pub struct ToastManager {
    toasts: VecDeque<Toast>,
    max_visible: usize,
}

impl ToastManager {
    pub fn new() -> Self {
        Self {
            toasts: VecDeque::new(),
            max_visible: 4,
        }
    }

    pub fn push(&mut self, title: impl Into<String>, body: Option<String>, severity: Severity) {
        let title = title.into();
        // A repeated title refreshes the existing toast instead of stacking.
        self.toasts.retain(|t| t.title != title);
        self.toasts.push_back(Toast {
            title,
            body,
            severity,
            expires: Instant::now() + severity.lifetime(),
        });
        while self.toasts.len() > self.max_visible {
            self.toasts.pop_front();
        }
    }

    pub fn notification(&mut self, n: Notification) {
        self.push(n.title, n.body, Severity::Info);
    }

    pub fn warning(&mut self, title: impl Into<String>) {
        self.push(title, None, Severity::Warning);
    }

    pub fn error(&mut self, title: impl Into<String>) {
        self.push(title, None, Severity::Error);
    }

    /// Drop expired toasts.  Returns true when something disappeared.
    pub fn tick(&mut self) -> bool {
        let now = Instant::now();
        let before = self.toasts.len();
        self.toasts.retain(|t| t.expires > now);
        self.toasts.len() != before
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let max_width = (area.width / 2).clamp(24, 60);
        let mut y = area.y + 1;

        for toast in self.toasts.iter().rev() {
            if y >= area.y + area.height {
                break;
            }
            let (color, icon) = match toast.severity {
                Severity::Info => (C_TOAST_INFO, "·"),
                Severity::Warning => (C_TOAST_WARNING, "!"),
                Severity::Error => (C_TOAST_ERROR, "✗"),
            };

            let mut spans = vec![Span::styled(
                format!(" {} {}", icon, toast.title),
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )];
            if let Some(body) = &toast.body {
                spans.push(Span::styled(
                    format!("  {}", body),
                    Style::default().fg(C_SECONDARY),
                ));
            }
            spans.push(Span::raw(" "));
            let line = Line::from(spans);

            let w = (line.width() as u16).min(max_width);
            let toast_area = Rect {
                x: area.x + area.width.saturating_sub(w + 1),
                y,
                width: w,
                height: 1,
            };
            frame.render_widget(Clear, toast_area);
            frame.render_widget(Paragraph::new(line), toast_area);
            y += 1;
        }
    }
}

impl Default for ToastManager {
    fn default() -> Self {
        Self::new()
    }
}
