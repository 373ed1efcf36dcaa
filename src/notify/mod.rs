//! Transient notifications ("toasts").

pub mod desktop;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Toasts fade for this long before they are removed.
pub const FADE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

impl ToastKind {
    pub fn label(self) -> &'static str {
        match self {
            ToastKind::Info => "info",
            ToastKind::Success => "ok",
            ToastKind::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub created: Instant,
}

#[derive(Debug, Clone)]
pub struct Toasts {
    items: VecDeque<Toast>,
    ttl: Duration,
    /// Every toast pushed and not yet drained, for CLI output.
    pending: Vec<Toast>,
}

impl Toasts {
    pub fn new(ttl: Duration) -> Self {
        Self {
            items: VecDeque::new(),
            ttl,
            pending: Vec::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) {
        self.push_at(kind, message, Instant::now());
    }

    pub fn push_at(&mut self, kind: ToastKind, message: impl Into<String>, now: Instant) {
        let toast = Toast {
            kind,
            message: message.into(),
            created: now,
        };
        match kind {
            ToastKind::Error => log::warn!("{}", toast.message),
            _ => log::info!("{}", toast.message),
        }
        self.pending.push(toast.clone());
        self.items.push_back(toast);
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Info, message);
    }

    pub fn success(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Success, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Error, message);
    }

    /// Drop toasts whose time is up.
    pub fn prune(&mut self, now: Instant) {
        let ttl = self.ttl + FADE;
        self.items
            .retain(|t| now.saturating_duration_since(t.created) < ttl);
    }

    /// Toasts still on screen, oldest first.
    pub fn visible(&self, now: Instant) -> impl Iterator<Item = &Toast> {
        let ttl = self.ttl + FADE;
        self.items
            .iter()
            .filter(move |t| now.saturating_duration_since(t.created) < ttl)
    }

    pub fn is_fading(&self, toast: &Toast, now: Instant) -> bool {
        now.saturating_duration_since(toast.created) >= self.ttl
    }

    /// Hand over everything pushed since the last drain.
    pub fn drain(&mut self) -> Vec<Toast> {
        std::mem::take(&mut self.pending)
    }

    pub fn last(&self) -> Option<&Toast> {
        self.items.back()
    }
}
