use std::collections::VecDeque;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::alerts::{AlertLevel, BudgetAlert};

const MAX_TOASTS: usize = 5;
const DEFAULT_TOAST_DURATION: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl ToastLevel {
    pub fn icon(&self) -> &'static str {
        match self {
            ToastLevel::Info => "i",
            ToastLevel::Success => "*",
            ToastLevel::Warning => "!",
            ToastLevel::Error => "x",
        }
    }
}

impl From<AlertLevel> for ToastLevel {
    fn from(level: AlertLevel) -> Self {
        match level {
            AlertLevel::None => ToastLevel::Info,
            AlertLevel::Warn75 | AlertLevel::Warn90 => ToastLevel::Warning,
            AlertLevel::Exhausted => ToastLevel::Error,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub created: Instant,
    pub duration: Duration,
}

impl Toast {
    pub fn new(message: impl Into<String>, level: ToastLevel) -> Self {
        Self {
            message: message.into(),
            level,
            created: Instant::now(),
            duration: DEFAULT_TOAST_DURATION,
        }
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn expired(&self) -> bool {
        self.created.elapsed() >= self.duration
    }

    /// One-line rendering, e.g. `[!] Budget 80% used`.
    pub fn line(&self) -> String {
        format!("[{}] {}", self.level.icon(), self.message)
    }
}

impl From<&BudgetAlert> for Toast {
    fn from(alert: &BudgetAlert) -> Self {
        Toast::new(alert.message(), alert.level.into())
    }
}

/// A bounded stack of toast notifications (max 5, oldest evicted first).
#[derive(Debug, Default)]
pub struct NotificationCenter {
    toasts: VecDeque<Toast>,
}

impl NotificationCenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, toast: Toast) {
        tracing::debug!(level = ?toast.level, message = %toast.message, "toast");
        self.toasts.push_back(toast);
        if self.toasts.len() > MAX_TOASTS {
            self.toasts.pop_front();
        }
    }

    pub fn alert(&mut self, alert: &BudgetAlert) {
        self.push(Toast::from(alert));
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(Toast::new(message, ToastLevel::Error));
    }

    /// Remove all expired toasts.
    pub fn tick(&mut self) {
        self.toasts.retain(|t| !t.expired());
    }

    pub fn iter(&self) -> impl Iterator<Item = &Toast> {
        self.toasts.iter()
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}
