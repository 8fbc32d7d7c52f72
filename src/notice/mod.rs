// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Transient user-visible messages.
//!
//! One notice is shown at a time; a new one replaces the old. Notices
//! dismiss themselves after the configured display time.

use std::fmt;
use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::config::NoticeSettings;

/// Outcome a notice reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Failure,
}

/// A posted message
#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
    posted: Instant,
}

impl Notice {
    /// When the notice was posted
    pub fn posted(&self) -> Instant {
        self.posted
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            NoticeKind::Success => write!(f, "{}", self.message),
            NoticeKind::Failure => write!(f, "Error: {}", self.message),
        }
    }
}

/// Holds the notice currently on screen
#[derive(Debug, Clone)]
pub struct NoticeBoard {
    display: Duration,
    current: Option<Notice>,
}

impl NoticeBoard {
    /// Board that keeps notices up for `display`
    pub fn new(display: Duration) -> Self {
        Self {
            display,
            current: None,
        }
    }

    /// Board configured from settings
    pub fn from_settings(settings: &NoticeSettings) -> Self {
        Self::new(settings.display_time())
    }

    /// Post a notice at `now`, replacing any visible one
    pub fn post_at(&mut self, kind: NoticeKind, message: impl Into<String>, now: Instant) {
        let message = message.into();
        match kind {
            NoticeKind::Success => info!("{}", message),
            NoticeKind::Failure => warn!("{}", message),
        }
        self.current = Some(Notice {
            kind,
            message,
            posted: now,
        });
    }

    /// Post a success notice now
    pub fn success(&mut self, message: impl Into<String>) {
        self.post_at(NoticeKind::Success, message, Instant::now());
    }

    /// Post a failure notice now
    pub fn failure(&mut self, message: impl Into<String>) {
        self.post_at(NoticeKind::Failure, message, Instant::now());
    }

    /// The visible notice at `now`, if any
    pub fn visible_at(&self, now: Instant) -> Option<&Notice> {
        self.current
            .as_ref()
            .filter(|n| now.saturating_duration_since(n.posted) < self.display)
    }

    /// Drop the notice once its display time has passed.
    /// Returns true if one was dismissed.
    pub fn expire(&mut self, now: Instant) -> bool {
        if self.current.is_some() && self.visible_at(now).is_none() {
            self.current = None;
            true
        } else {
            false
        }
    }

    /// Remove the visible notice
    pub fn dismiss(&mut self) {
        self.current = None;
    }
}

impl Default for NoticeBoard {
    fn default() -> Self {
        Self::from_settings(&NoticeSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notice_auto_dismisses() {
        let mut board = NoticeBoard::new(Duration::from_millis(1500));
        let t0 = Instant::now();
        board.post_at(NoticeKind::Success, "Exported Quartet", t0);

        assert!(board.visible_at(t0 + Duration::from_millis(1499)).is_some());
        assert!(!board.expire(t0 + Duration::from_millis(1000)));
        assert!(board.visible_at(t0 + Duration::from_millis(1500)).is_none());
        assert!(board.expire(t0 + Duration::from_millis(1500)));
        assert!(!board.expire(t0 + Duration::from_millis(2000)));
    }

    #[test]
    fn test_new_notice_replaces_old() {
        let mut board = NoticeBoard::default();
        let t0 = Instant::now();
        board.post_at(NoticeKind::Success, "first", t0);
        board.post_at(NoticeKind::Failure, "second", t0);

        let notice = board.visible_at(t0).unwrap();
        assert_eq!(notice.kind, NoticeKind::Failure);
        assert_eq!(notice.to_string(), "Error: second");

        board.dismiss();
        assert!(board.visible_at(t0).is_none());
    }
}
