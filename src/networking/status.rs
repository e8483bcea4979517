/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Connectivity inferred from message arrivals.
//!
//! The relay does not report whether a subscription is healthy, so the status is derived from when the
//! last message (of any kind, including our own echoed heartbeats) was observed:
//!
//! ```text
//! Offline --(subscribed)--> Searching --(message observed)--> Live
//!                              ^                               |
//!                              +---(stale window elapsed)------+
//! ```
//!
//! There is no terminal state. Changing the channel key resets the monitor to `Offline`.

use std::{
    fmt::{self, Display, Formatter},
    time::{Duration, Instant},
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectivityStatus {
    Offline,
    Searching,
    Live,
}

impl Display for ConnectivityStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            ConnectivityStatus::Offline => "Offline",
            ConnectivityStatus::Searching => "Searching",
            ConnectivityStatus::Live => "Live",
        };
        f.write_str(name)
    }
}

/// A change of [`ConnectivityStatus`], as `(from, to)`.
pub type StatusChange = (ConnectivityStatus, ConnectivityStatus);

/// Tracks the connectivity status of one subscription.
#[derive(Clone, Debug)]
pub struct ConnectivityMonitor {
    status: ConnectivityStatus,
    last_message_at: Option<Instant>,
    stale_window: Duration,
}

impl ConnectivityMonitor {
    pub fn new(stale_window: Duration) -> Self {
        Self {
            status: ConnectivityStatus::Offline,
            last_message_at: None,
            stale_window,
        }
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.status
    }

    pub fn last_message_at(&self) -> Option<Instant> {
        self.last_message_at
    }

    /// The subscription was torn down, or never came up.
    pub fn on_disconnected(&mut self) -> Option<StatusChange> {
        self.last_message_at = None;
        self.transition(ConnectivityStatus::Offline)
    }

    /// The relay accepted the subscription.
    pub fn on_subscribed(&mut self) -> Option<StatusChange> {
        self.last_message_at = None;
        self.transition(ConnectivityStatus::Searching)
    }

    /// A message was observed at `at`. Ignored while offline, since it cannot belong to the current
    /// subscription.
    pub fn on_message(&mut self, at: Instant) -> Option<StatusChange> {
        if self.status == ConnectivityStatus::Offline {
            return None;
        }
        self.last_message_at = Some(self.last_message_at.map_or(at, |last| last.max(at)));
        self.transition(ConnectivityStatus::Live)
    }

    /// Watchdog check: a live subscription that has seen no message for longer than the stale window
    /// goes back to searching.
    pub fn check(&mut self, now: Instant) -> Option<StatusChange> {
        let stale = match self.last_message_at {
            Some(last) => now.saturating_duration_since(last) > self.stale_window,
            None => true,
        };
        if self.status == ConnectivityStatus::Live && stale {
            self.transition(ConnectivityStatus::Searching)
        } else {
            None
        }
    }

    fn transition(&mut self, to: ConnectivityStatus) -> Option<StatusChange> {
        let from = self.status;
        self.status = to;
        (from != to).then_some((from, to))
    }
}
