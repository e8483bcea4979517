/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Operator-specified parameters of a ledger terminal.
//!
//! Every parameter has a default, so the smallest valid configuration is
//! `Configuration::builder().build()`:
//!
//! ```ignore
//! let configuration =
//!     Configuration::builder()
//!     .namespace("cashledger".to_string())
//!     .heartbeat_interval(Duration::from_secs(3))
//!     .stale_window(Duration::from_secs(10))
//!     .log_events(true)
//!     .build()
//! ```
//!
//! ## Timing
//!
//! `stale_window` must be comfortably longer than `heartbeat_interval`, otherwise a healthy but idle
//! channel will flap between live and searching. The watchdog runs every `watchdog_interval`, so a
//! stale channel is noticed between `stale_window` and `stale_window + watchdog_interval` after the
//! last message.

use std::time::Duration;

use typed_builder::TypedBuilder;

use crate::{
    persistence::snapshot_store::{DEFAULT_CHANNEL_KEY_SLOT, DEFAULT_SNAPSHOT_SLOT},
    roles::DEFAULT_NARROW_VIEWPORT_WIDTH,
};

/// Namespace under which channel keys are published on the relay.
pub const DEFAULT_NAMESPACE: &str = "shivas-ledger";

/// With the default heartbeat interval, a late joiner sees the snapshot within 15 seconds.
pub const DEFAULT_HEARTBEATS_PER_SNAPSHOT: u32 = 5;

#[derive(Clone, Debug, TypedBuilder)]
#[builder(builder_method(doc = "
    Create a builder for building a [Configuration]. Every setter is optional; unset parameters take
    the values of [Configuration::default].
"))]
pub struct Configuration {
    #[builder(default = DEFAULT_NAMESPACE.to_string(), setter(doc = "Set the relay namespace that channel keys are published under."))]
    pub namespace: String,
    #[builder(default = DEFAULT_SNAPSHOT_SLOT.to_string(), setter(doc = "Set the storage key of the persisted ledger snapshot."))]
    pub snapshot_slot: String,
    #[builder(default = DEFAULT_CHANNEL_KEY_SLOT.to_string(), setter(doc = "Set the storage key of the last used channel key."))]
    pub channel_key_slot: String,
    #[builder(default = Duration::from_secs(3), setter(doc = "Set how often an editor publishes a heartbeat."))]
    pub heartbeat_interval: Duration,
    #[builder(default = Duration::from_secs(10), setter(doc = "Set how long a live channel may go without messages before it is considered stale."))]
    pub stale_window: Duration,
    #[builder(default = Duration::from_secs(5), setter(doc = "Set how often the connectivity watchdog runs."))]
    pub watchdog_interval: Duration,
    #[builder(default = Duration::from_secs(300), setter(doc = "Set how often exchange rates are fetched."))]
    pub rate_poll_interval: Duration,
    #[builder(default = DEFAULT_NARROW_VIEWPORT_WIDTH, setter(doc = "Set the viewport width, in pixels, below which terminals default to viewer."))]
    pub narrow_viewport_width: u32,
    #[builder(default = DEFAULT_HEARTBEATS_PER_SNAPSHOT, setter(doc = "Set how many heartbeats may pass after the last published snapshot before a heartbeat carries the snapshot again. 0 means heartbeats never carry it, 1 means every heartbeat does."))]
    pub heartbeats_per_snapshot: u32,
    #[builder(default = false, setter(doc = "Set whether viewers only accept snapshots from the editor with the highest authority epoch."))]
    pub authority_arbitration: bool,
    #[builder(default = false, setter(doc = "Enable logging of events?"))]
    pub log_events: bool,
}

impl Default for Configuration {
    fn default() -> Self {
        Configuration::builder().build()
    }
}
