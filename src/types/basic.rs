/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! "Inert" newtypes used across the crate. The API for using these types is defined in this module.

use std::{
    fmt::{self, Display, Formatter},
    time::SystemTime,
};

use serde::{Deserialize, Serialize};

/// A monetary amount. Amounts are ordinary floating-point numbers, summed in insertion order.
pub type Amount = f64;

/// Channel key used when neither a query parameter nor a previously used key is available.
pub const DEFAULT_CHANNEL_KEY: &str = "shivas-beach-main";

/// The shared identifier that an editor and its viewers use to rendezvous on the relay.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelKey(String);

impl ChannelKey {
    /// Create a channel key from user-supplied text. Surrounding whitespace is trimmed, and blank
    /// input yields `None`.
    pub fn parse(key: &str) -> Option<ChannelKey> {
        let key = key.trim();
        if key.is_empty() {
            None
        } else {
            Some(ChannelKey(key.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The relay topic this key maps to under `namespace`.
    pub fn topic(&self, namespace: &str) -> Topic {
        Topic(format!("{}/{}", namespace, self.0))
    }
}

impl Default for ChannelKey {
    fn default() -> Self {
        ChannelKey(DEFAULT_CHANNEL_KEY.to_string())
    }
}

impl Display for ChannelKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// A fully namespaced relay topic, e.g. `cashledger/shivas-beach-main`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Topic(String);

impl Topic {
    pub fn new(topic: impl Into<String>) -> Self {
        Self(topic.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Topic {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Opaque tag identifying the terminal that published a message.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SenderTag(String);

impl SenderTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// A fresh random tag, rendered as 16 lowercase hex digits.
    pub fn random() -> Self {
        Self(format!("{:016x}", rand::random::<u64>()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for SenderTag {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Authority epoch of an editor: the wall-clock millisecond at which it became the editor. Only used
/// when authority arbitration is enabled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Epoch(u64);

impl Epoch {
    pub const fn new(int: u64) -> Self {
        Self(int)
    }

    pub const fn int(&self) -> u64 {
        self.0
    }

    pub fn now() -> Self {
        Self(millis_since_unix_epoch(SystemTime::now()))
    }
}

impl Display for Epoch {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        Display::fmt(&self.0, f)
    }
}

/// Milliseconds elapsed between the Unix Epoch and `timestamp`, saturating at zero for timestamps
/// before the epoch.
pub fn millis_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_millis() as u64)
        .unwrap_or(0)
}
