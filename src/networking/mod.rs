/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Pluggable publish/subscribe replication.
//!
//! The relay itself is provided by the library user through the [`Relay`] trait. It is assumed to be
//! best-effort: messages may be dropped, duplicated, reordered, and echoed back to their publisher.
//! The rest of this module builds the replication channel on top of it:
//! - [`messages`]: the JSON envelope published under a channel key.
//! - [`receiving`]: the scoped [`Subscription`] that owns the poller thread.
//! - [`status`]: connectivity inferred from message arrivals, since the relay does not report it.

pub mod messages;

pub(crate) mod receiving;

pub mod relay;

pub mod status;

pub use relay::{Relay, RelayError};
pub(crate) use receiving::Subscription;
