/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions that log out events.
//!
//! The logs defined in this module are printed if the user enabled them via the terminal's
//! [configuration](crate::config::Configuration).
//!
//! This crate logs using the [log](https://docs.rs/log/latest/log/) crate. To get these messages
//! printed onto a terminal or to a file, set up a
//! [logging implementation](https://docs.rs/log/latest/log/#available-logging-implementations), for
//! example with [`setup_stdout_logger`].
//!
//! ## Log message format
//!
//! Log messages are CSVs (Comma Separated Values) with at least two values. The first two values are
//! always:
//! 1. The name of the [event](crate::events) in PascalCase (defined in this module as constants).
//! 2. The time the event was emitted (as number of seconds since the Unix Epoch).
//!
//! The rest of the values differ depending on the kind of event. For example, the following snippet
//! is how a [ReplaceLedger](crate::events::ReplaceLedgerEvent) is printed:
//!
//! ```text
//! ReplaceLedger, 1701329264, 9f0c3a2d41e7b655, Xk3v9Qa
//! ```
//!
//! In the snippet:
//! - The third value is the sender tag of the message that carried the snapshot (`-` if none).
//! - The fourth value is the first seven characters of the Base64 encoding of the snapshot digest.

use std::{io, thread, time::SystemTime};

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use log::LevelFilter;

use crate::{
    events::*,
    types::basic::{Epoch, SenderTag},
};

// Names of each event in PascalCase for printing:
pub const POST_ENTRY: &str = "PostEntry";
pub const DELETE_ENTRY: &str = "DeleteEntry";
pub const END_DAY: &str = "EndDay";
pub const REPLACE_LEDGER: &str = "ReplaceLedger";
pub const REJECT_MUTATION: &str = "RejectMutation";

pub const PUBLISH_SNAPSHOT: &str = "PublishSnapshot";
pub const PUBLISH_HEARTBEAT: &str = "PublishHeartbeat";
pub const RECEIVE_MESSAGE: &str = "ReceiveMessage";
pub const DROP_MESSAGE: &str = "DropMessage";

pub const UPDATE_STATUS: &str = "UpdateStatus";
pub const SWITCH_CHANNEL: &str = "SwitchChannel";
pub const SWITCH_ROLE: &str = "SwitchRole";
pub const UPDATE_RATES: &str = "UpdateRates";

/// Implemented by event types. Used to get a closure that logs the event.
pub(crate) trait Logger {
    /// Returns a pointer to the default logging handler for a given event type.
    fn get_logger() -> Box<dyn Fn(&Self) + Send>;
}

impl Logger for PostEntryEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |post_entry_event: &PostEntryEvent| {
            log::info!(
                "{}, {}, {:?}, {}",
                POST_ENTRY,
                secs_since_unix_epoch(post_entry_event.timestamp),
                post_entry_event.stream,
                post_entry_event.id
            )
        };
        Box::new(logger)
    }
}

impl Logger for DeleteEntryEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |delete_entry_event: &DeleteEntryEvent| {
            log::info!(
                "{}, {}, {:?}, {}",
                DELETE_ENTRY,
                secs_since_unix_epoch(delete_entry_event.timestamp),
                delete_entry_event.stream,
                delete_entry_event.id
            )
        };
        Box::new(logger)
    }
}

impl Logger for EndDayEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |end_day_event: &EndDayEvent| {
            log::info!(
                "{}, {}, {}",
                END_DAY,
                secs_since_unix_epoch(end_day_event.timestamp),
                end_day_event.carried_balance
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReplaceLedgerEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |replace_ledger_event: &ReplaceLedgerEvent| {
            log::info!(
                "{}, {}, {}, {}",
                REPLACE_LEDGER,
                secs_since_unix_epoch(replace_ledger_event.timestamp),
                sender_or_dash(&replace_ledger_event.sender),
                first_seven_base64_chars(&replace_ledger_event.digest.bytes())
            )
        };
        Box::new(logger)
    }
}

impl Logger for RejectMutationEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |reject_mutation_event: &RejectMutationEvent| {
            log::info!(
                "{}, {}, {}, {}",
                REJECT_MUTATION,
                secs_since_unix_epoch(reject_mutation_event.timestamp),
                reject_mutation_event.role,
                reject_mutation_event.mutation
            )
        };
        Box::new(logger)
    }
}

impl Logger for PublishSnapshotEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |publish_snapshot_event: &PublishSnapshotEvent| {
            log::info!(
                "{}, {}, {}, {}, {}",
                PUBLISH_SNAPSHOT,
                secs_since_unix_epoch(publish_snapshot_event.timestamp),
                publish_snapshot_event.channel,
                first_seven_base64_chars(&publish_snapshot_event.digest.bytes()),
                epoch_or_dash(&publish_snapshot_event.epoch)
            )
        };
        Box::new(logger)
    }
}

impl Logger for PublishHeartbeatEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |publish_heartbeat_event: &PublishHeartbeatEvent| {
            log::debug!(
                "{}, {}, {}",
                PUBLISH_HEARTBEAT,
                secs_since_unix_epoch(publish_heartbeat_event.timestamp),
                publish_heartbeat_event.channel
            )
        };
        Box::new(logger)
    }
}

impl Logger for ReceiveMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |receive_message_event: &ReceiveMessageEvent| {
            log::debug!(
                "{}, {}, {}, {}, {}",
                RECEIVE_MESSAGE,
                secs_since_unix_epoch(receive_message_event.timestamp),
                sender_or_dash(&receive_message_event.sender),
                receive_message_event.carries_snapshot,
                receive_message_event.updated_at
            )
        };
        Box::new(logger)
    }
}

impl Logger for DropMessageEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |drop_message_event: &DropMessageEvent| {
            log::warn!(
                "{}, {}, {:?}",
                DROP_MESSAGE,
                secs_since_unix_epoch(drop_message_event.timestamp),
                drop_message_event.reason
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpdateStatusEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_status_event: &UpdateStatusEvent| {
            log::info!(
                "{}, {}, {}, {}",
                UPDATE_STATUS,
                secs_since_unix_epoch(update_status_event.timestamp),
                update_status_event.from,
                update_status_event.to
            )
        };
        Box::new(logger)
    }
}

impl Logger for SwitchChannelEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |switch_channel_event: &SwitchChannelEvent| {
            log::info!(
                "{}, {}, {}",
                SWITCH_CHANNEL,
                secs_since_unix_epoch(switch_channel_event.timestamp),
                switch_channel_event.channel
            )
        };
        Box::new(logger)
    }
}

impl Logger for SwitchRoleEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |switch_role_event: &SwitchRoleEvent| {
            log::info!(
                "{}, {}, {}, {}",
                SWITCH_ROLE,
                secs_since_unix_epoch(switch_role_event.timestamp),
                switch_role_event.role,
                epoch_or_dash(&switch_role_event.epoch)
            )
        };
        Box::new(logger)
    }
}

impl Logger for UpdateRatesEvent {
    fn get_logger() -> Box<dyn Fn(&Self) + Send> {
        let logger = |update_rates_event: &UpdateRatesEvent| {
            log::debug!(
                "{}, {}, {}, {}",
                UPDATE_RATES,
                secs_since_unix_epoch(update_rates_event.timestamp),
                update_rates_event.rates.usd_to_lkr,
                update_rates_event.rates.eur_to_lkr
            )
        };
        Box::new(logger)
    }
}

/// Set up a logger that prints all log messages with level `level` and above to standard output,
/// prefixed with the emitting thread and the level. Fails if a logger has already been set.
pub fn setup_stdout_logger(level: LevelFilter) -> Result<(), log::SetLoggerError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{:?}][{}] {}",
                thread::current().id(),
                record.level(),
                message
            ))
        })
        .level(level)
        .chain(io::stdout())
        .apply()
}

// Get a more readable representation of a bytesequence by base64-encoding it and taking the first 7
// characters.
pub(crate) fn first_seven_base64_chars(bytes: &[u8]) -> String {
    let encoded = STANDARD_NO_PAD.encode(bytes);
    if encoded.len() > 7 {
        encoded[0..7].to_string()
    } else {
        encoded
    }
}

fn secs_since_unix_epoch(timestamp: SystemTime) -> u64 {
    timestamp
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|duration| duration.as_secs())
        .unwrap_or(0)
}

fn sender_or_dash(sender: &Option<SenderTag>) -> String {
    sender
        .as_ref()
        .map_or_else(|| "-".to_string(), |sender| sender.to_string())
}

fn epoch_or_dash(epoch: &Option<Epoch>) -> String {
    epoch.map_or_else(|| "-".to_string(), |epoch| epoch.to_string())
}
