/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Definitions of the events emitted by a ledger terminal, for event handling and logging.
//!
//! An event for a given action indicates that the action has been completed. Handlers for each kind of
//! event are registered on the [`TerminalSpec`](crate::terminal::TerminalSpec) builder and run on the
//! event bus thread, never on the thread that applies changes to the ledger.

use std::{sync::mpsc::Sender, time::SystemTime};

use crate::{
    networking::status::ConnectivityStatus,
    rates::ExchangeRates,
    roles::Role,
    types::{
        basic::{Amount, ChannelKey, Epoch, SenderTag},
        ledger_state::SnapshotDigest,
    },
};

pub enum Event {
    // Events that change the ledger.
    PostEntry(PostEntryEvent),
    DeleteEntry(DeleteEntryEvent),
    EndDay(EndDayEvent),
    ReplaceLedger(ReplaceLedgerEvent),
    RejectMutation(RejectMutationEvent),
    // Events that involve publishing to or receiving from the relay.
    PublishSnapshot(PublishSnapshotEvent),
    PublishHeartbeat(PublishHeartbeatEvent),
    ReceiveMessage(ReceiveMessageEvent),
    DropMessage(DropMessageEvent),
    // Terminal events.
    UpdateStatus(UpdateStatusEvent),
    SwitchChannel(SwitchChannelEvent),
    SwitchRole(SwitchRoleEvent),
    UpdateRates(UpdateRatesEvent),
}

impl Event {
    pub(crate) fn publish(event_publisher: &Option<Sender<Event>>, event: Event) {
        if let Some(event_publisher) = event_publisher {
            // The event bus only goes away while the terminal is shutting down.
            let _ = event_publisher.send(event);
        }
    }
}

/// Which of the two transaction streams an entry belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EntryStream {
    Main,
    OutParty,
}

pub struct PostEntryEvent {
    pub timestamp: SystemTime,
    pub stream: EntryStream,
    pub id: String,
}

pub struct DeleteEntryEvent {
    pub timestamp: SystemTime,
    pub stream: EntryStream,
    pub id: String,
}

pub struct EndDayEvent {
    pub timestamp: SystemTime,
    pub carried_balance: Amount,
}

pub struct ReplaceLedgerEvent {
    pub timestamp: SystemTime,
    pub sender: Option<SenderTag>,
    pub digest: SnapshotDigest,
}

/// A mutation was attempted on a terminal whose role does not allow it.
pub struct RejectMutationEvent {
    pub timestamp: SystemTime,
    pub role: Role,
    pub mutation: &'static str,
}

pub struct PublishSnapshotEvent {
    pub timestamp: SystemTime,
    pub channel: ChannelKey,
    pub digest: SnapshotDigest,
    pub epoch: Option<Epoch>,
}

pub struct PublishHeartbeatEvent {
    pub timestamp: SystemTime,
    pub channel: ChannelKey,
}

pub struct ReceiveMessageEvent {
    pub timestamp: SystemTime,
    pub sender: Option<SenderTag>,
    pub carries_snapshot: bool,
    pub updated_at: u64,
}

/// Why an inbound message was dropped without touching the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DropReason {
    MalformedEnvelope(String),
    MalformedPayload(String),
    ForeignTopic(String),
    SupersededAuthority,
}

pub struct DropMessageEvent {
    pub timestamp: SystemTime,
    pub reason: DropReason,
}

pub struct UpdateStatusEvent {
    pub timestamp: SystemTime,
    pub from: ConnectivityStatus,
    pub to: ConnectivityStatus,
}

pub struct SwitchChannelEvent {
    pub timestamp: SystemTime,
    pub channel: ChannelKey,
}

pub struct SwitchRoleEvent {
    pub timestamp: SystemTime,
    pub role: Role,
    pub epoch: Option<Epoch>,
}

pub struct UpdateRatesEvent {
    pub timestamp: SystemTime,
    pub rates: ExchangeRates,
}
