/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The single-threaded core of a ledger terminal.
//!
//! [`SyncEngine`] ties the [ledger](crate::ledger), the [snapshot store](crate::persistence), the
//! [relay](crate::networking) and the [role](crate::roles) together. It does no scheduling of its own:
//! the [driver](crate::driver) thread calls into it for each of the three kinds of trigger, one at a
//! time:
//! 1. A local mutation ([`apply`](SyncEngine::apply)):
//!     * Viewers ignore it.
//!     * Editors apply it to the store, save the snapshot, then publish it.
//! 2. An inbound message ([`on_message`](SyncEngine::on_message)):
//!     * Messages that cannot be decoded, or that belong to another channel, are logged and dropped.
//!     * Any decodable message counts as a sign of life for the connectivity status.
//!     * Editors never let a snapshot replace their ledger.
//!     * Viewers replace their ledger wholesale with the snapshot, then save it.
//! 3. A timer tick ([`on_heartbeat_due`](SyncEngine::on_heartbeat_due),
//!    [`on_watchdog_tick`](SyncEngine::on_watchdog_tick)).
//!
//! Replication is "last snapshot observed wins". There is no merge and no ordering between publishers:
//! the design assumes a single editor per channel. Optional authority arbitration (see
//! [`crate::roles`]) makes viewers ignore snapshots from editors with a lower epoch.

use std::{
    sync::mpsc::Sender,
    time::{Instant, SystemTime},
};

use crate::{
    config::Configuration,
    events::*,
    ledger::{compute_totals, LedgerStore, Totals},
    networking::{
        messages::SyncMessage,
        status::{ConnectivityMonitor, ConnectivityStatus, StatusChange},
        Relay,
    },
    persistence::{KVStore, SnapshotStore},
    rates::ExchangeRates,
    roles::{AuthorityTracker, Role},
    types::{
        basic::{Amount, ChannelKey, Epoch, SenderTag, Topic},
        entries::{MainEntry, OutPartyEntry},
        ledger_state::{LedgerState, SnapshotDigest},
    },
};

/// A change to the ledger requested by the local user.
#[derive(Clone, Debug, PartialEq)]
pub enum Mutation {
    AddOutParty(OutPartyEntry),
    AddMain(MainEntry),
    DeleteOutParty(String),
    DeleteMain(String),
    EndDay,
}

impl Mutation {
    pub fn name(&self) -> &'static str {
        match self {
            Mutation::AddOutParty(_) => "AddOutParty",
            Mutation::AddMain(_) => "AddMain",
            Mutation::DeleteOutParty(_) => "DeleteOutParty",
            Mutation::DeleteMain(_) => "DeleteMain",
            Mutation::EndDay => "EndDay",
        }
    }
}

/// What became of a [`Mutation`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MutationOutcome {
    /// The ledger changed, was saved, and was published.
    Applied,
    /// An add named an id already present in that stream. Nothing changed.
    Duplicate,
    /// A delete named an id that is not in the ledger. Nothing changed.
    NotFound,
    /// The end of day was not confirmed. Nothing changed.
    Declined,
    /// The terminal is a viewer. Nothing changed.
    Ignored,
}

/// What became of an inbound message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MessageOutcome {
    /// The ledger was replaced with the carried snapshot.
    Replaced,
    /// The message carried no snapshot, or the snapshot equals the ledger already held.
    Unchanged,
    /// The terminal is the editor, so the snapshot was not applied.
    Ignored,
    Dropped(DropReason),
}

/// Asks the user to confirm closing the day.
pub trait Confirm: Send {
    /// Return whether to end the day. `drawer_balance` is the balance that will be carried forward.
    fn confirm_end_day(&mut self, drawer_balance: Amount) -> bool;
}

/// A [`Confirm`] that answers every prompt the same way.
#[derive(Clone, Copy, Debug)]
pub struct FixedAnswer(pub bool);

impl Confirm for FixedAnswer {
    fn confirm_end_day(&mut self, _: Amount) -> bool {
        self.0
    }
}

pub struct SyncEngine<K: KVStore, R: Relay + 'static, C: Confirm> {
    store: LedgerStore,
    snapshots: SnapshotStore<K>,
    relay: R,
    confirmer: C,
    role: Role,
    namespace: String,
    channel: ChannelKey,
    topic: Topic,
    sender: SenderTag,
    epoch: Option<Epoch>,
    authority: AuthorityTracker,
    monitor: ConnectivityMonitor,
    last_applied: Option<SnapshotDigest>,
    rates: Option<ExchangeRates>,
    heartbeats_per_snapshot: u32,
    heartbeats_since_snapshot: u32,
    authority_arbitration: bool,
    event_publisher: Option<Sender<Event>>,
}

impl<K: KVStore, R: Relay + 'static, C: Confirm> SyncEngine<K, R, C> {
    /// Create an engine holding the ledger persisted in `kv_store` (or an empty one). The engine starts
    /// offline; the owner is responsible for subscribing to [`topic`](Self::topic) and then calling
    /// [`on_subscribed`](Self::on_subscribed).
    pub fn new(
        configuration: &Configuration,
        kv_store: K,
        relay: R,
        confirmer: C,
        role: Role,
        channel: ChannelKey,
        event_publisher: Option<Sender<Event>>,
    ) -> Self {
        let snapshots = SnapshotStore::new(
            kv_store,
            &configuration.snapshot_slot,
            &configuration.channel_key_slot,
        );
        let store = LedgerStore::new(snapshots.load());
        let topic = channel.topic(&configuration.namespace);
        let epoch = (configuration.authority_arbitration && role == Role::Editor).then(Epoch::now);

        Self {
            store,
            snapshots,
            relay,
            confirmer,
            role,
            namespace: configuration.namespace.clone(),
            channel,
            topic,
            sender: SenderTag::random(),
            epoch,
            authority: AuthorityTracker::new(),
            monitor: ConnectivityMonitor::new(configuration.stale_window),
            last_applied: None,
            rates: None,
            heartbeats_per_snapshot: configuration.heartbeats_per_snapshot,
            heartbeats_since_snapshot: 0,
            authority_arbitration: configuration.authority_arbitration,
            event_publisher,
        }
    }

    pub fn state(&self) -> &LedgerState {
        self.store.state()
    }

    pub fn totals(&self) -> Totals {
        compute_totals(self.store.state())
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn channel(&self) -> &ChannelKey {
        &self.channel
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn sender(&self) -> &SenderTag {
        &self.sender
    }

    pub fn epoch(&self) -> Option<Epoch> {
        self.epoch
    }

    pub fn status(&self) -> ConnectivityStatus {
        self.monitor.status()
    }

    pub fn last_message_at(&self) -> Option<Instant> {
        self.monitor.last_message_at()
    }

    pub fn rates(&self) -> Option<ExchangeRates> {
        self.rates
    }

    pub(crate) fn relay(&self) -> &R {
        &self.relay
    }

    /* ↓↓↓ Local mutations ↓↓↓ */

    /// Apply a local mutation. On an editor, an applied mutation is saved and then published.
    pub fn apply(&mut self, mutation: Mutation) -> MutationOutcome {
        if !self.role.may_mutate() {
            self.publish_event(Event::RejectMutation(RejectMutationEvent {
                timestamp: SystemTime::now(),
                role: self.role,
                mutation: mutation.name(),
            }));
            return MutationOutcome::Ignored;
        }

        let event = match mutation {
            Mutation::AddOutParty(entry) => {
                let id = entry.id.clone();
                if !self.store.add_out_party(entry) {
                    return MutationOutcome::Duplicate;
                }
                posted(EntryStream::OutParty, id)
            }
            Mutation::AddMain(entry) => {
                let id = entry.id.clone();
                if !self.store.add_main(entry) {
                    return MutationOutcome::Duplicate;
                }
                posted(EntryStream::Main, id)
            }
            Mutation::DeleteOutParty(id) => {
                if !self.store.delete_out_party(&id) {
                    return MutationOutcome::NotFound;
                }
                deleted(EntryStream::OutParty, id)
            }
            Mutation::DeleteMain(id) => {
                if !self.store.delete_main(&id) {
                    return MutationOutcome::NotFound;
                }
                deleted(EntryStream::Main, id)
            }
            Mutation::EndDay => {
                // Captured before the reset, and not recomputed after it.
                let drawer_balance = self.totals().drawer_balance;
                if !self.confirmer.confirm_end_day(drawer_balance) {
                    return MutationOutcome::Declined;
                }
                self.store.end_day(drawer_balance);
                Event::EndDay(EndDayEvent {
                    timestamp: SystemTime::now(),
                    carried_balance: drawer_balance,
                })
            }
        };

        self.persist();
        self.publish_snapshot();
        self.publish_event(event);
        MutationOutcome::Applied
    }

    /* ↓↓↓ Inbound messages ↓↓↓ */

    /// Process a raw message received on `topic` at `received_at`.
    pub fn on_message(&mut self, topic: &Topic, raw: &str, received_at: Instant) -> MessageOutcome {
        if topic != &self.topic {
            return self.drop_message(DropReason::ForeignTopic(topic.to_string()));
        }

        let message = match SyncMessage::decode(raw) {
            Ok(message) => message,
            Err(err) => return self.drop_message(DropReason::MalformedEnvelope(err.to_string())),
        };
        let snapshot = match message.ledger_state() {
            Ok(snapshot) => snapshot,
            Err(err) => return self.drop_message(DropReason::MalformedPayload(err.to_string())),
        };

        let status_change = self.monitor.on_message(received_at);
        self.publish_status_change(status_change);
        self.publish_event(Event::ReceiveMessage(ReceiveMessageEvent {
            timestamp: SystemTime::now(),
            sender: message.sender.clone(),
            carries_snapshot: snapshot.is_some(),
            updated_at: message.updated_at,
        }));

        if self.role == Role::Editor {
            return MessageOutcome::Ignored;
        }

        if self.authority_arbitration && !self.authority.admit(message.epoch) {
            return self.drop_message(DropReason::SupersededAuthority);
        }

        match snapshot {
            Some((state, digest)) => self.replace(state, digest, message.sender),
            None => MessageOutcome::Unchanged,
        }
    }

    fn replace(
        &mut self,
        state: LedgerState,
        digest: SnapshotDigest,
        sender: Option<SenderTag>,
    ) -> MessageOutcome {
        if self.last_applied == Some(digest) && self.store.state() == &state {
            return MessageOutcome::Unchanged;
        }

        self.store.replace_all(state);
        self.last_applied = Some(digest);
        self.persist();
        self.publish_event(Event::ReplaceLedger(ReplaceLedgerEvent {
            timestamp: SystemTime::now(),
            sender,
            digest,
        }));
        MessageOutcome::Replaced
    }

    fn drop_message(&mut self, reason: DropReason) -> MessageOutcome {
        self.publish_event(Event::DropMessage(DropMessageEvent {
            timestamp: SystemTime::now(),
            reason: reason.clone(),
        }));
        MessageOutcome::Dropped(reason)
    }

    /* ↓↓↓ Timers ↓↓↓ */

    /// Heartbeat timer fired. Editors publish a payload-less heartbeat, except that every
    /// `heartbeats_per_snapshot`-th heartbeat since the last published snapshot carries the current
    /// snapshot so that late joiners converge.
    pub fn on_heartbeat_due(&mut self) {
        if self.role != Role::Editor {
            return;
        }

        self.heartbeats_since_snapshot = self.heartbeats_since_snapshot.saturating_add(1);
        let carries_snapshot = self.heartbeats_per_snapshot != 0
            && self.heartbeats_since_snapshot >= self.heartbeats_per_snapshot;

        let message = if carries_snapshot {
            match SyncMessage::snapshot(self.store.state(), self.sender.clone(), self.epoch) {
                Ok(message) => message,
                Err(err) => {
                    log::warn!("Failed to serialize heartbeat snapshot: {}", err);
                    return;
                }
            }
        } else {
            SyncMessage::heartbeat(self.sender.clone(), self.epoch)
        };

        if self.publish(&message) {
            if carries_snapshot {
                self.heartbeats_since_snapshot = 0;
            }
            self.publish_event(Event::PublishHeartbeat(PublishHeartbeatEvent {
                timestamp: SystemTime::now(),
                channel: self.channel.clone(),
            }));
        }
    }

    /// Watchdog timer fired.
    pub fn on_watchdog_tick(&mut self, now: Instant) {
        let status_change = self.monitor.check(now);
        self.publish_status_change(status_change);
    }

    /* ↓↓↓ Channel and role ↓↓↓ */

    /// The relay accepted the subscription to [`topic`](Self::topic). Editors publish their ledger right
    /// away, so that viewers already on the channel do not wait for the next heartbeat.
    pub fn on_subscribed(&mut self) {
        let status_change = self.monitor.on_subscribed();
        self.publish_status_change(status_change);
        self.publish_snapshot();
    }

    /// The subscription to [`topic`](Self::topic) was torn down or could not be established.
    pub fn on_unsubscribed(&mut self) {
        let status_change = self.monitor.on_disconnected();
        self.publish_status_change(status_change);
    }

    /// Move to another channel. The caller must have torn down the subscription to the old topic, and
    /// is responsible for subscribing to the new one.
    pub fn switch_channel(&mut self, channel: ChannelKey) {
        self.on_unsubscribed();
        self.topic = channel.topic(&self.namespace);
        self.channel = channel;
        self.authority.reset();
        self.last_applied = None;
        self.remember_channel();
        self.publish_event(Event::SwitchChannel(SwitchChannelEvent {
            timestamp: SystemTime::now(),
            channel: self.channel.clone(),
        }));
    }

    /// Save the current channel key as this device's last used key.
    pub fn remember_channel(&mut self) {
        if let Err(err) = self.snapshots.save_channel_key(&self.channel) {
            log::warn!("Failed to save channel key {}: {}", self.channel, err);
        }
    }

    pub fn set_role(&mut self, role: Role) {
        if role == self.role {
            return;
        }

        self.role = role;
        self.epoch = (self.authority_arbitration && role == Role::Editor).then(Epoch::now);
        self.authority.reset();
        self.last_applied = None;
        self.publish_event(Event::SwitchRole(SwitchRoleEvent {
            timestamp: SystemTime::now(),
            role,
            epoch: self.epoch,
        }));
        if self.monitor.status() != ConnectivityStatus::Offline {
            self.publish_snapshot();
        }
    }

    pub fn on_rates(&mut self, rates: ExchangeRates) {
        self.rates = Some(rates);
        self.publish_event(Event::UpdateRates(UpdateRatesEvent {
            timestamp: SystemTime::now(),
            rates,
        }));
    }

    /* ↓↓↓ Helpers ↓↓↓ */

    fn persist(&mut self) {
        if let Err(err) = self.snapshots.save(self.store.state()) {
            log::warn!("Failed to save ledger snapshot: {}", err);
        }
    }

    /// Publish the ledger, if this terminal is the editor.
    fn publish_snapshot(&mut self) {
        if self.role != Role::Editor {
            return;
        }

        let message = match SyncMessage::snapshot(self.store.state(), self.sender.clone(), self.epoch)
        {
            Ok(message) => message,
            Err(err) => {
                log::warn!("Failed to serialize ledger snapshot: {}", err);
                return;
            }
        };
        let digest = message.payload.as_deref().map(SnapshotDigest::of);

        if let (true, Some(digest)) = (self.publish(&message), digest) {
            self.heartbeats_since_snapshot = 0;
            self.publish_event(Event::PublishSnapshot(PublishSnapshotEvent {
                timestamp: SystemTime::now(),
                channel: self.channel.clone(),
                digest,
                epoch: self.epoch,
            }));
        }
    }

    /// Encode and publish `message`. Returns whether it was handed to the relay.
    fn publish(&mut self, message: &SyncMessage) -> bool {
        match message.encode() {
            Ok(raw) => {
                self.relay.publish(&self.topic, raw);
                true
            }
            Err(err) => {
                log::warn!("Failed to encode message: {}", err);
                false
            }
        }
    }

    fn publish_status_change(&self, status_change: Option<StatusChange>) {
        if let Some((from, to)) = status_change {
            self.publish_event(Event::UpdateStatus(UpdateStatusEvent {
                timestamp: SystemTime::now(),
                from,
                to,
            }));
        }
    }

    fn publish_event(&self, event: Event) {
        Event::publish(&self.event_publisher, event)
    }
}

fn posted(stream: EntryStream, id: String) -> Event {
    Event::PostEntry(PostEntryEvent {
        timestamp: SystemTime::now(),
        stream,
        id,
    })
}

fn deleted(stream: EntryStream, id: String) -> Event {
    Event::DeleteEntry(DeleteEntryEvent {
        timestamp: SystemTime::now(),
        stream,
        id,
    })
}
