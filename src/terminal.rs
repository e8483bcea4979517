/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Methods to build, run, and use a ledger terminal.
//!
//! A terminal is one device taking part in a channel: either the editor that records transactions, or
//! a viewer that mirrors them.
//!
//! ## Starting a terminal
//!
//! To start a terminal, first specify it with [`TerminalSpec`], then call [`start`](TerminalSpec::start):
//!
//! ```ignore
//! let terminal =
//!     TerminalSpec::builder()
//!     .relay(relay)
//!     .kv_store(kv_store)
//!     .rate_provider(FixedRates::default())
//!     .confirmer(FixedAnswer(true))
//!     .configuration(configuration)
//!     .role_hint(RoleHint::editor())
//!     .channel_query(Some("pool-bar".to_string()))
//!     .on_end_day(end_day_handler)
//!     .build()
//!     .start()
//! ```
//!
//! The role is resolved from the [`RoleHint`] (see [`resolve_role`]), and the channel key from the
//! channel query, the last key used on this device, or [`DEFAULT_CHANNEL_KEY`](crate::types::basic::DEFAULT_CHANNEL_KEY),
//! in that order.
//!
//! ## Using a terminal
//!
//! Commands are synchronous: each returns once the driver thread has applied, saved, and published the
//! change. The [`LedgerCamera`] gives read-only access to the ledger, its totals, and the connectivity
//! status.
//!
//! ## Stopping a terminal
//!
//! Dropping the [`Terminal`] shuts down its background threads in order: first the event bus, then the
//! driver (which tears down its subscription), then the rate poller.

use std::{
    sync::{
        mpsc::{self, Sender},
        Mutex,
    },
    thread::JoinHandle,
};

use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    camera::LedgerCamera,
    config::Configuration,
    driver::{Command, Driver, Input},
    event_bus::*,
    events::*,
    ledger::form::{display_time_now, EntryIdGenerator, MainForm, OutPartyForm},
    networking::Relay,
    persistence::{KVStore, SnapshotStore},
    rates::{start_rate_poller, RateProvider},
    roles::{resolve_channel_key, resolve_role, Role, RoleHint},
    sync_engine::{Confirm, Mutation, MutationOutcome, SyncEngine},
    types::{
        basic::ChannelKey,
        entries::{MainEntry, OutPartyEntry},
    },
};

/// Stores the user-defined parameters required to start a terminal, that is, the "specification" of
/// the terminal.
#[derive(TypedBuilder)]
pub struct TerminalSpec<K: KVStore, R: Relay + 'static, P: RateProvider + 'static, C: Confirm + 'static> {
    // Required parameters
    #[builder(setter(doc = "Set the relay that snapshots are published to and received from. Required."))]
    relay: R,
    #[builder(setter(doc = "Set the key-value store that the ledger is persisted in. Required."))]
    kv_store: K,
    #[builder(setter(doc = "Set the source of exchange rates. Required."))]
    rate_provider: P,
    #[builder(setter(doc = "Set how the user is asked to confirm the end of day. Required."))]
    confirmer: C,

    // Optional parameters
    #[builder(default, setter(doc = "Set the configuration. Optional; defaults to [Configuration::default]."))]
    configuration: Configuration,
    #[builder(default, setter(doc = "Set the hint that the terminal's role is resolved from. Optional; without one the terminal is an editor."))]
    role_hint: RoleHint,
    #[builder(default, setter(doc = "Set the channel key requested on launch, as typed in a link or query. Optional."))]
    channel_query: Option<String>,

    // Event handlers
    #[builder(default, setter(transform = |handler: impl Fn(&PostEntryEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PostEntryEvent>),
    doc = "Register a handler closure to be invoked after an entry is posted. Optional."))]
    on_post_entry: Option<HandlerPtr<PostEntryEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DeleteEntryEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DeleteEntryEvent>),
    doc = "Register a handler closure to be invoked after an entry is deleted. Optional."))]
    on_delete_entry: Option<HandlerPtr<DeleteEntryEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&EndDayEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<EndDayEvent>),
    doc = "Register a handler closure to be invoked after the day is closed. Optional."))]
    on_end_day: Option<HandlerPtr<EndDayEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReplaceLedgerEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReplaceLedgerEvent>),
    doc = "Register a handler closure to be invoked after the ledger is replaced by a received snapshot. Optional."))]
    on_replace_ledger: Option<HandlerPtr<ReplaceLedgerEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&RejectMutationEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<RejectMutationEvent>),
    doc = "Register a handler closure to be invoked after a viewer ignores a mutation. Optional."))]
    on_reject_mutation: Option<HandlerPtr<RejectMutationEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PublishSnapshotEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PublishSnapshotEvent>),
    doc = "Register a handler closure to be invoked after the editor publishes a snapshot. Optional."))]
    on_publish_snapshot: Option<HandlerPtr<PublishSnapshotEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&PublishHeartbeatEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<PublishHeartbeatEvent>),
    doc = "Register a handler closure to be invoked after the editor publishes a heartbeat. Optional."))]
    on_publish_heartbeat: Option<HandlerPtr<PublishHeartbeatEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&ReceiveMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<ReceiveMessageEvent>),
    doc = "Register a handler closure to be invoked after a well-formed message is received. Optional."))]
    on_receive_message: Option<HandlerPtr<ReceiveMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&DropMessageEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<DropMessageEvent>),
    doc = "Register a handler closure to be invoked after a received message is dropped. Optional."))]
    on_drop_message: Option<HandlerPtr<DropMessageEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateStatusEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateStatusEvent>),
    doc = "Register a handler closure to be invoked after the connectivity status changes. Optional."))]
    on_update_status: Option<HandlerPtr<UpdateStatusEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SwitchChannelEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SwitchChannelEvent>),
    doc = "Register a handler closure to be invoked after the terminal moves to another channel. Optional."))]
    on_switch_channel: Option<HandlerPtr<SwitchChannelEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&SwitchRoleEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<SwitchRoleEvent>),
    doc = "Register a handler closure to be invoked after the terminal's role changes. Optional."))]
    on_switch_role: Option<HandlerPtr<SwitchRoleEvent>>,
    #[builder(default, setter(transform = |handler: impl Fn(&UpdateRatesEvent) + Send + 'static| Some(Box::new(handler) as HandlerPtr<UpdateRatesEvent>),
    doc = "Register a handler closure to be invoked after exchange rates are fetched. Optional."))]
    on_update_rates: Option<HandlerPtr<UpdateRatesEvent>>,
}

impl<K: KVStore, R: Relay + 'static, P: RateProvider + 'static, C: Confirm + 'static>
    TerminalSpec<K, R, P, C>
{
    /// Starts all threads and channels associated with running a terminal, and returns the handles to
    /// them in a [`Terminal`] struct.
    pub fn start(self) -> Terminal {
        let configuration = self.configuration;

        let last_used = SnapshotStore::new(
            self.kv_store.clone(),
            &configuration.snapshot_slot,
            &configuration.channel_key_slot,
        )
        .load_channel_key();
        let channel = resolve_channel_key(self.channel_query.as_deref(), last_used);
        let role = resolve_role(&self.role_hint, configuration.narrow_viewport_width);

        let event_handlers = EventHandlers::new(
            configuration.log_events,
            self.on_post_entry,
            self.on_delete_entry,
            self.on_end_day,
            self.on_replace_ledger,
            self.on_reject_mutation,
            self.on_publish_snapshot,
            self.on_publish_heartbeat,
            self.on_receive_message,
            self.on_drop_message,
            self.on_update_status,
            self.on_switch_channel,
            self.on_switch_role,
            self.on_update_rates,
        );

        let (event_publisher, event_subscriber) = if !event_handlers.is_empty() {
            Some(mpsc::channel()).unzip()
        } else {
            (None, None)
        };

        let mut engine = SyncEngine::new(
            &configuration,
            self.kv_store,
            self.relay,
            self.confirmer,
            role,
            channel.clone(),
            event_publisher,
        );
        engine.remember_channel();
        let camera = LedgerCamera::new(engine.state().clone(), role, channel);
        let id_generator = EntryIdGenerator::resuming(engine.state());

        let (input_sender, input_receiver) = mpsc::channel();

        let (rate_poller_shutdown, rate_poller_shutdown_receiver) = mpsc::channel();
        let rate_poller = start_rate_poller(
            self.rate_provider,
            configuration.rate_poll_interval,
            input_sender.clone(),
            rate_poller_shutdown_receiver,
        );

        let (driver_shutdown, driver_shutdown_receiver) = mpsc::channel();
        let driver = Driver::new(
            &configuration,
            engine,
            input_receiver,
            input_sender.clone(),
            camera.clone(),
            driver_shutdown_receiver,
        )
        .start();

        let (event_bus_shutdown, event_bus) = match event_subscriber {
            Some(event_subscriber) => {
                let (event_bus_shutdown, event_bus_shutdown_receiver) = mpsc::channel();
                let event_bus = start_event_bus(
                    event_handlers,
                    event_subscriber,
                    event_bus_shutdown_receiver,
                );
                (Some(event_bus_shutdown), Some(event_bus))
            }
            None => (None, None),
        };

        Terminal {
            camera,
            input: input_sender,
            id_generator: Mutex::new(id_generator),
            driver: Some(driver),
            driver_shutdown,
            rate_poller: Some(rate_poller),
            rate_poller_shutdown,
            event_bus,
            event_bus_shutdown,
        }
    }
}

/// A handle to the background threads of a ledger terminal. When this value is dropped, all
/// background threads are gracefully shut down.
pub struct Terminal {
    camera: LedgerCamera,
    input: Sender<Input>,
    id_generator: Mutex<EntryIdGenerator>,
    driver: Option<JoinHandle<()>>,
    driver_shutdown: Sender<()>,
    rate_poller: Option<JoinHandle<()>>,
    rate_poller_shutdown: Sender<()>,
    event_bus: Option<JoinHandle<()>>,
    event_bus_shutdown: Option<Sender<()>>,
}

/// Error when a command cannot reach the driver thread.
#[derive(Debug, Error)]
pub enum TerminalError {
    #[error("the driver thread has stopped")]
    Stopped,
}

impl Terminal {
    /// Returns a [`LedgerCamera`] which can be used to peek into the terminal's ledger.
    pub fn camera(&self) -> &LedgerCamera {
        &self.camera
    }

    pub fn add_out_party(&self, entry: OutPartyEntry) -> Result<MutationOutcome, TerminalError> {
        self.mutate(Mutation::AddOutParty(entry))
    }

    pub fn add_main(&self, entry: MainEntry) -> Result<MutationOutcome, TerminalError> {
        self.mutate(Mutation::AddMain(entry))
    }

    pub fn delete_out_party(&self, id: &str) -> Result<MutationOutcome, TerminalError> {
        self.mutate(Mutation::DeleteOutParty(id.to_string()))
    }

    pub fn delete_main(&self, id: &str) -> Result<MutationOutcome, TerminalError> {
        self.mutate(Mutation::DeleteMain(id.to_string()))
    }

    /// Close the day, carrying the drawer balance forward. The terminal's [`Confirm`] is asked first.
    pub fn end_day(&self) -> Result<MutationOutcome, TerminalError> {
        self.mutate(Mutation::EndDay)
    }

    /// Build an entry from the out-party form, stamped with a fresh id and the current time, and post
    /// it. Returns `Ok(None)` if the form is empty.
    pub fn post_out_party_form(
        &self,
        form: &OutPartyForm,
    ) -> Result<Option<MutationOutcome>, TerminalError> {
        match form.build(self.next_id(), display_time_now()) {
            Some(entry) => self.add_out_party(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Build an entry from the main form, stamped with a fresh id and the current time, and post it.
    /// Returns `Ok(None)` if the form is empty.
    pub fn post_main_form(&self, form: &MainForm) -> Result<Option<MutationOutcome>, TerminalError> {
        match form.build(self.next_id(), display_time_now()) {
            Some(entry) => self.add_main(entry).map(Some),
            None => Ok(None),
        }
    }

    /// Move the terminal to another channel. Returns once the old subscription is torn down and the
    /// new one has been attempted.
    pub fn switch_channel(&self, channel: ChannelKey) -> Result<(), TerminalError> {
        let (reply, receiver) = mpsc::channel();
        self.send(Command::SwitchChannel(channel, reply))?;
        receiver.recv().map_err(|_| TerminalError::Stopped)
    }

    /// Change the terminal's role, e.g. after the user picks another device view.
    pub fn set_role(&self, role: Role) -> Result<(), TerminalError> {
        let (reply, receiver) = mpsc::channel();
        self.send(Command::SetRole(role, reply))?;
        receiver.recv().map_err(|_| TerminalError::Stopped)
    }

    fn mutate(&self, mutation: Mutation) -> Result<MutationOutcome, TerminalError> {
        let (reply, receiver) = mpsc::channel();
        self.send(Command::Mutate(mutation, reply))?;
        receiver.recv().map_err(|_| TerminalError::Stopped)
    }

    fn send(&self, command: Command) -> Result<(), TerminalError> {
        self.input
            .send(Input::Command(command))
            .map_err(|_| TerminalError::Stopped)
    }

    fn next_id(&self) -> String {
        match self.id_generator.lock() {
            Ok(mut generator) => generator.next_id(),
            Err(poisoned) => poisoned.into_inner().next_id(),
        }
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        // The driver and the rate poller both exit on their own if their shutdown sender is gone, so
        // failed sends are ignored. A thread that panicked is reported, not propagated.

        self.event_bus_shutdown
            .iter()
            .for_each(|shutdown| drop(shutdown.send(())));
        if let Some(event_bus) = self.event_bus.take() {
            if event_bus.join().is_err() {
                log::error!("Event bus thread panicked");
            }
        }

        let _ = self.driver_shutdown.send(());
        if let Some(driver) = self.driver.take() {
            if driver.join().is_err() {
                log::error!("Driver thread panicked");
            }
        }

        let _ = self.rate_poller_shutdown.send(());
        if let Some(rate_poller) = self.rate_poller.take() {
            if rate_poller.join().is_err() {
                log::error!("Rate poller thread panicked");
            }
        }
    }
}
