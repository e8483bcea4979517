/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! The driver thread: the event loop of a ledger terminal.
//!
//! All three kinds of trigger reach the [`SyncEngine`] through one inbox, so they are processed one at
//! a time, in arrival order:
//! 1. [Commands](Command) from the [`Terminal`](crate::terminal::Terminal) handle. Each carries a reply
//!    channel, so the caller can wait for the outcome.
//! 2. [Inbound messages](Inbound) forwarded by the poller thread of the current [`Subscription`].
//! 3. [Exchange rates](ExchangeRates) forwarded by the rate poller thread.
//!
//! Timers are deadlines. The driver waits on the inbox until the earliest one, then fires every timer
//! that is due:
//! * Heartbeat: the engine publishes a heartbeat if it is the editor.
//! * Watchdog: if the last subscription attempt failed, it is retried. Then the engine checks whether
//!   the channel has gone stale.
//!
//! After every trigger the driver refreshes the [`LedgerCamera`]. A command is answered only once the
//! camera reflects it.
//!
//! The driver owns the [`Subscription`]. Switching channels drops the old subscription, which joins
//! its poller and unsubscribes, before the new one is opened.

use std::{
    cmp::min,
    sync::mpsc::{Receiver, RecvTimeoutError, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    camera::LedgerCamera,
    config::Configuration,
    networking::{receiving::Inbound, Relay, Subscription},
    persistence::KVStore,
    rates::ExchangeRates,
    roles::Role,
    sync_engine::{Confirm, Mutation, MutationOutcome, SyncEngine},
    types::basic::ChannelKey,
};

/// Longest time the driver waits on its inbox before checking its shutdown signal again.
const SHUTDOWN_CHECK_INTERVAL: Duration = Duration::from_millis(50);

/// A request from the [`Terminal`](crate::terminal::Terminal) handle.
pub(crate) enum Command {
    Mutate(Mutation, Sender<MutationOutcome>),
    SwitchChannel(ChannelKey, Sender<()>),
    SetRole(Role, Sender<()>),
}

/// Everything the driver thread receives through its inbox.
pub(crate) enum Input {
    Command(Command),
    Inbound(Inbound),
    Rates(ExchangeRates),
}

impl From<Inbound> for Input {
    fn from(inbound: Inbound) -> Self {
        Input::Inbound(inbound)
    }
}

impl From<ExchangeRates> for Input {
    fn from(rates: ExchangeRates) -> Self {
        Input::Rates(rates)
    }
}

pub(crate) struct Driver<K: KVStore, R: Relay + 'static, C: Confirm + 'static> {
    engine: SyncEngine<K, R, C>,
    subscription: Option<Subscription<R>>,
    inbox: Receiver<Input>,
    inbox_sender: Sender<Input>,
    camera: LedgerCamera,
    heartbeat_interval: Duration,
    watchdog_interval: Duration,
    shutdown_signal: Receiver<()>,
}

impl<K: KVStore, R: Relay + 'static, C: Confirm + 'static> Driver<K, R, C> {
    pub(crate) fn new(
        configuration: &Configuration,
        engine: SyncEngine<K, R, C>,
        inbox: Receiver<Input>,
        inbox_sender: Sender<Input>,
        camera: LedgerCamera,
        shutdown_signal: Receiver<()>,
    ) -> Self {
        Self {
            engine,
            subscription: None,
            inbox,
            inbox_sender,
            camera,
            heartbeat_interval: configuration.heartbeat_interval,
            watchdog_interval: configuration.watchdog_interval,
            shutdown_signal,
        }
    }

    pub(crate) fn start(mut self) -> JoinHandle<()> {
        thread::spawn(move || {
            self.subscribe();
            self.camera.update(&self.engine);

            let now = Instant::now();
            let mut next_heartbeat = now + self.heartbeat_interval;
            let mut next_watchdog = now + self.watchdog_interval;

            loop {
                match self.shutdown_signal.try_recv() {
                    Ok(()) | Err(TryRecvError::Disconnected) => {
                        // Joins the poller and unsubscribes.
                        self.subscription = None;
                        return;
                    }
                    Err(TryRecvError::Empty) => (),
                }

                let now = Instant::now();
                let deadline = min(
                    min(next_heartbeat, next_watchdog),
                    now + SHUTDOWN_CHECK_INTERVAL,
                );
                match self.inbox.recv_timeout(deadline.saturating_duration_since(now)) {
                    Ok(input) => self.on_input(input),
                    Err(RecvTimeoutError::Timeout) => (),
                    // Unreachable while the driver holds its own inbox sender.
                    Err(RecvTimeoutError::Disconnected) => return,
                }

                let now = Instant::now();
                if now >= next_heartbeat {
                    self.engine.on_heartbeat_due();
                    next_heartbeat = now + self.heartbeat_interval;
                }
                if now >= next_watchdog {
                    if self.subscription.is_none() {
                        self.subscribe();
                    }
                    self.engine.on_watchdog_tick(now);
                    next_watchdog = now + self.watchdog_interval;
                }

                self.camera.update(&self.engine);
            }
        })
    }

    /// Commands are answered only after the camera shows their effect. Failed replies are ignored, as
    /// the caller may have stopped waiting.
    fn on_input(&mut self, input: Input) {
        match input {
            Input::Command(Command::Mutate(mutation, reply)) => {
                let outcome = self.engine.apply(mutation);
                self.camera.update(&self.engine);
                let _ = reply.send(outcome);
            }
            Input::Command(Command::SwitchChannel(channel, reply)) => {
                if &channel != self.engine.channel() {
                    self.subscription = None;
                    self.engine.switch_channel(channel);
                    self.subscribe();
                }
                self.camera.update(&self.engine);
                let _ = reply.send(());
            }
            Input::Command(Command::SetRole(role, reply)) => {
                self.engine.set_role(role);
                self.camera.update(&self.engine);
                let _ = reply.send(());
            }
            Input::Inbound(inbound) => {
                self.engine
                    .on_message(&inbound.topic, &inbound.raw, inbound.received_at);
            }
            Input::Rates(rates) => self.engine.on_rates(rates),
        }
    }

    /// Open a subscription to the engine's current topic. On failure the terminal stays offline until
    /// the next watchdog tick retries.
    fn subscribe(&mut self) {
        let topic = self.engine.topic().clone();
        match Subscription::open(self.engine.relay().clone(), topic, self.inbox_sender.clone()) {
            Ok(subscription) => {
                log::debug!("Subscribed to {}", subscription.topic());
                self.subscription = Some(subscription);
                self.engine.on_subscribed();
            }
            Err(err) => {
                log::warn!("Failed to subscribe to {}: {}", self.engine.topic(), err);
                self.engine.on_unsubscribed();
            }
        }
    }
}
