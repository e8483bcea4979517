/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Functions and types for receiving messages from the relay.

use std::{
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::types::basic::Topic;

use super::relay::{Relay, RelayError};

/// How long the poller sleeps when the relay has nothing to deliver.
const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(1);

/// A raw message as it came off the relay.
#[derive(Clone, Debug)]
pub(crate) struct Inbound {
    pub(crate) topic: Topic,
    pub(crate) raw: String,
    pub(crate) received_at: Instant,
}

/// A live subscription to one topic of the relay.
///
/// Opening a subscription registers it with the relay and spawns a poller thread that forwards every
/// received message into the owner's inbox. Dropping the subscription stops and joins the poller, and
/// only then unsubscribes, so at most one poller per terminal is ever registered with the relay.
pub(crate) struct Subscription<R: Relay + 'static> {
    relay: R,
    topic: Topic,
    poller: Option<JoinHandle<()>>,
    poller_shutdown: Sender<()>,
}

impl<R: Relay + 'static> Subscription<R> {
    pub(crate) fn open<I: From<Inbound> + Send + 'static>(
        mut relay: R,
        topic: Topic,
        inbox: Sender<I>,
    ) -> Result<Subscription<R>, RelayError> {
        relay.subscribe(&topic)?;

        let (poller_shutdown, poller_shutdown_receiver) = mpsc::channel();
        let poller = start_polling(relay.clone(), inbox, poller_shutdown_receiver);

        Ok(Subscription {
            relay,
            topic,
            poller: Some(poller),
            poller_shutdown,
        })
    }

    pub(crate) fn topic(&self) -> &Topic {
        &self.topic
    }
}

impl<R: Relay + 'static> Drop for Subscription<R> {
    fn drop(&mut self) {
        // The poller may already have exited because the inbox was dropped, so a failed send is fine.
        let _ = self.poller_shutdown.send(());
        if let Some(poller) = self.poller.take() {
            if poller.join().is_err() {
                log::error!("Poller thread for {} panicked", self.topic);
            }
        }
        self.relay.unsubscribe(&self.topic);
    }
}

/// Spawn the poller thread, which polls the [`Relay`] for messages and forwards them into `inbox`
/// until it is told to shut down or the inbox is dropped.
fn start_polling<R: Relay + 'static, I: From<Inbound> + Send + 'static>(
    mut relay: R,
    inbox: Sender<I>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        if let Some((topic, raw)) = relay.recv() {
            let inbound = Inbound {
                topic,
                raw,
                received_at: Instant::now(),
            };
            if inbox.send(inbound.into()).is_err() {
                return;
            }
        } else {
            thread::sleep(IDLE_POLL_INTERVAL)
        }
    })
}
