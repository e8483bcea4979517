/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use std::{
    sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError},
    thread::{self, JoinHandle},
    time::Duration,
};

use crate::{events::*, logging::Logger};

pub(crate) type HandlerPtr<T> = Box<dyn Fn(&T) + Send>;

/// How long the event bus waits for an event before checking its shutdown signal again.
const EVENT_WAIT: Duration = Duration::from_millis(10);

/// The handlers registered for each kind of event. If `log_events` was set, the default logger of
/// each event kind is registered ahead of the user's handler.
pub(crate) struct EventHandlers {
    pub(crate) post_entry_handlers: Vec<HandlerPtr<PostEntryEvent>>,
    pub(crate) delete_entry_handlers: Vec<HandlerPtr<DeleteEntryEvent>>,
    pub(crate) end_day_handlers: Vec<HandlerPtr<EndDayEvent>>,
    pub(crate) replace_ledger_handlers: Vec<HandlerPtr<ReplaceLedgerEvent>>,
    pub(crate) reject_mutation_handlers: Vec<HandlerPtr<RejectMutationEvent>>,
    pub(crate) publish_snapshot_handlers: Vec<HandlerPtr<PublishSnapshotEvent>>,
    pub(crate) publish_heartbeat_handlers: Vec<HandlerPtr<PublishHeartbeatEvent>>,
    pub(crate) receive_message_handlers: Vec<HandlerPtr<ReceiveMessageEvent>>,
    pub(crate) drop_message_handlers: Vec<HandlerPtr<DropMessageEvent>>,
    pub(crate) update_status_handlers: Vec<HandlerPtr<UpdateStatusEvent>>,
    pub(crate) switch_channel_handlers: Vec<HandlerPtr<SwitchChannelEvent>>,
    pub(crate) switch_role_handlers: Vec<HandlerPtr<SwitchRoleEvent>>,
    pub(crate) update_rates_handlers: Vec<HandlerPtr<UpdateRatesEvent>>,
}

/// Put the default logger (if enabled) and the user's handler (if any) into one handler list.
fn handlers<T: Logger>(log_events: bool, user_handler: Option<HandlerPtr<T>>) -> Vec<HandlerPtr<T>> {
    let logger = log_events.then(T::get_logger);
    logger.into_iter().chain(user_handler).collect()
}

impl EventHandlers {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        log_events: bool,
        post_entry_handler: Option<HandlerPtr<PostEntryEvent>>,
        delete_entry_handler: Option<HandlerPtr<DeleteEntryEvent>>,
        end_day_handler: Option<HandlerPtr<EndDayEvent>>,
        replace_ledger_handler: Option<HandlerPtr<ReplaceLedgerEvent>>,
        reject_mutation_handler: Option<HandlerPtr<RejectMutationEvent>>,
        publish_snapshot_handler: Option<HandlerPtr<PublishSnapshotEvent>>,
        publish_heartbeat_handler: Option<HandlerPtr<PublishHeartbeatEvent>>,
        receive_message_handler: Option<HandlerPtr<ReceiveMessageEvent>>,
        drop_message_handler: Option<HandlerPtr<DropMessageEvent>>,
        update_status_handler: Option<HandlerPtr<UpdateStatusEvent>>,
        switch_channel_handler: Option<HandlerPtr<SwitchChannelEvent>>,
        switch_role_handler: Option<HandlerPtr<SwitchRoleEvent>>,
        update_rates_handler: Option<HandlerPtr<UpdateRatesEvent>>,
    ) -> EventHandlers {
        EventHandlers {
            post_entry_handlers: handlers(log_events, post_entry_handler),
            delete_entry_handlers: handlers(log_events, delete_entry_handler),
            end_day_handlers: handlers(log_events, end_day_handler),
            replace_ledger_handlers: handlers(log_events, replace_ledger_handler),
            reject_mutation_handlers: handlers(log_events, reject_mutation_handler),
            publish_snapshot_handlers: handlers(log_events, publish_snapshot_handler),
            publish_heartbeat_handlers: handlers(log_events, publish_heartbeat_handler),
            receive_message_handlers: handlers(log_events, receive_message_handler),
            drop_message_handlers: handlers(log_events, drop_message_handler),
            update_status_handlers: handlers(log_events, update_status_handler),
            switch_channel_handlers: handlers(log_events, switch_channel_handler),
            switch_role_handlers: handlers(log_events, switch_role_handler),
            update_rates_handlers: handlers(log_events, update_rates_handler),
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.post_entry_handlers.is_empty()
            && self.delete_entry_handlers.is_empty()
            && self.end_day_handlers.is_empty()
            && self.replace_ledger_handlers.is_empty()
            && self.reject_mutation_handlers.is_empty()
            && self.publish_snapshot_handlers.is_empty()
            && self.publish_heartbeat_handlers.is_empty()
            && self.receive_message_handlers.is_empty()
            && self.drop_message_handlers.is_empty()
            && self.update_status_handlers.is_empty()
            && self.switch_channel_handlers.is_empty()
            && self.switch_role_handlers.is_empty()
            && self.update_rates_handlers.is_empty()
    }

    pub(crate) fn fire_handlers(&self, event: Event) {
        match event {
            Event::PostEntry(post_entry_event) =>
                self.post_entry_handlers.iter().for_each(|handler| handler(&post_entry_event)),

            Event::DeleteEntry(delete_entry_event) =>
                self.delete_entry_handlers.iter().for_each(|handler| handler(&delete_entry_event)),

            Event::EndDay(end_day_event) =>
                self.end_day_handlers.iter().for_each(|handler| handler(&end_day_event)),

            Event::ReplaceLedger(replace_ledger_event) =>
                self.replace_ledger_handlers.iter().for_each(|handler| handler(&replace_ledger_event)),

            Event::RejectMutation(reject_mutation_event) =>
                self.reject_mutation_handlers.iter().for_each(|handler| handler(&reject_mutation_event)),

            Event::PublishSnapshot(publish_snapshot_event) =>
                self.publish_snapshot_handlers.iter().for_each(|handler| handler(&publish_snapshot_event)),

            Event::PublishHeartbeat(publish_heartbeat_event) =>
                self.publish_heartbeat_handlers.iter().for_each(|handler| handler(&publish_heartbeat_event)),

            Event::ReceiveMessage(receive_message_event) =>
                self.receive_message_handlers.iter().for_each(|handler| handler(&receive_message_event)),

            Event::DropMessage(drop_message_event) =>
                self.drop_message_handlers.iter().for_each(|handler| handler(&drop_message_event)),

            Event::UpdateStatus(update_status_event) =>
                self.update_status_handlers.iter().for_each(|handler| handler(&update_status_event)),

            Event::SwitchChannel(switch_channel_event) =>
                self.switch_channel_handlers.iter().for_each(|handler| handler(&switch_channel_event)),

            Event::SwitchRole(switch_role_event) =>
                self.switch_role_handlers.iter().for_each(|handler| handler(&switch_role_event)),

            Event::UpdateRates(update_rates_event) =>
                self.update_rates_handlers.iter().for_each(|handler| handler(&update_rates_event)),
        }
    }
}

/// Spawn the event bus thread, which fires the registered handlers for every event received from
/// `event_subscriber` until it is told to shut down.
pub(crate) fn start_event_bus(
    event_handlers: EventHandlers,
    event_subscriber: Receiver<Event>,
    shutdown_signal: Receiver<()>,
) -> JoinHandle<()> {
    thread::spawn(move || loop {
        match shutdown_signal.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => return,
            Err(TryRecvError::Empty) => (),
        }

        match event_subscriber.recv_timeout(EVENT_WAIT) {
            Ok(event) => event_handlers.fire_handlers(event),
            Err(RecvTimeoutError::Timeout) => (),
            // All publishers are gone; wait for the shutdown signal.
            Err(RecvTimeoutError::Disconnected) => thread::sleep(EVENT_WAIT),
        }
    })
}
