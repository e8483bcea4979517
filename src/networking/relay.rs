/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

use thiserror::Error;

use crate::types::basic::Topic;

/// A best-effort, topic-based broadcast primitive.
///
/// Implementations must deliver every message published on a topic to every current subscriber of
/// that topic (the publisher included, if subscribed), but need not guarantee delivery, ordering or
/// uniqueness.
pub trait Relay: Clone + Send {
    /// Start receiving messages published on `topic`.
    fn subscribe(&mut self, topic: &Topic) -> Result<(), RelayError>;

    /// Stop receiving messages published on `topic`. Unsubscribing from a topic that is not subscribed
    /// is a no-op.
    fn unsubscribe(&mut self, topic: &Topic);

    /// Publish `message` to `topic` without blocking. Fire and forget.
    fn publish(&mut self, topic: &Topic, message: String);

    /// Receive a message from any subscribed topic. Returns immediately with a None if no message is
    /// available now.
    fn recv(&mut self) -> Option<(Topic, String)>;
}

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("relay is unreachable: {0}")]
    Unreachable(String),

    #[error("subscription to {0} was refused")]
    Refused(String),
}
