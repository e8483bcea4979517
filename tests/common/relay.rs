use std::{
    collections::{HashMap, HashSet},
    sync::{
        mpsc::{self, Receiver, Sender, TryRecvError},
        Arc, Mutex,
    },
};

use cashledger_rs::{
    networking::{Relay, RelayError},
    types::basic::Topic,
};

/// A mock relay stub which passes messages from and to threads using channels. Like a real
/// publish/subscribe relay, a message published to a topic reaches every subscriber of that topic,
/// including the publisher itself.
#[derive(Clone)]
pub(crate) struct RelayStub {
    me: usize,
    hub: Arc<Mutex<Hub>>,
    inbox: Arc<Mutex<Receiver<(Topic, String)>>>,
}

struct Hub {
    inboxes: HashMap<usize, Sender<(Topic, String)>>,
    subscribers: HashMap<Topic, HashSet<usize>>,
    reachable: bool,
}

impl Hub {
    fn deliver(&self, topic: &Topic, message: &str) {
        if !self.reachable {
            return;
        }
        for peer in self.subscribers.get(topic).into_iter().flatten() {
            if let Some(inbox) = self.inboxes.get(peer) {
                let _ = inbox.send((topic.clone(), message.to_string()));
            }
        }
    }
}

impl RelayStub {
    /// Make the relay refuse subscriptions and silently drop messages, or serve them again.
    pub(crate) fn set_reachable(&self, reachable: bool) {
        self.hub.lock().unwrap().reachable = reachable;
    }

    /// Deliver `message` to every subscriber of `topic` as if some other device had published it.
    pub(crate) fn inject(&self, topic: &Topic, message: &str) {
        self.hub.lock().unwrap().deliver(topic, message);
    }

    pub(crate) fn subscriber_count(&self, topic: &Topic) -> usize {
        self.hub
            .lock()
            .unwrap()
            .subscribers
            .get(topic)
            .map_or(0, HashSet::len)
    }
}

impl Relay for RelayStub {
    fn subscribe(&mut self, topic: &Topic) -> Result<(), RelayError> {
        let mut hub = self.hub.lock().unwrap();
        if !hub.reachable {
            return Err(RelayError::Unreachable("relay stub is down".to_string()));
        }
        hub.subscribers.entry(topic.clone()).or_default().insert(self.me);
        Ok(())
    }

    fn unsubscribe(&mut self, topic: &Topic) {
        let mut hub = self.hub.lock().unwrap();
        if let Some(subscribers) = hub.subscribers.get_mut(topic) {
            subscribers.remove(&self.me);
        }
    }

    fn publish(&mut self, topic: &Topic, message: String) {
        self.hub.lock().unwrap().deliver(topic, &message);
    }

    fn recv(&mut self) -> Option<(Topic, String)> {
        match self.inbox.lock().unwrap().try_recv() {
            Ok(message) => Some(message),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }
}

/// Create `peers` relay stubs connected to the same hub.
pub(crate) fn mock_relay(peers: usize) -> Vec<RelayStub> {
    let hub = Arc::new(Mutex::new(Hub {
        inboxes: HashMap::new(),
        subscribers: HashMap::new(),
        reachable: true,
    }));

    (0..peers)
        .map(|me| {
            let (sender, receiver) = mpsc::channel();
            hub.lock().unwrap().inboxes.insert(me, sender);
            RelayStub {
                me,
                hub: hub.clone(),
                inbox: Arc::new(Mutex::new(receiver)),
            }
        })
        .collect()
}
