use std::sync::{Arc, Mutex};

use cashledger_rs::{sync_engine::Confirm, types::basic::Amount};

/// A [`Confirm`] that gives a fixed answer and records the balance shown in every prompt.
#[derive(Clone)]
pub(crate) struct RecordingConfirm {
    answer: bool,
    prompts: Arc<Mutex<Vec<Amount>>>,
}

impl RecordingConfirm {
    pub(crate) fn new(answer: bool) -> Self {
        RecordingConfirm {
            answer,
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn prompts(&self) -> Vec<Amount> {
        self.prompts.lock().unwrap().clone()
    }
}

impl Confirm for RecordingConfirm {
    fn confirm_end_day(&mut self, drawer_balance: Amount) -> bool {
        self.prompts.lock().unwrap().push(drawer_balance);
        self.answer
    }
}
