/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Entries of the two transaction streams.
//!
//! Entries are immutable once posted. They can only be deleted individually, or cleared all at once
//! when the day ends. The serialized field names are part of the persisted snapshot and wire format,
//! and must not change without also changing the storage key.

use serde::{Deserialize, Serialize};

use super::basic::Amount;

/// How a main-ledger entry was paid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    PayPal,
}

impl PaymentMethod {
    /// The `(is_card, is_paypal)` flag pair that encodes this method on a [`MainEntry`].
    pub const fn flags(&self) -> (bool, bool) {
        match self {
            PaymentMethod::Cash => (false, false),
            PaymentMethod::Card => (true, false),
            PaymentMethod::PayPal => (false, true),
        }
    }
}

/// A transaction taken by an external ("out-party") point of sale, split across the three payment
/// methods.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OutPartyEntry {
    pub id: String,
    #[serde(rename = "date")]
    pub timestamp: String,
    pub cash: Amount,
    pub card: Amount,
    pub paypal: Amount,
}

/// A row of the on-site ("main") ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MainEntry {
    pub id: String,
    #[serde(rename = "date")]
    pub timestamp: String,
    pub is_card: bool,
    #[serde(rename = "isPayPal")]
    pub is_paypal: bool,
    #[serde(rename = "roomNo")]
    pub room_number: String,
    pub description: String,
    pub cash_in: Amount,
    pub cash_out: Amount,
}

impl MainEntry {
    /// Decode the payment flags. Both flags false means cash; if both are set, card takes precedence.
    pub fn payment_method(&self) -> PaymentMethod {
        match (self.is_card, self.is_paypal) {
            (true, _) => PaymentMethod::Card,
            (false, true) => PaymentMethod::PayPal,
            (false, false) => PaymentMethod::Cash,
        }
    }

    /// Whether the revenue of this entry bypasses the physical cash drawer.
    pub fn is_non_cash(&self) -> bool {
        self.is_card || self.is_paypal
    }
}
