/*
    Copyright © 2023, ParallelChain Lab
    Licensed under the Apache License, Version 2.0: http://www.apache.org/licenses/LICENSE-2.0
*/

//! Construction of entries from raw form input.
//!
//! Forms hold exactly what the user typed. Amounts are coerced when the entry is built: missing,
//! non-numeric, non-finite and negative input all become zero, and are never rejected.

use std::time::SystemTime;

use chrono::Local;

use crate::types::{
    basic::{millis_since_unix_epoch, Amount},
    entries::{MainEntry, OutPartyEntry, PaymentMethod},
    ledger_state::LedgerState,
};

/// Parse a typed amount, coercing anything that is not a finite, non-negative number to zero.
pub fn coerce_amount(raw: &str) -> Amount {
    raw.trim().parse::<Amount>().map_or(0.0, normalize_amount)
}

/// Coerce an amount that is not a finite, non-negative number to zero.
pub fn normalize_amount(amount: Amount) -> Amount {
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

/// The local wall-clock time as an `HH:MM` display string.
pub fn display_time_now() -> String {
    Local::now().format("%H:%M").to_string()
}

/// Source of entry ids.
///
/// Ids are millisecond timestamps. If the clock has not advanced past the previous id (two entries in
/// the same millisecond, or a clock stepping backwards), the previous id plus one is used instead, so
/// ids stay unique and increasing for the lifetime of the generator.
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    last: u64,
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// A generator whose ids are all greater than every numeric id already in `state`, even if the
    /// clock has stepped back since those ids were handed out.
    pub fn resuming(state: &LedgerState) -> Self {
        let main_ids = state.main_entries.iter().map(|entry| entry.id.as_str());
        let out_party_ids = state.out_party_entries.iter().map(|entry| entry.id.as_str());
        let last = main_ids
            .chain(out_party_ids)
            .filter_map(|id| id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        Self { last }
    }

    pub fn next_id(&mut self) -> String {
        self.next_id_at(SystemTime::now())
    }

    pub fn next_id_at(&mut self, now: SystemTime) -> String {
        let candidate = millis_since_unix_epoch(now);
        self.last = if candidate > self.last {
            candidate
        } else {
            self.last + 1
        };
        self.last.to_string()
    }
}

/// Raw input of the out-party form.
#[derive(Clone, Debug, Default)]
pub struct OutPartyForm {
    pub cash: String,
    pub card: String,
    pub paypal: String,
}

impl OutPartyForm {
    /// Build an entry stamped with `id` and `timestamp`. Returns `None` if all three amount fields are
    /// blank.
    pub fn build(&self, id: String, timestamp: String) -> Option<OutPartyEntry> {
        if is_blank(&self.cash) && is_blank(&self.card) && is_blank(&self.paypal) {
            return None;
        }

        Some(OutPartyEntry {
            id,
            timestamp,
            cash: coerce_amount(&self.cash),
            card: coerce_amount(&self.card),
            paypal: coerce_amount(&self.paypal),
        })
    }
}

/// Raw input of the main-ledger form.
#[derive(Clone, Debug)]
pub struct MainForm {
    pub payment_method: PaymentMethod,
    pub room_number: String,
    pub description: String,
    pub cash_in: String,
    pub cash_out: String,
}

impl Default for MainForm {
    fn default() -> Self {
        Self {
            payment_method: PaymentMethod::Cash,
            room_number: String::new(),
            description: String::new(),
            cash_in: String::new(),
            cash_out: String::new(),
        }
    }
}

impl MainForm {
    /// Build an entry stamped with `id` and `timestamp`. Returns `None` if the description and both
    /// amount fields are blank.
    pub fn build(&self, id: String, timestamp: String) -> Option<MainEntry> {
        if is_blank(&self.description) && is_blank(&self.cash_in) && is_blank(&self.cash_out) {
            return None;
        }

        let (is_card, is_paypal) = self.payment_method.flags();
        Some(MainEntry {
            id,
            timestamp,
            is_card,
            is_paypal,
            room_number: self.room_number.clone(),
            description: self.description.clone(),
            cash_in: coerce_amount(&self.cash_in),
            cash_out: coerce_amount(&self.cash_out),
        })
    }
}

fn is_blank(field: &str) -> bool {
    field.trim().is_empty()
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn coerces_invalid_input_to_zero() {
        assert_eq!(coerce_amount(""), 0.0);
        assert_eq!(coerce_amount("   "), 0.0);
        assert_eq!(coerce_amount("abc"), 0.0);
        assert_eq!(coerce_amount("12abc"), 0.0);
        assert_eq!(coerce_amount("NaN"), 0.0);
        assert_eq!(coerce_amount("inf"), 0.0);
        assert_eq!(coerce_amount("-40"), 0.0);
    }

    #[test]
    fn normalizes_non_finite_and_negative_amounts() {
        assert_eq!(normalize_amount(f64::NAN), 0.0);
        assert_eq!(normalize_amount(f64::INFINITY), 0.0);
        assert_eq!(normalize_amount(f64::NEG_INFINITY), 0.0);
        assert_eq!(normalize_amount(-0.5), 0.0);
        assert_eq!(normalize_amount(42.25), 42.25);
    }

    #[test]
    fn resumed_generator_stays_ahead_of_restored_ids() {
        let mut state = LedgerState::new();
        state.main_entries.push(MainEntry {
            id: "4000000000000".to_string(),
            timestamp: "09:00".to_string(),
            is_card: false,
            is_paypal: false,
            room_number: String::new(),
            description: "Restored".to_string(),
            cash_in: 1.0,
            cash_out: 0.0,
        });
        state.out_party_entries.push(OutPartyEntry {
            id: "legacy-id".to_string(),
            timestamp: "09:05".to_string(),
            cash: 1.0,
            card: 0.0,
            paypal: 0.0,
        });

        let mut ids = EntryIdGenerator::resuming(&state);
        // A clock far behind the restored ids.
        let behind = SystemTime::UNIX_EPOCH + Duration::from_millis(1_000);
        assert_eq!(ids.next_id_at(behind), "4000000000001");
        assert_eq!(ids.next_id_at(behind), "4000000000002");
    }

    #[test]
    fn parses_valid_amounts() {
        assert_eq!(coerce_amount("1500"), 1500.0);
        assert_eq!(coerce_amount(" 12.5 "), 12.5);
        assert_eq!(coerce_amount("1e3"), 1000.0);
    }

    #[test]
    fn blank_out_party_form_builds_nothing() {
        let form = OutPartyForm::default();
        assert!(form.build("1".to_string(), "10:00".to_string()).is_none());
    }

    #[test]
    fn out_party_form_coerces_each_field() {
        let form = OutPartyForm {
            cash: "500".to_string(),
            card: "x".to_string(),
            paypal: String::new(),
        };
        let entry = form.build("1".to_string(), "10:00".to_string()).unwrap();
        assert_eq!((entry.cash, entry.card, entry.paypal), (500.0, 0.0, 0.0));
    }

    #[test]
    fn main_form_with_only_description_builds_zero_amount_entry() {
        let form = MainForm {
            payment_method: PaymentMethod::PayPal,
            description: "Note".to_string(),
            ..MainForm::default()
        };
        let entry = form.build("7".to_string(), "10:00".to_string()).unwrap();
        assert!(!entry.is_card);
        assert!(entry.is_paypal);
        assert_eq!((entry.cash_in, entry.cash_out), (0.0, 0.0));
    }

    #[test]
    fn blank_main_form_builds_nothing() {
        let form = MainForm {
            room_number: "12".to_string(),
            ..MainForm::default()
        };
        assert!(form.build("1".to_string(), "10:00".to_string()).is_none());
    }

    #[test]
    fn ids_are_unique_within_one_millisecond() {
        let mut ids = EntryIdGenerator::new();
        let now = SystemTime::UNIX_EPOCH + Duration::from_millis(1_000);
        assert_eq!(ids.next_id_at(now), "1000");
        assert_eq!(ids.next_id_at(now), "1001");
        assert_eq!(ids.next_id_at(now - Duration::from_millis(500)), "1002");
        assert_eq!(ids.next_id_at(now + Duration::from_millis(10)), "1010");
    }
}
