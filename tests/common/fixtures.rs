use std::{
    thread,
    time::{Duration, Instant},
};

use cashledger_rs::{
    config::Configuration,
    rates::FixedRates,
    roles::RoleHint,
    sync_engine::FixedAnswer,
    terminal::{Terminal, TerminalSpec},
    types::{
        basic::Amount,
        entries::{MainEntry, OutPartyEntry},
    },
};

use super::{mem_db::MemDB, relay::RelayStub};

/// Timings scaled down so that heartbeats and the watchdog fire many times within a test.
pub(crate) fn fast_configuration() -> Configuration {
    Configuration::builder()
        .heartbeat_interval(Duration::from_millis(50))
        .stale_window(Duration::from_millis(300))
        .watchdog_interval(Duration::from_millis(50))
        .build()
}

pub(crate) fn start_terminal(
    relay: RelayStub,
    kv_store: MemDB,
    role_hint: RoleHint,
    configuration: Configuration,
) -> Terminal {
    TerminalSpec::builder()
        .relay(relay)
        .kv_store(kv_store)
        .rate_provider(FixedRates::default())
        .confirmer(FixedAnswer(true))
        .configuration(configuration)
        .role_hint(role_hint)
        .build()
        .start()
}

/// Poll `condition` until it holds or `timeout` elapses. Returns whether it held.
pub(crate) fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(10));
    }
    condition()
}

pub(crate) fn cash_entry(id: &str, description: &str, cash_in: Amount, cash_out: Amount) -> MainEntry {
    MainEntry {
        id: id.to_string(),
        timestamp: "10:30".to_string(),
        is_card: false,
        is_paypal: false,
        room_number: String::new(),
        description: description.to_string(),
        cash_in,
        cash_out,
    }
}

pub(crate) fn card_entry(id: &str, room_number: &str, cash_in: Amount) -> MainEntry {
    MainEntry {
        id: id.to_string(),
        timestamp: "10:45".to_string(),
        is_card: true,
        is_paypal: false,
        room_number: room_number.to_string(),
        description: "Room charge".to_string(),
        cash_in,
        cash_out: 0.0,
    }
}

pub(crate) fn out_party_entry(id: &str, cash: Amount, card: Amount, paypal: Amount) -> OutPartyEntry {
    OutPartyEntry {
        id: id.to_string(),
        timestamp: "11:00".to_string(),
        cash,
        card,
        paypal,
    }
}
