use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use cashledger_rs::{
    config::Configuration,
    rates::FixedRates,
    roles::{Role, RoleHint},
    sync_engine::{FixedAnswer, MutationOutcome},
    terminal::TerminalSpec,
    types::{basic::ChannelKey, ledger_state::LedgerState},
};
use log::LevelFilter;

mod common;

use common::{
    fixtures::{cash_entry, fast_configuration, out_party_entry, start_terminal, wait_until},
    logging::{log_with_context, setup_logger},
    mem_db::MemDB,
    relay::mock_relay,
};

const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(5);

/// Starts an editor and two viewers on the same channel, posts and deletes entries on the editor, and
/// checks that both viewers converge to the editor's ledger.
#[test]
fn viewers_converge_to_editor_test() {
    setup_logger(LevelFilter::Debug);

    // 1. Start one editor and two viewers, all on the default channel.
    let mut relays = mock_relay(3);
    let editor = start_terminal(
        relays.remove(0),
        MemDB::new(),
        RoleHint::editor(),
        fast_configuration(),
    );
    let viewers: Vec<_> = relays
        .into_iter()
        .map(|relay| start_terminal(relay, MemDB::new(), RoleHint::viewer(), fast_configuration()))
        .collect();
    assert_eq!(editor.camera().role(), Role::Editor);
    assert!(viewers.iter().all(|viewer| viewer.camera().role() == Role::Viewer));

    // 2. Post to both streams on the editor.
    log_with_context(Some("Editor"), "Posting three entries.");
    assert_eq!(
        editor.add_main(cash_entry("1", "Kayak rental", 5000.0, 0.0)).unwrap(),
        MutationOutcome::Applied
    );
    assert_eq!(
        editor.add_main(cash_entry("2", "Ice", 0.0, 1200.0)).unwrap(),
        MutationOutcome::Applied
    );
    assert_eq!(
        editor.add_out_party(out_party_entry("3", 500.0, 300.0, 200.0)).unwrap(),
        MutationOutcome::Applied
    );

    let mut expected = LedgerState::new();
    expected.main_entries.push(cash_entry("1", "Kayak rental", 5000.0, 0.0));
    expected.main_entries.push(cash_entry("2", "Ice", 0.0, 1200.0));
    expected.out_party_entries.push(out_party_entry("3", 500.0, 300.0, 200.0));

    // 3. Wait for every terminal to hold the same ledger.
    log_with_context(None, "Waiting for the viewers to converge.");
    assert!(wait_until(CONVERGENCE_TIMEOUT, || editor.camera().state() == expected));
    for viewer in &viewers {
        assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state() == expected));
        assert_eq!(viewer.camera().totals(), editor.camera().totals());
    }

    // 4. Delete on the editor and wait again.
    assert_eq!(editor.delete_main("2").unwrap(), MutationOutcome::Applied);
    assert_eq!(editor.delete_main("2").unwrap(), MutationOutcome::NotFound);
    expected.main_entries.retain(|entry| entry.id != "2");
    for viewer in &viewers {
        assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state() == expected));
    }
}

/// Checks that a viewer ignores local mutations, and that its ledger only changes through snapshots
/// from the editor.
#[test]
fn viewer_mutations_are_ignored_test() {
    setup_logger(LevelFilter::Debug);

    let mut relays = mock_relay(2);
    let editor = start_terminal(
        relays.remove(0),
        MemDB::new(),
        RoleHint::editor(),
        fast_configuration(),
    );
    let narrow = RoleHint {
        view_override: None,
        viewport_width: Some(390),
    };
    let viewer = start_terminal(relays.remove(0), MemDB::new(), narrow, fast_configuration());
    assert_eq!(viewer.camera().role(), Role::Viewer);

    // 1. Every kind of mutation on the viewer is ignored.
    assert_eq!(
        viewer.add_main(cash_entry("v1", "Sneaky", 100.0, 0.0)).unwrap(),
        MutationOutcome::Ignored
    );
    assert_eq!(
        viewer.add_out_party(out_party_entry("v2", 1.0, 0.0, 0.0)).unwrap(),
        MutationOutcome::Ignored
    );
    assert_eq!(viewer.delete_main("v1").unwrap(), MutationOutcome::Ignored);
    assert_eq!(viewer.end_day().unwrap(), MutationOutcome::Ignored);

    // 2. The editor's ledger, which never saw those mutations, still reaches the viewer.
    editor.add_main(cash_entry("e1", "Towels", 800.0, 0.0)).unwrap();
    let mut expected = LedgerState::new();
    expected.main_entries.push(cash_entry("e1", "Towels", 800.0, 0.0));
    assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state() == expected));

    // 3. Promoting the viewer lets it mutate.
    viewer.set_role(Role::Editor).unwrap();
    assert_eq!(viewer.camera().role(), Role::Editor);
    assert_eq!(
        viewer.add_main(cash_entry("v3", "Now allowed", 1.0, 0.0)).unwrap(),
        MutationOutcome::Applied
    );
}

/// Starts a viewer well after the editor has posted, and checks that the viewer converges from the
/// editor's periodic snapshot-carrying heartbeats without any further mutation.
#[test]
fn late_joining_viewer_converges_test() {
    setup_logger(LevelFilter::Debug);

    let mut relays = mock_relay(2);
    let editor = start_terminal(
        relays.remove(0),
        MemDB::new(),
        RoleHint::editor(),
        fast_configuration(),
    );
    editor.add_out_party(out_party_entry("1", 0.0, 0.0, 450.0)).unwrap();
    thread::sleep(Duration::from_millis(200));

    log_with_context(Some("Viewer"), "Joining late.");
    let viewer = start_terminal(relays.remove(0), MemDB::new(), RoleHint::viewer(), fast_configuration());

    let mut expected = LedgerState::new();
    expected.out_party_entries.push(out_party_entry("1", 0.0, 0.0, 450.0));
    assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state() == expected));
}

/// Checks that terminals on different channels do not see each other, and that switching channels
/// tears down the old subscription.
#[test]
fn channel_switch_test() {
    setup_logger(LevelFilter::Debug);

    let configuration = fast_configuration();
    let pool_bar = ChannelKey::parse("pool-bar").unwrap();
    let front_desk = ChannelKey::parse("front-desk").unwrap();

    let mut relays = mock_relay(2);
    let observer = relays[0].clone();
    let editor = TerminalSpec::builder()
        .relay(relays.remove(0))
        .kv_store(MemDB::new())
        .rate_provider(FixedRates::default())
        .confirmer(FixedAnswer(true))
        .configuration(configuration.clone())
        .role_hint(RoleHint::editor())
        .channel_query(Some(pool_bar.to_string()))
        .build()
        .start();
    let viewer = TerminalSpec::builder()
        .relay(relays.remove(0))
        .kv_store(MemDB::new())
        .rate_provider(FixedRates::default())
        .confirmer(FixedAnswer(true))
        .configuration(configuration.clone())
        .role_hint(RoleHint::viewer())
        .channel_query(Some(front_desk.to_string()))
        .build()
        .start();

    // 1. The viewer is on another channel, so it never sees the editor's ledger.
    editor.add_main(cash_entry("1", "Sunbeds", 1500.0, 0.0)).unwrap();
    thread::sleep(Duration::from_millis(300));
    assert!(viewer.camera().state().main_entries.is_empty());
    assert_eq!(viewer.camera().channel(), front_desk);

    // 2. After switching, the viewer converges, and is no longer subscribed to the old topic.
    log_with_context(Some("Viewer"), "Switching to the editor's channel.");
    viewer.switch_channel(pool_bar.clone()).unwrap();
    assert_eq!(viewer.camera().channel(), pool_bar);
    assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state().main_entries.len() == 1));
    assert_eq!(
        observer.subscriber_count(&front_desk.topic(&configuration.namespace)),
        0
    );
    assert_eq!(
        observer.subscriber_count(&pool_bar.topic(&configuration.namespace)),
        2
    );

    // 3. Dropping the terminals unsubscribes them.
    drop(viewer);
    drop(editor);
    assert_eq!(
        observer.subscriber_count(&pool_bar.topic(&configuration.namespace)),
        0
    );
}

/// Injects malformed messages into a live channel and checks that they are dropped without touching
/// the viewer's ledger.
#[test]
fn malformed_messages_are_dropped_test() {
    setup_logger(LevelFilter::Debug);

    let configuration = fast_configuration();
    let dropped = Arc::new(AtomicUsize::new(0));
    let dropped_counter = dropped.clone();

    let mut relays = mock_relay(2);
    let injector = relays[0].clone();
    let editor = start_terminal(
        relays.remove(0),
        MemDB::new(),
        RoleHint::editor(),
        configuration.clone(),
    );
    let viewer = TerminalSpec::builder()
        .relay(relays.remove(0))
        .kv_store(MemDB::new())
        .rate_provider(FixedRates::default())
        .confirmer(FixedAnswer(true))
        .configuration(configuration.clone())
        .role_hint(RoleHint::viewer())
        .on_drop_message(move |_| {
            dropped_counter.fetch_add(1, Ordering::SeqCst);
        })
        .build()
        .start();

    editor.add_main(cash_entry("1", "Snorkel", 700.0, 0.0)).unwrap();
    let mut expected = LedgerState::new();
    expected.main_entries.push(cash_entry("1", "Snorkel", 700.0, 0.0));
    assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state() == expected));

    // 1. Stop the editor, so that nothing repairs the viewer's ledger afterwards.
    drop(editor);

    // 2. Inject a broken envelope and a broken payload.
    let topic = ChannelKey::default().topic(&configuration.namespace);
    injector.inject(&topic, "{\"payload\": ");
    injector.inject(&topic, r#"{"payload":"{\"mainEntries\":42}","updatedAt":1}"#);

    assert!(wait_until(CONVERGENCE_TIMEOUT, || dropped.load(Ordering::SeqCst) >= 2));
    assert_eq!(viewer.camera().state(), expected);
}

/// With authority arbitration enabled, starts two editors on one channel and checks that the viewer
/// follows the one that became editor last.
#[test]
fn authority_arbitration_test() {
    setup_logger(LevelFilter::Debug);

    let configuration = Configuration::builder()
        .heartbeat_interval(Duration::from_millis(50))
        .stale_window(Duration::from_millis(300))
        .watchdog_interval(Duration::from_millis(50))
        .authority_arbitration(true)
        .build();

    let mut relays = mock_relay(3);
    let stale_editor = start_terminal(
        relays.remove(0),
        MemDB::new(),
        RoleHint::editor(),
        configuration.clone(),
    );
    thread::sleep(Duration::from_millis(20));
    let current_editor = start_terminal(
        relays.remove(0),
        MemDB::new(),
        RoleHint::editor(),
        configuration.clone(),
    );
    let viewer = start_terminal(relays.remove(0), MemDB::new(), RoleHint::viewer(), configuration);

    stale_editor.add_main(cash_entry("old", "Stale", 1.0, 0.0)).unwrap();
    current_editor.add_main(cash_entry("new", "Current", 2.0, 0.0)).unwrap();

    let mut expected = LedgerState::new();
    expected.main_entries.push(cash_entry("new", "Current", 2.0, 0.0));
    assert!(wait_until(CONVERGENCE_TIMEOUT, || viewer.camera().state() == expected));

    // Both editors keep sending heartbeats, every fifth one with a snapshot. The viewer must stay
    // put.
    thread::sleep(Duration::from_millis(600));
    assert_eq!(viewer.camera().state(), expected);
}
