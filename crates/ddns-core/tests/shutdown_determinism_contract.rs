//! Contract Test: Poll Loop & Shutdown Determinism
//!
//! Constraints verified:
//! - The loop ticks on its interval after a successful bootstrap
//! - Failures during steady state never terminate the loop
//! - The engine terminates promptly on an external shutdown signal
//!
//! If this test fails, someone has added:
//! - Tasks that ignore the shutdown signal
//! - A failure path that escapes the tick loop

mod common;

use common::*;
use ddns_core::traits::Address;
use ddns_core::{DdnsEngine, EngineEvent, EngineState};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn shutdown_signal_terminates_engine() {
    let source = ScriptedAddressProvider::from_strs(&["1.2.3.4"]);
    let store = MockRecordStore::with_content("1.2.3.4");

    let (engine, _event_rx) =
        DdnsEngine::new(Box::new(source), Box::new(store), &minimal_config(DOMAIN))
            .expect("engine construction succeeds");
    let mut engine = engine.with_poll_interval(Duration::from_millis(20));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

    let engine_handle = tokio::spawn(async move {
        let result = engine.run_with_shutdown(shutdown_rx).await;
        (engine, result)
    });

    // Wait for startup
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(shutdown_tx.send(()).is_ok(), "shutdown signal send succeeds");

    let result = tokio::time::timeout(Duration::from_secs(5), engine_handle).await;
    assert!(result.is_ok(), "Engine should terminate within 5 seconds");

    let (engine, run_result) = result.unwrap().unwrap();
    assert!(run_result.is_ok(), "clean shutdown: {:?}", run_result);
    assert_eq!(engine.state(), EngineState::Steady);
}

#[tokio::test]
async fn loop_polls_and_survives_failures() {
    let source = Arc::new(ScriptedAddressProvider::from_strs(&["1.2.3.4"]));
    let store = Arc::new(MockRecordStore::with_content("1.2.3.4"));

    let (engine, mut event_rx) = DdnsEngine::new(
        Box::new(ScriptedAddressProvider::sharing_counters_with(&source)),
        Box::new(MockRecordStore::sharing_counters_with(&store)),
        &minimal_config(DOMAIN),
    )
    .expect("engine construction succeeds");
    let mut engine = engine.with_poll_interval(Duration::from_millis(20));

    // Steady state: unknown, then a change the provider refuses, then it recovers.
    store.fail_update(true);
    source.push(Address::Unknown);
    source.push(Address::Known(ip("5.6.7.8")));

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let engine_handle = tokio::spawn(async move {
        let result = engine.run_with_shutdown(shutdown_rx).await;
        (engine, result)
    });

    let failed = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match event_rx.recv().await {
                Some(EngineEvent::ReconcileFailed { address, .. }) => break address,
                Some(_) => continue,
                None => panic!("event channel closed before failure"),
            }
        }
    })
    .await
    .expect("a failed reconciliation is observed");
    assert_eq!(failed, ip("5.6.7.8"));

    store.fail_update(false);

    let updated = tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match event_rx.recv().await {
                Some(EngineEvent::RecordUpdated { address, .. }) => break address,
                Some(_) => continue,
                None => panic!("event channel closed before update"),
            }
        }
    })
    .await
    .expect("the loop keeps polling after a failure");
    assert_eq!(updated, ip("5.6.7.8"));

    shutdown_tx.send(()).unwrap();
    let (engine, run_result) = tokio::time::timeout(Duration::from_secs(5), engine_handle)
        .await
        .expect("engine terminates")
        .unwrap();

    assert!(run_result.is_ok());
    assert_eq!(engine.last_known_address(), Some(ip("5.6.7.8")));
    assert_eq!(store.content(), "5.6.7.8");
    assert!(source.discover_call_count() >= 3);
}

#[tokio::test]
async fn dropped_shutdown_sender_stops_engine() {
    let source = ScriptedAddressProvider::from_strs(&["1.2.3.4"]);
    let store = MockRecordStore::with_content("1.2.3.4");

    let (mut engine, _event_rx) =
        DdnsEngine::new(Box::new(source), Box::new(store), &minimal_config(DOMAIN))
            .expect("engine construction succeeds");

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    drop(shutdown_tx);

    let result = tokio::time::timeout(Duration::from_secs(5), engine.run_with_shutdown(shutdown_rx))
        .await
        .expect("engine terminates when its controller goes away");

    assert!(result.is_ok());
}
