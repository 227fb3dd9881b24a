//! Integration tests for StateManager with state change events
//!
//! These tests verify that the StateManager correctly:
//! - Emits state change events on transitions
//! - Supports multiple subscribers
//! - Drops results from superseded background tasks
//! - Keeps or replaces the selection across refreshes

use hdc_udid::models::app_state::{DISPLAY_FETCHING, DISPLAY_NO_DEVICE};
use hdc_udid::services::devices::STATUS_NO_DEVICES;
use hdc_udid::services::{DeviceListing, UdidFailure, UdidOutcome};
use hdc_udid::state::TaskKind;
use hdc_udid::{StateChange, StateManager};
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio::time::{Duration, timeout};

fn listing(devices: &[&str]) -> DeviceListing {
    DeviceListing {
        devices: devices.iter().map(|d| d.to_string()).collect(),
        launch_error: None,
    }
}

fn success(udid: &str) -> UdidOutcome {
    UdidOutcome::Success(udid.to_string())
}

async fn drain(rx: &mut broadcast::Receiver<StateChange>) -> Vec<StateChange> {
    let mut events = Vec::new();
    while let Ok(Ok(event)) = timeout(Duration::from_millis(50), rx.recv()).await {
        events.push(event);
    }
    events
}

#[tokio::test]
async fn test_refresh_events_emitted() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    let generation = state.begin_refresh();

    let event = timeout(Duration::from_millis(100), rx.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Channel closed");

    assert!(
        matches!(event, StateChange::RefreshStarted { generation: g } if g == generation),
        "Expected RefreshStarted event, got: {:?}",
        event
    );
}

#[tokio::test]
async fn test_multiple_subscribers_receive_events() {
    let state = Arc::new(StateManager::new());
    let mut rx1 = state.subscribe();
    let mut rx2 = state.subscribe();

    state.set_status("Hello");

    for rx in [&mut rx1, &mut rx2] {
        let event = timeout(Duration::from_millis(100), rx.recv())
            .await
            .expect("Timeout")
            .expect("Closed");
        assert_eq!(
            event,
            StateChange::StatusChanged {
                message: "Hello".to_string()
            }
        );
    }
}

#[tokio::test]
async fn test_full_refresh_and_fetch_cycle() {
    let state = Arc::new(StateManager::new());
    let mut rx = state.subscribe();

    let refresh = state.begin_refresh();
    let next = state.finish_refresh(refresh, listing(&["A1", "B2"]));
    assert_eq!(next.as_deref(), Some("A1"));

    let fetch = state.begin_udid_fetch("A1");
    assert_eq!(state.read(|s| s.udid_display.clone()), DISPLAY_FETCHING);
    assert!(!state.read(|s| s.can_copy()));

    assert!(state.finish_udid_fetch(fetch, "A1", success("0123456789ABCDEF")));
    assert_eq!(state.copyable_udid().as_deref(), Some("0123456789ABCDEF"));

    let events = drain(&mut rx).await;
    assert!(events.contains(&StateChange::DevicesChanged {
        devices: vec!["A1".to_string(), "B2".to_string()]
    }));
    assert!(events.contains(&StateChange::SelectionChanged {
        device: Some("A1".to_string())
    }));
    assert!(events.contains(&StateChange::UdidChanged {
        display: "0123456789ABCDEF".to_string(),
        copyable: true
    }));
    assert!(events.contains(&StateChange::UdidFetchFinished {
        device: "A1".to_string(),
        success: true
    }));
}

#[tokio::test]
async fn test_stale_udid_result_is_discarded() {
    let state = Arc::new(StateManager::new());
    let refresh = state.begin_refresh();
    state.finish_refresh(refresh, listing(&["A1", "B2"]));

    // User switches devices before the first query returns
    let first = state.begin_udid_fetch("A1");
    let second = state.begin_udid_fetch("B2");

    let mut rx = state.subscribe();
    assert!(!state.finish_udid_fetch(first, "A1", success("AAAAAAAAAAAAAAAA")));
    assert!(state.finish_udid_fetch(second, "B2", success("BBBBBBBBBBBBBBBB")));

    let snapshot = state.snapshot();
    assert_eq!(snapshot.selected_device.as_deref(), Some("B2"));
    assert_eq!(snapshot.udid_display, "BBBBBBBBBBBBBBBB");

    let events = drain(&mut rx).await;
    assert_eq!(
        events.first(),
        Some(&StateChange::StaleResultDiscarded {
            task: TaskKind::UdidFetch,
            generation: first
        })
    );
}

#[tokio::test]
async fn test_refresh_supersedes_inflight_udid_query() {
    let state = Arc::new(StateManager::new());
    let refresh = state.begin_refresh();
    state.finish_refresh(refresh, listing(&["A1"]));
    let fetch = state.begin_udid_fetch("A1");

    state.begin_refresh();
    assert!(!state.finish_udid_fetch(fetch, "A1", success("AAAAAAAAAAAAAAAA")));
    assert!(!state.read(|s| s.can_copy()));
}

#[tokio::test]
async fn test_stale_refresh_result_is_discarded() {
    let state = Arc::new(StateManager::new());
    let old = state.begin_refresh();
    let new = state.begin_refresh();

    assert_eq!(state.finish_refresh(old, listing(&["OLD"])), None);
    assert!(state.read(|s| s.is_refreshing));

    assert_eq!(state.finish_refresh(new, listing(&["NEW"])).as_deref(), Some("NEW"));
    assert_eq!(state.read(|s| s.devices.clone()), vec!["NEW".to_string()]);
}

#[tokio::test]
async fn test_refresh_keeps_existing_selection() {
    let state = Arc::new(StateManager::new());
    let refresh = state.begin_refresh();
    state.finish_refresh(refresh, listing(&["A1", "B2"]));
    let fetch = state.begin_udid_fetch("B2");
    state.finish_udid_fetch(fetch, "B2", success("BBBBBBBBBBBBBBBB"));

    let refresh = state.begin_refresh();
    let next = state.finish_refresh(refresh, listing(&["A1", "B2", "C3"]));
    assert_eq!(next.as_deref(), Some("B2"));
    assert_eq!(state.read(|s| s.selected_index()), 1);
}

#[tokio::test]
async fn test_refresh_with_no_devices() {
    let state = Arc::new(StateManager::new());
    let refresh = state.begin_refresh();
    state.finish_refresh(refresh, listing(&["A1"]));
    state.begin_udid_fetch("A1");

    let refresh = state.begin_refresh();
    assert_eq!(state.finish_refresh(refresh, listing(&[])), None);

    let snapshot = state.snapshot();
    assert!(snapshot.selected_device.is_none());
    assert_eq!(snapshot.udid_display, DISPLAY_NO_DEVICE);
    assert_eq!(snapshot.status_message, STATUS_NO_DEVICES);
    assert!(!snapshot.can_select_device());
    assert!(!snapshot.can_copy());
}

#[tokio::test]
async fn test_failed_query_disables_copy() {
    let state = Arc::new(StateManager::new());
    let refresh = state.begin_refresh();
    state.finish_refresh(refresh, listing(&["A1"]));
    let fetch = state.begin_udid_fetch("A1");

    let mut rx = state.subscribe();
    state.finish_udid_fetch(fetch, "A1", UdidOutcome::Failure(UdidFailure::HelperMissing));
    assert!(state.copyable_udid().is_none());

    let events = drain(&mut rx).await;
    assert!(events.contains(&StateChange::UdidFetchFinished {
        device: "A1".to_string(),
        success: false
    }));
}

#[tokio::test]
async fn test_concurrent_fetches_only_latest_applies() {
    let state = Arc::new(StateManager::new());
    let refresh = state.begin_refresh();
    state.finish_refresh(refresh, listing(&["A1"]));

    let generations: Vec<u64> = (0..10).map(|_| state.begin_udid_fetch("A1")).collect();
    let latest = *generations.last().unwrap();

    let mut handles = Vec::new();
    for generation in generations {
        let state = Arc::clone(&state);
        handles.push(tokio::spawn(async move {
            let udid = format!("{:016}", generation);
            state.finish_udid_fetch(generation, "A1", UdidOutcome::Success(udid))
        }));
    }

    let mut applied = Vec::new();
    for handle in handles {
        applied.push(handle.await.unwrap());
    }

    assert_eq!(applied.iter().filter(|a| **a).count(), 1);
    assert_eq!(state.copyable_udid(), Some(format!("{:016}", latest)));
}
