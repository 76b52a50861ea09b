//! End-to-end shutdown sequencing against a bound service.

use std::collections::BTreeMap;
use std::time::Duration;

use user_service::config::ShutdownConfig;
use user_service::http::RequestId;
use user_service::lifecycle::{DrainOutcome, ListenerStop, ShutdownCause, ShutdownPhase};

mod common;

fn shutdown_config(total: u64) -> ShutdownConfig {
    ShutdownConfig {
        total_timeout_secs: total,
        listener_timeout_secs: 1,
        drain_poll_interval_secs: 1,
        long_running_threshold_secs: 1,
        teardown_grace_secs: 1,
    }
}

#[tokio::test]
async fn test_drains_in_flight_request_before_teardown() {
    let mut service = common::start(shutdown_config(10)).await;
    let guard = service.tracker.track(RequestId::new(), BTreeMap::new());

    service.trigger.request_shutdown();
    service
        .phase
        .wait_for(|phase| *phase == ShutdownPhase::Draining)
        .await
        .unwrap();

    // Listener is gone and the flag is set: nothing new gets in.
    let res = common::client().get(service.url("/healthz")).send().await;
    assert!(res.is_err() || res.unwrap().status() == reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert!(!service.store.is_closed());

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(!service.task.is_finished());
    drop(guard);

    let report = tokio::time::timeout(Duration::from_secs(5), service.task)
        .await
        .expect("shutdown should finish once drained")
        .unwrap()
        .unwrap();
    assert_eq!(report.cause, ShutdownCause::Requested);
    assert_eq!(report.listener, ListenerStop::Graceful);
    assert_eq!(report.drain, DrainOutcome::Drained);
    assert!(report.failed_resources.is_empty());
    assert!(service.store.is_closed());
    assert_eq!(*service.phase.borrow(), ShutdownPhase::Stopped);
}

#[tokio::test]
async fn test_stuck_request_times_out_and_resources_still_close() {
    let service = common::start(shutdown_config(2)).await;
    let _stuck = service.tracker.track(RequestId::new(), BTreeMap::new());

    let started = std::time::Instant::now();
    assert!(service.trigger.request_shutdown());
    assert!(!service.trigger.request_shutdown());

    let report = tokio::time::timeout(Duration::from_secs(10), service.task)
        .await
        .expect("shutdown must respect its deadline")
        .unwrap()
        .unwrap();
    assert_eq!(report.drain, DrainOutcome::TimedOut { remaining: 1 });
    assert!(started.elapsed() >= Duration::from_secs(2));
    assert!(service.store.is_closed());
    assert!(service.tracker.is_shutting_down());
}
