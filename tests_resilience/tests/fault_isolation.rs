//! Fault Isolation Tests
//!
//! Validates that a task failing at runtime is discarded without disturbing
//! the queues, the background loops or any other process.

use kernel_api::Quota;
use sim_kernel::test_utils::{manual_config, wait_until};
use sim_kernel::{ExecuteOutcome, KernelEventKind};
use tests_resilience::{spawn, test_manager, test_manager_with, SETTLE_TIMEOUT};

/// Test: each kind of runtime fault drops only the faulting task
#[test]
fn test_runtime_faults_drop_only_the_task() {
    let bodies = [
        "x = y + 1",
        "x = 1 / 0",
        "x = \"a\" * 2",
        "fail \"boom\"",
        "work -5",
    ];

    for body in bodies {
        let (manager, _sink) = test_manager(Quota::default());
        let bad = spawn(&manager, body, 1);
        let good = spawn(&manager, "x = 1", 1);

        assert_eq!(manager.execute(), ExecuteOutcome::Faulted(bad), "body: {}", body);
        assert!(manager.get_task(bad).is_none());
        assert!(matches!(
            manager.events_for(bad).last(),
            Some(KernelEventKind::Faulted { .. })
        ));

        let snapshot = manager.snapshot();
        assert!(snapshot.running.is_empty());
        assert_eq!(snapshot.ready_pids(), vec![good]);
        assert_eq!(manager.execute(), ExecuteOutcome::Completed(good));
    }
}

/// Test: a fault after some progress discards that progress silently
#[test]
fn test_fault_mid_body() {
    let (manager, sink) = test_manager(Quota::Infinite);
    let pid = spawn(&manager, "x = 1\nx = x + 1\nfail \"x is \" + x\nout x", 1);

    assert_eq!(manager.execute(), ExecuteOutcome::Faulted(pid));
    assert!(sink.payloads().is_empty());
    match manager.events_for(pid).last() {
        Some(KernelEventKind::Faulted { reason }) => assert!(reason.contains("x is 2")),
        other => panic!("expected a fault event, got {:?}", other),
    }
}

/// Test: the auto-dispatcher keeps running after a fault
#[test]
fn test_auto_dispatch_survives_fault() {
    let (manager, _sink) = test_manager_with(manual_config().with_auto_scheduling(true));
    let bad = spawn(&manager, "fail \"early\"", 1);
    let good = spawn(&manager, "x = 1\nx = 2", 1);

    assert!(wait_until(SETTLE_TIMEOUT, || manager.get_task(good).is_none()));
    assert!(manager.get_task(bad).is_none());
    assert!(manager.events_for(good).contains(&KernelEventKind::Completed));
    assert!(!manager.is_halted());
}
