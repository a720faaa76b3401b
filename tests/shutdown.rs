//! Shutdown rendezvous: kill/destroy ordering, idempotence, and final-state
//! inspection under the protection mutex.

mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;
use taskboard::{task, task_fn, BoardConfig, Class, TaskBoard};

fn spinner() {
    for _ in 0..50 {
        task::yield_now();
    }
}

#[test]
fn kill_before_start_returns_false() {
    common::init_logging();
    let board = TaskBoard::new(BoardConfig::default());
    assert!(!board.kill());
    // Destroy on a never-started board tears down immediately.
    board.destroy();
}

#[test]
fn kill_twice_and_inspect_under_protect() {
    common::init_logging();
    let board = TaskBoard::new(BoardConfig::with_secondaries(1));
    board.start().unwrap();
    for _ in 0..4 {
        board.spawn(task_fn!(spinner), Class::Primary, None).unwrap();
    }

    let inspector = {
        let board = Arc::clone(&board);
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            // Hold the protection mutex across kill so the history can be
            // read before destroy tears it down.
            let guard = board.protect();
            let killed = board.kill();
            let mut report = Vec::new();
            board.print_records(&mut report).unwrap();
            drop(guard);
            (killed, report)
        })
    };

    board.destroy();
    let (killed, report) = inspector.join().unwrap();
    assert!(killed);
    let report = String::from_utf8(report).unwrap();
    assert!(
        report.contains("task 'spinner'"),
        "history missing from report: {report}"
    );

    // Second kill after a completed shutdown reports failure.
    assert!(!board.kill());
}

#[test]
fn in_flight_tasks_are_freed_by_destroy() {
    common::init_logging();
    let board = TaskBoard::new(BoardConfig::with_secondaries(2));
    board.start().unwrap();
    for _ in 0..16 {
        board
            .spawn(task_fn!(spinner), Class::Secondary, None)
            .unwrap();
    }
    // Kill immediately; whatever has not completed is dropped by destroy.
    assert!(common::shutdown(&board));
}
