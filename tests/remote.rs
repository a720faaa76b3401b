//! Remote task protocol against a fake transport thread.

mod common;

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use taskboard::{task, task_fn, BoardConfig, Class, RemoteTask, TaskBoard};

#[derive(Debug, Default)]
struct PingState {
    response: Mutex<Option<Vec<u8>>>,
    done: AtomicBool,
}

fn ping_task() {
    let board = common::active_board::get();
    let state = task::args::<PingState>().unwrap();
    if let Ok(data) = task::call_remote(&board, "ping", vec![0u8; 8], true) {
        *state.response.lock().unwrap() = data;
    }
    state.done.store(true, Ordering::SeqCst);
}

fn pong_reply(record: &RemoteTask) -> Vec<u8> {
    // Give the round-trip an observable window before answering.
    std::thread::sleep(Duration::from_millis(20));
    if record.message() == "ping" && record.payload().len() == 8 {
        b"pong\0\0\0\0".to_vec()
    } else {
        Vec::new()
    }
}

#[test]
fn blocking_round_trip_delivers_response_once() {
    common::init_logging();
    let board = TaskBoard::new(BoardConfig::with_secondaries(1));
    let _installed = common::active_board::install(&board);
    let transport = common::echo_transport(&board, pong_reply);
    board.start().unwrap();

    let state = Arc::new(PingState::default());
    board
        .spawn(task_fn!(ping_task), Class::Primary, Some(state.clone()))
        .unwrap();

    // While the request is out-of-process the caller still occupies its one
    // admission slot; the count never transiently exceeds it.
    let mut max_concurrent = 0;
    assert!(common::wait_until(Duration::from_secs(10), || {
        max_concurrent = max_concurrent.max(board.concurrent());
        state.done.load(Ordering::SeqCst)
    }));
    assert!(max_concurrent <= 1, "saw {max_concurrent} concurrent tasks");
    assert_eq!(
        state.response.lock().unwrap().as_deref(),
        Some(&b"pong\0\0\0\0"[..])
    );

    assert!(common::wait_until(Duration::from_secs(10), || board
        .concurrent()
        == 0));
    assert!(common::shutdown(&board));
    assert_eq!(transport.join().unwrap(), 1);
}

#[derive(Debug, Default)]
struct NotifyState {
    returned: Mutex<Option<Option<Vec<u8>>>>,
    done: AtomicBool,
}

fn notify_task() {
    let board = common::active_board::get();
    let state = task::args::<NotifyState>().unwrap();
    let outcome = task::call_remote(&board, "notify", b"payload".to_vec(), false).ok();
    *state.returned.lock().unwrap() = outcome;
    state.done.store(true, Ordering::SeqCst);
}

fn ack_reply(_record: &RemoteTask) -> Vec<u8> {
    b"ack".to_vec()
}

#[test]
fn non_blocking_caller_continues_immediately() {
    common::init_logging();
    let board = TaskBoard::new(BoardConfig::with_secondaries(1));
    let _installed = common::active_board::install(&board);
    let transport = common::echo_transport(&board, ack_reply);
    board.start().unwrap();

    let state = Arc::new(NotifyState::default());
    board
        .spawn(task_fn!(notify_task), Class::Primary, Some(state.clone()))
        .unwrap();

    assert!(common::wait_until(Duration::from_secs(10), || state
        .done
        .load(Ordering::SeqCst)));
    // A non-blocking call never carries a response back to the caller.
    assert_eq!(*state.returned.lock().unwrap(), Some(None));

    assert!(common::wait_until(Duration::from_secs(10), || board
        .concurrent()
        == 0));
    assert!(common::shutdown(&board));
    // The transport still saw (and answered) the record; the sequencer
    // discarded the inbound copy.
    assert_eq!(transport.join().unwrap(), 1);
}

#[derive(Debug, Default)]
struct FanoutState {
    answered: AtomicUsize,
    done: AtomicUsize,
}

fn fanout_task() {
    let board = common::active_board::get();
    let state = task::args::<FanoutState>().unwrap();
    if let Ok(Some(data)) = task::call_remote(&board, "echo", b"x".to_vec(), true) {
        if data == b"x" {
            state.answered.fetch_add(1, Ordering::SeqCst);
        }
    }
    state.done.fetch_add(1, Ordering::SeqCst);
}

fn echo_reply(record: &RemoteTask) -> Vec<u8> {
    record.payload().to_vec()
}

#[test]
fn many_blocking_callers_all_resume() {
    common::init_logging();
    let board = TaskBoard::new(BoardConfig::with_secondaries(2));
    let _installed = common::active_board::install(&board);
    let transport = common::echo_transport(&board, echo_reply);
    board.start().unwrap();

    let state = Arc::new(FanoutState::default());
    for _ in 0..16 {
        board
            .spawn(task_fn!(fanout_task), Class::Secondary, Some(state.clone()))
            .unwrap();
    }

    assert!(common::wait_until(Duration::from_secs(10), || state
        .done
        .load(Ordering::SeqCst)
        == 16));
    assert_eq!(state.answered.load(Ordering::SeqCst), 16);
    assert!(common::shutdown(&board));
    assert_eq!(transport.join().unwrap(), 16);
}
