#![allow(dead_code)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```ignore
//! mod common;
//! ```

use std::sync::{Arc, Mutex, MutexGuard, Once, RwLock};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use taskboard::{RemoteTask, TaskBoard};

static INIT_LOGGING: Once = Once::new();

/// Installs a `tracing` subscriber once per test binary; verbosity comes
/// from `RUST_LOG`.
pub fn init_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// Runs the kill/destroy rendezvous from the correct sides: `destroy`
/// blocks joining the executors until `kill` (on a helper thread) raises
/// the shutdown flag. Returns what `kill` returned.
pub fn shutdown(board: &Arc<TaskBoard>) -> bool {
    let killer = {
        let board = Arc::clone(board);
        thread::spawn(move || board.kill())
    };
    board.destroy();
    killer.join().expect("kill thread panicked")
}

/// Polls `predicate` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut predicate: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if predicate() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    predicate()
}

/// Spawns a fake transport thread that answers every outbound record with
/// `reply` and hands it back inbound. Exits (returning the number of
/// records served) once the board shuts down.
pub fn echo_transport(
    board: &Arc<TaskBoard>,
    reply: fn(&RemoteTask) -> Vec<u8>,
) -> JoinHandle<usize> {
    let board = Arc::clone(board);
    thread::spawn(move || {
        let mut served = 0;
        while let Some(mut record) = board.recv_outbound() {
            record.respond(reply(&record));
            if board.send_inbound(record).is_err() {
                break;
            }
            served += 1;
        }
        served
    })
}

/// Process-wide "current board" accessor for task functions, standing in
/// for the global board the legacy embedding exposed. Tests that use it are
/// serialized by [`install`](active_board::install).
pub mod active_board {
    use super::{Arc, Mutex, MutexGuard, RwLock, TaskBoard};

    static SLOT: RwLock<Option<Arc<TaskBoard>>> = RwLock::new(None);
    static SERIAL: Mutex<()> = Mutex::new(());

    /// Guard that keeps the board installed; dropping it clears the slot
    /// and releases the serialization lock.
    pub struct Installed(#[allow(dead_code)] MutexGuard<'static, ()>);

    impl Drop for Installed {
        fn drop(&mut self) {
            *SLOT.write().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        }
    }

    /// Installs `board` as the process-wide current board.
    pub fn install(board: &Arc<TaskBoard>) -> Installed {
        let guard = SERIAL
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        *SLOT.write().unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Arc::clone(board));
        Installed(guard)
    }

    /// The installed board; panics if none is installed.
    pub fn get() -> Arc<TaskBoard> {
        SLOT.read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
            .expect("no task board installed for this test")
    }
}
