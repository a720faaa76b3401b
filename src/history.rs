//! Per-function execution history.
//!
//! The board keeps one record per task function, keyed by the function's
//! pointer identity. Executions are counted at task creation, completions
//! and the mean statistics at task termination, and the running yield total
//! at every yield. Records are shared: each task holds a handle to its own
//! record so completion-time updates never search the table.

use crate::types::{FuncId, TaskFn};
use std::collections::HashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Aggregate statistics for one task function.
///
/// Means are maintained by incremental averaging over completions, so they
/// equal the batch mean up to floating rounding.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ExecStats {
    /// Mean wall-clock execution time per completion, in seconds.
    pub mean_run_time: f64,
    /// Mean number of yields per completion.
    pub mean_yields: f64,
    /// Number of executions recorded (every task start).
    pub executions: u64,
    /// Number of completions recorded (every terminal exit).
    pub completions: u64,
}

/// One history record, shared between the table and the tasks using it.
#[derive(Debug)]
pub struct ExecRecord {
    name: &'static str,
    /// Running yield total across all executions, bumped at every yield.
    yields: AtomicU64,
    stats: Mutex<ExecStats>,
}

impl ExecRecord {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            yields: AtomicU64::new(0),
            stats: Mutex::new(ExecStats::default()),
        }
    }

    /// The function's symbolic name.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Total yields across all executions so far.
    #[must_use]
    pub fn total_yields(&self) -> u64 {
        self.yields.load(Ordering::Relaxed)
    }

    /// A snapshot of the aggregate statistics.
    #[must_use]
    pub fn stats(&self) -> ExecStats {
        *self.stats.lock().expect("history stats lock poisoned")
    }

    /// Bumps the running yield total.
    pub(crate) fn note_yield(&self) {
        self.yields.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn note_execution(&self) {
        let mut stats = self.stats.lock().expect("history stats lock poisoned");
        stats.executions += 1;
    }

    /// Folds one completion into the means.
    pub(crate) fn note_completion(&self, run_time: Duration, yields: u64) {
        let mut stats = self.stats.lock().expect("history stats lock poisoned");
        stats.completions += 1;
        let n = stats.completions as f64;
        stats.mean_run_time += (run_time.as_secs_f64() - stats.mean_run_time) / n;
        stats.mean_yields += (yields as f64 - stats.mean_yields) / n;
        debug_assert!(stats.completions <= stats.executions);
    }
}

/// The execution history table.
#[derive(Debug, Default)]
pub struct History {
    table: Mutex<HashMap<FuncId, Arc<ExecRecord>>>,
}

impl History {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one execution of `func`, creating its record on first use,
    /// and returns the shared record handle.
    pub(crate) fn record_exec(&self, func: &TaskFn) -> Arc<ExecRecord> {
        let record = {
            let mut table = self.table.lock().expect("history table lock poisoned");
            Arc::clone(
                table
                    .entry(func.id())
                    .or_insert_with(|| Arc::new(ExecRecord::new(func.name))),
            )
        };
        record.note_execution();
        record
    }

    /// Looks up the record for `func`, if any execution has been recorded.
    #[must_use]
    pub fn fetch(&self, func: &TaskFn) -> Option<Arc<ExecRecord>> {
        self.table
            .lock()
            .expect("history table lock poisoned")
            .get(&func.id())
            .cloned()
    }

    /// Number of distinct functions recorded.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.lock().expect("history table lock poisoned").len()
    }

    /// True if no function has been recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every record. Called during board teardown.
    pub(crate) fn clear(&self) {
        self.table
            .lock()
            .expect("history table lock poisoned")
            .clear();
    }

    /// Writes one report line per recorded function.
    pub fn print_records(&self, out: &mut impl io::Write) -> io::Result<()> {
        let records: Vec<_> = self
            .table
            .lock()
            .expect("history table lock poisoned")
            .values()
            .cloned()
            .collect();
        for record in records {
            let stats = record.stats();
            writeln!(
                out,
                "task '{}' completed {}/{} times, yielding {} times with mean execution time {:.6}s",
                record.name(),
                stats.completions,
                stats.executions,
                record.total_yields(),
                stats.mean_run_time,
            )?;
        }
        Ok(())
    }
}
