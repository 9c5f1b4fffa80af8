use log::trace;
use trace_events::Tid;

use crate::config::NameFilter;
use crate::syscall::{PendingSyscall, SyscallTable};
use crate::task::TaskTable;

/// Matches system call entries and exits per task
pub struct SyscallTracker<'a> {
    tasks: &'a mut TaskTable,
    /// Counters across all tasks, when global syscall stats are enabled
    global: Option<&'a mut SyscallTable>,
    per_task: bool,
    durations: bool,
    filter: &'a NameFilter,
}

impl<'a> SyscallTracker<'a> {
    pub fn new(
        tasks: &'a mut TaskTable,
        global: Option<&'a mut SyscallTable>,
        per_task: bool,
        durations: bool,
        filter: &'a NameFilter,
    ) -> Self {
        Self {
            tasks,
            global,
            per_task,
            durations,
            filter,
        }
    }

    /// Handles `tid` entering the system call `name`
    pub fn on_entry(&mut self, tid: Tid, name: &str, timestamp: u64) {
        let task = self.tasks.get_or_create(tid);

        let previous = task.pending_syscall.replace(PendingSyscall {
            name: name.to_string(),
            entry_ts: timestamp,
        });
        if let Some(previous) = previous {
            trace!(
                "tid {}: entry of {} while {} had no exit, dropping it",
                tid,
                name,
                previous.name
            );
        }

        if self.per_task {
            task.counters
                .syscalls
                .entry(name.to_string())
                .or_default()
                .record_entry();
        }

        if let Some(global) = self.global.as_deref_mut() {
            if self.filter.matches(tid, task.comm.as_deref()) {
                global.get_or_create(name).record_entry();
            }
        }
    }

    /// Handles `tid` returning from its pending system call. An exit with no
    /// pending entry (the trace started mid-call) is ignored.
    pub fn on_exit(&mut self, tid: Tid, timestamp: u64) {
        let Some(task) = self.tasks.get_mut(tid) else {
            trace!("tid {}: syscall exit for an unknown task", tid);
            return;
        };
        let Some(pending) = task.pending_syscall.take() else {
            trace!("tid {}: syscall exit without entry", tid);
            return;
        };

        if !self.durations {
            return;
        }

        let duration_ns = timestamp.saturating_sub(pending.entry_ts);

        if self.per_task {
            task.counters
                .syscalls
                .entry(pending.name.clone())
                .or_default()
                .record_exit(duration_ns);
        }

        if let Some(global) = self.global.as_deref_mut() {
            if self.filter.matches(tid, task.comm.as_deref()) {
                global.get_or_create(&pending.name).record_exit(duration_ns);
            }
        }
    }
}
