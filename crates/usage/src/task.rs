use std::collections::{BTreeMap, HashMap};

use trace_events::Tid;

use crate::syscall::{PendingSyscall, SyscallCounters};

/// Per-task counters cleared at every flush
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TaskCounters {
    pub busy_ns: u64,
    pub migration_count: u64,
    /// Per-task syscall counters, by syscall name
    pub syscalls: BTreeMap<String, SyscallCounters>,
}

/// A task (thread) seen in the trace
#[derive(Debug, Clone)]
pub struct Task {
    pub tid: Tid,
    /// Command name, once an event has carried it
    pub comm: Option<String>,
    /// Most recent switch-in, re-anchored at a flush while the task runs
    pub last_scheduled_ts: Option<u64>,
    /// In-flight: syscall entered and not yet exited
    pub pending_syscall: Option<PendingSyscall>,
    pub counters: TaskCounters,
}

impl Task {
    pub fn new(tid: Tid) -> Self {
        Self {
            tid,
            comm: None,
            last_scheduled_ts: None,
            pending_syscall: None,
            counters: TaskCounters::default(),
        }
    }

    /// Records the task's command name. Later names replace earlier ones
    /// since a task changes its comm on exec.
    pub fn set_comm(&mut self, comm: &str) {
        if self.comm.as_deref() != Some(comm) {
            self.comm = Some(comm.to_string());
        }
    }

    /// Returns true if anything was counted for this task in the window
    pub fn is_active(&self) -> bool {
        self.counters != TaskCounters::default()
    }

    pub fn reset_window(&mut self) {
        self.counters = TaskCounters::default();
    }
}

/// All tasks seen so far, by tid
#[derive(Debug, Default, Clone)]
pub struct TaskTable {
    tasks: HashMap<Tid, Task>,
}

impl TaskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, tid: Tid) -> &mut Task {
        self.tasks.entry(tid).or_insert_with(|| Task::new(tid))
    }

    pub fn get(&self, tid: Tid) -> Option<&Task> {
        self.tasks.get(&tid)
    }

    pub fn get_mut(&mut self, tid: Tid) -> Option<&mut Task> {
        self.tasks.get_mut(&tid)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Task> {
        self.tasks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_table() {
        let mut table = TaskTable::new();

        table.get_or_create(1).counters.busy_ns += 10;
        table.get_or_create(1).counters.busy_ns += 5;
        table.get_or_create(2);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(1).map(|t| t.counters.busy_ns), Some(15));
        assert!(table.get(3).is_none());
    }

    #[test]
    fn test_reset_keeps_in_flight_state() {
        let mut task = Task::new(9);
        task.set_comm("postgres");
        task.last_scheduled_ts = Some(100);
        task.pending_syscall = Some(PendingSyscall {
            name: "fsync".to_string(),
            entry_ts: 150,
        });
        task.counters.busy_ns = 1_000;
        task.counters.migration_count = 2;
        task.counters
            .syscalls
            .entry("fsync".to_string())
            .or_default()
            .record_entry();
        assert!(task.is_active());

        task.reset_window();

        assert!(!task.is_active());
        assert_eq!(task.comm.as_deref(), Some("postgres"));
        assert_eq!(task.last_scheduled_ts, Some(100));
        assert!(task.pending_syscall.is_some());
    }
}
