use std::collections::BTreeMap;

/// Counters for one system call name, cleared at every flush
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyscallCounters {
    /// Entries observed in the window
    pub count: u64,
    /// Exits matched to an entry in the window
    pub completed: u64,
    /// Sum of entry-to-exit durations of the matched exits
    pub total_duration_ns: u64,
}

impl SyscallCounters {
    pub fn record_entry(&mut self) {
        self.count += 1;
    }

    pub fn record_exit(&mut self, duration_ns: u64) {
        self.completed += 1;
        self.total_duration_ns += duration_ns;
    }

    /// Average duration of the matched calls, if any completed
    pub fn avg_duration_ns(&self) -> Option<u64> {
        (self.completed > 0).then(|| self.total_duration_ns / self.completed)
    }
}

/// A system call entered by a task and not yet returned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingSyscall {
    pub name: String,
    pub entry_ts: u64,
}

/// Syscall counters keyed by name
#[derive(Debug, Default, Clone)]
pub struct SyscallTable {
    by_name: BTreeMap<String, SyscallCounters>,
}

impl SyscallTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, name: &str) -> &mut SyscallCounters {
        self.by_name.entry(name.to_string()).or_default()
    }

    pub fn get(&self, name: &str) -> Option<&SyscallCounters> {
        self.by_name.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SyscallCounters)> {
        self.by_name.iter()
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }

    /// Drops every counter. Names are re-created on their next entry.
    pub fn reset_window(&mut self) {
        self.by_name.clear();
    }
}
