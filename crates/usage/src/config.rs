use std::collections::BTreeSet;

use trace_events::Tid;

/// Options controlling what the engine aggregates
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Refresh period in seconds, 0 = one window for the whole trace
    pub refresh_period_secs: u64,

    /// Count system calls across all tasks
    pub global_syscalls: bool,

    /// Count system calls per task
    pub tid_syscalls: bool,

    /// Measure entry-to-exit duration of matched system calls
    pub syscall_durations: bool,

    /// Track block device requests
    pub disk_stats: bool,

    /// Restrict task statistics to these names or tids (empty = all tasks)
    pub name_filter: NameFilter,

    /// Keep only the N busiest tasks in each report (0 = all)
    pub top: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_period_secs: 0,
            global_syscalls: true,
            tid_syscalls: true,
            syscall_durations: true,
            disk_stats: true,
            name_filter: NameFilter::default(),
            top: 0,
        }
    }
}

impl Config {
    /// Returns true if syscall entry/exit events need to be correlated
    pub fn syscalls_enabled(&self) -> bool {
        self.global_syscalls || self.tid_syscalls
    }
}

/// Set of task names (comm) or decimal tids that a report is restricted to
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameFilter {
    names: BTreeSet<String>,
}

impl NameFilter {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    /// Parses a comma separated list, ignoring empty entries
    pub fn parse(list: &str) -> Self {
        Self::new(
            list.split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty()),
        )
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Returns true if the task passes the filter. An empty filter passes
    /// every task.
    pub fn matches(&self, tid: Tid, comm: Option<&str>) -> bool {
        if self.names.is_empty() {
            return true;
        }
        if let Some(comm) = comm {
            if self.names.contains(comm) {
                return true;
            }
        }
        self.names.contains(&tid.to_string())
    }
}
