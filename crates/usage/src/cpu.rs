use std::collections::BTreeMap;

use trace_events::{CpuId, Tid, IDLE_TID};

/// A task occupying a CPU since a given timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Running {
    pub tid: Tid,
    pub since: u64,
}

/// Per-CPU counters cleared at every flush
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CpuCounters {
    /// Time spent running a non-idle task in the current window
    pub busy_ns: u64,
}

/// Scheduling state of one CPU
#[derive(Debug, Clone)]
pub struct Cpu {
    pub id: CpuId,
    /// In-flight: the task currently scheduled, `None` while idle or unknown
    running: Option<Running>,
    pub counters: CpuCounters,
}

impl Cpu {
    pub fn new(id: CpuId) -> Self {
        Self {
            id,
            running: None,
            counters: CpuCounters::default(),
        }
    }

    pub fn running(&self) -> Option<Running> {
        self.running
    }

    pub fn current_task(&self) -> Option<Tid> {
        self.running.map(|running| running.tid)
    }

    /// Ends the current run at `timestamp`.
    ///
    /// Returns the task that was running and the time credited to it, which
    /// is also added to this CPU's busy time.
    pub fn stop(&mut self, timestamp: u64) -> Option<(Tid, u64)> {
        let running = self.running.take()?;
        let ran_ns = timestamp.saturating_sub(running.since);
        self.counters.busy_ns += ran_ns;
        Some((running.tid, ran_ns))
    }

    /// Starts running `tid` at `timestamp`. The idle task leaves the CPU idle.
    pub fn start(&mut self, tid: Tid, timestamp: u64) {
        self.running = if tid == IDLE_TID {
            None
        } else {
            Some(Running {
                tid,
                since: timestamp,
            })
        };
    }

    /// Credits the running task's time up to `timestamp` without ending the
    /// run. Used when a window closes while a task is on the CPU.
    pub fn credit_until(&mut self, timestamp: u64) -> Option<(Tid, u64)> {
        let running = self.running?;
        let ran_ns = timestamp.saturating_sub(running.since);
        self.counters.busy_ns += ran_ns;
        Some((running.tid, ran_ns))
    }

    /// Clears the window counters and re-anchors a running task at `flush_ts`
    pub fn reset_window(&mut self, flush_ts: u64) {
        self.counters = CpuCounters::default();
        if let Some(running) = self.running.as_mut() {
            running.since = flush_ts;
        }
    }
}

/// All CPUs seen so far, by id
#[derive(Debug, Default, Clone)]
pub struct CpuTable {
    cpus: BTreeMap<CpuId, Cpu>,
}

impl CpuTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, id: CpuId) -> &mut Cpu {
        self.cpus.entry(id).or_insert_with(|| Cpu::new(id))
    }

    pub fn get(&self, id: CpuId) -> Option<&Cpu> {
        self.cpus.get(&id)
    }

    /// Task currently scheduled on `id`, if known
    pub fn current_task(&self, id: CpuId) -> Option<Tid> {
        self.cpus.get(&id).and_then(Cpu::current_task)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Cpu> {
        self.cpus.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Cpu> {
        self.cpus.values_mut()
    }

    pub fn len(&self) -> usize {
        self.cpus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cpus.is_empty()
    }
}
