use log::trace;
use trace_events::{EventKind, TraceEvent};

use crate::block_tracker::BlockTracker;
use crate::config::Config;
use crate::sched_tracker::SchedTracker;
use crate::syscall_tracker::SyscallTracker;
use crate::tables::EntityTables;

/// Tracks statistics for the dispatcher
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchStats {
    /// Number of events handed to a tracker
    pub events_dispatched: usize,

    /// Number of events of a type no tracker handles
    pub unknown_events: usize,

    /// Number of events whose tracker is disabled by configuration
    pub disabled_events: usize,

    /// Number of syscall events with no tid and no task running on their CPU
    pub unresolved_syscalls: usize,
}

/// Routes each event to the tracker for its type
#[derive(Debug, Default)]
pub struct Dispatcher {
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the current statistics
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    /// Applies one event to the tables
    pub fn dispatch(&mut self, event: &TraceEvent, tables: &mut EntityTables, config: &Config) {
        let ts = event.timestamp;

        match &event.kind {
            EventKind::Switch {
                prev_tid,
                next_tid,
                prev_comm,
                next_comm,
            } => {
                let mut tracker = SchedTracker::new(&mut tables.cpus, &mut tables.tasks);
                tracker.learn_comm(*prev_tid, prev_comm.as_deref());
                tracker.learn_comm(*next_tid, next_comm.as_deref());
                tracker.on_switch(*prev_tid, *next_tid, event.cpu, ts);
            }
            EventKind::Migrate {
                tid,
                src_cpu,
                dst_cpu,
                comm,
            } => {
                let mut tracker = SchedTracker::new(&mut tables.cpus, &mut tables.tasks);
                tracker.learn_comm(*tid, comm.as_deref());
                tracker.on_migrate(*tid, *src_cpu, *dst_cpu, ts);
            }
            EventKind::SyscallEntry { .. } | EventKind::SyscallExit { .. } => {
                if !config.syscalls_enabled() {
                    self.stats.disabled_events += 1;
                    return;
                }
                self.dispatch_syscall(event, tables, config);
                return;
            }
            EventKind::BlockQueue {
                device,
                request_id,
                sectors,
            } => {
                if !config.disk_stats {
                    self.stats.disabled_events += 1;
                    return;
                }
                BlockTracker::new(&mut tables.disks).on_queue(*device, *request_id, *sectors, ts);
            }
            EventKind::BlockComplete { device, request_id } => {
                if !config.disk_stats {
                    self.stats.disabled_events += 1;
                    return;
                }
                BlockTracker::new(&mut tables.disks).on_complete(*device, *request_id, ts);
            }
            EventKind::Other(_) => {
                self.stats.unknown_events += 1;
                return;
            }
        }

        self.stats.events_dispatched += 1;
    }

    fn dispatch_syscall(&mut self, event: &TraceEvent, tables: &mut EntityTables, config: &Config) {
        let (tid, entry_name) = match &event.kind {
            EventKind::SyscallEntry { tid, name } => (*tid, Some(name.as_str())),
            EventKind::SyscallExit { tid } => (*tid, None),
            _ => return,
        };

        // Tracepoints without a tid belong to whatever runs on the CPU
        let Some(tid) = tid.or_else(|| tables.cpus.current_task(event.cpu)) else {
            trace!(
                "cpu {}: {} with no running task",
                event.cpu,
                event.kind.label()
            );
            self.stats.unresolved_syscalls += 1;
            return;
        };

        let global = if config.global_syscalls {
            Some(&mut tables.syscalls)
        } else {
            None
        };
        let mut tracker = SyscallTracker::new(
            &mut tables.tasks,
            global,
            config.tid_syscalls,
            config.syscall_durations,
            &config.name_filter,
        );

        match entry_name {
            Some(name) => tracker.on_entry(tid, name, event.timestamp),
            None => tracker.on_exit(tid, event.timestamp),
        }
        self.stats.events_dispatched += 1;
    }
}
