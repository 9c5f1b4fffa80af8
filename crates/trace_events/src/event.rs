use crate::{CpuId, DeviceId, RequestId, Tid};

/// A decoded trace event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceEvent {
    /// Timestamp in nanoseconds. Sources deliver events in nondecreasing order.
    pub timestamp: u64,
    /// CPU that emitted the event
    pub cpu: CpuId,
    pub kind: EventKind,
}

/// The event types understood by the aggregation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// The scheduler switched `cpu` from `prev_tid` to `next_tid`
    Switch {
        prev_tid: Tid,
        next_tid: Tid,
        prev_comm: Option<String>,
        next_comm: Option<String>,
    },

    /// A task was moved from one CPU's run queue to another
    Migrate {
        tid: Tid,
        src_cpu: CpuId,
        dst_cpu: CpuId,
        comm: Option<String>,
    },

    /// A system call was entered. `tid` is absent when the tracepoint does
    /// not record it; the caller is then the task running on the event's CPU.
    SyscallEntry { tid: Option<Tid>, name: String },

    /// A system call returned
    SyscallExit { tid: Option<Tid> },

    /// A block request was queued
    BlockQueue {
        device: DeviceId,
        request_id: RequestId,
        sectors: u64,
    },

    /// A block request completed
    BlockComplete {
        device: DeviceId,
        request_id: RequestId,
    },

    /// Any event the engine does not track, kept by name
    Other(String),
}

impl TraceEvent {
    pub fn new(timestamp: u64, cpu: CpuId, kind: EventKind) -> Self {
        Self {
            timestamp,
            cpu,
            kind,
        }
    }
}

impl EventKind {
    /// Short label for the event type, used in logs and statistics
    pub fn label(&self) -> &str {
        match self {
            EventKind::Switch { .. } => "switch",
            EventKind::Migrate { .. } => "migrate",
            EventKind::SyscallEntry { .. } => "syscall_entry",
            EventKind::SyscallExit { .. } => "syscall_exit",
            EventKind::BlockQueue { .. } => "block_queue",
            EventKind::BlockComplete { .. } => "block_complete",
            EventKind::Other(name) => name,
        }
    }
}
