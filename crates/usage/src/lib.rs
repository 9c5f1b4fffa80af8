//! # usage
//!
//! Windowed usage statistics over a stream of kernel trace events.
//!
//! The [`Engine`] consumes [`TraceEvent`]s in timestamp order, routes them to
//! the scheduling, syscall and block I/O trackers, and at every window
//! boundary turns the accumulated counters into a [`WindowReport`] before
//! resetting them. State that describes work still in progress (a task
//! running on a CPU, a syscall or block request not yet completed) survives
//! the reset.

pub mod block_tracker;
pub mod config;
pub mod cpu;
pub mod disk;
pub mod dispatcher;
pub mod engine;
pub mod report;
pub mod sched_tracker;
pub mod stats;
pub mod syscall;
pub mod syscall_tracker;
pub mod tables;
pub mod task;

pub use config::{Config, NameFilter};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use engine::Engine;
pub use report::{CpuStats, DiskStats, SyscallStats, TaskStats, TraceInfo, WindowReport};
pub use tables::EntityTables;

pub use trace_events::{EventKind, TraceEvent};
pub use window::Window;
