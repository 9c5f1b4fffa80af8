//! # trace_events
//!
//! Typed kernel trace events. A trace source produces [`RawEvent`]s (an
//! event name, a timestamp, the emitting CPU and a bag of named attributes);
//! this crate resolves them once into [`TraceEvent`]s so consumers can match
//! on [`EventKind`] instead of comparing event names.
//!

mod decode;
mod event;
mod raw;

pub use decode::*;
pub use event::*;
pub use raw::*;

/// Thread (task) identifier as reported by the kernel
pub type Tid = u32;

/// Logical CPU number
pub type CpuId = u32;

/// Block device number (major/minor encoded)
pub type DeviceId = u64;

/// Identifier correlating a block request's queue and completion events
pub type RequestId = u64;

/// The kernel idle task. Switching to it leaves the CPU idle.
pub const IDLE_TID: Tid = 0;
