//! # Window
//!
//! A crate for splitting a stream of trace timestamps into consecutive,
//! non-overlapping refresh windows.
//!
//! Trace analysis tools accumulate counters over a span of trace time and
//! then flush them. This crate decides where those spans begin and end, using
//! only the timestamps of the events as they go by.
//!
//! The primary interface is through the [`WindowController`] struct, which
//! reports a closed [`Window`] whenever an event crosses a refresh boundary,
//! and one final window when the stream ends.

pub mod controller;

pub use controller::*;
