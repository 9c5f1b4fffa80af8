use log::{debug, warn};
use trace_events::TraceEvent;
use window::{Window, WindowController};

use crate::config::Config;
use crate::dispatcher::{DispatchStats, Dispatcher};
use crate::report::{TraceInfo, WindowReport};
use crate::stats;
use crate::tables::EntityTables;

/// The windowed aggregation engine.
///
/// Feed events in timestamp order with [`Engine::handle`], which returns a
/// report whenever an event closes a window, then call [`Engine::finish`]
/// for the report of the last (or, in whole-trace mode, the only) window.
///
/// Events must arrive in nondecreasing timestamp order. An event older than
/// the latest one seen is logged and dropped.
pub struct Engine {
    config: Config,
    controller: WindowController,
    tables: EntityTables,
    dispatcher: Dispatcher,
    /// Events rejected for going back in time or arriving after finish
    dropped_events: usize,
}

impl Engine {
    pub fn new(config: Config) -> Self {
        let controller = WindowController::new(config.refresh_period_secs);
        Self {
            config,
            controller,
            tables: EntityTables::new(),
            dispatcher: Dispatcher::new(),
            dropped_events: 0,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Read-only view of the live tables
    pub fn tables(&self) -> &EntityTables {
        &self.tables
    }

    pub fn dispatch_stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    pub fn dropped_events(&self) -> usize {
        self.dropped_events
    }

    /// Processes one event.
    ///
    /// If the event crosses a window boundary, the closing window is flushed
    /// before the event is applied and its report is returned.
    pub fn handle(&mut self, event: &TraceEvent) -> Option<WindowReport> {
        let closed = match self.controller.observe(event.timestamp) {
            Ok(closed) => closed,
            Err(e) => {
                warn!(
                    "Dropping {} event at {}: {}",
                    event.kind.label(),
                    event.timestamp,
                    e
                );
                self.dropped_events += 1;
                return None;
            }
        };

        let report = closed.map(|window| self.flush(window));

        self.dispatcher
            .dispatch(event, &mut self.tables, &self.config);

        report
    }

    /// Ends the stream and returns the report of the window still open, or
    /// `None` if no event was processed.
    pub fn finish(&mut self) -> Option<WindowReport> {
        let window = self.controller.finish()?;
        Some(self.flush(window))
    }

    /// Processes a whole stream and returns every report in order
    pub fn run<I>(mut self, events: I) -> Vec<WindowReport>
    where
        I: IntoIterator<Item = TraceEvent>,
    {
        let mut reports: Vec<WindowReport> = events
            .into_iter()
            .filter_map(|event| self.handle(&event))
            .collect();
        reports.extend(self.finish());
        reports
    }

    fn flush(&mut self, window: Window) -> WindowReport {
        let trace = TraceInfo {
            start_ts: self.controller.trace_start().unwrap_or(window.start_ts),
            end_ts: self.controller.trace_end().unwrap_or(window.end_ts),
        };

        let report = stats::compute(&mut self.tables, window, trace, &self.config);

        debug!(
            "Flushed window [{}, {}] final={}: {} cpus, {} active tasks, {} syscalls, {} disks",
            window.start_ts,
            window.end_ts,
            window.is_final,
            report.cpus.len(),
            report.tasks.len(),
            report.syscalls.len(),
            report.disks.len()
        );

        // Nothing follows the final window
        if !window.is_final {
            self.tables.reset_window(window.end_ts);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use trace_events::EventKind;

    fn switch(ts: u64, cpu: u32, prev_tid: u32, next_tid: u32) -> TraceEvent {
        TraceEvent::new(
            ts,
            cpu,
            EventKind::Switch {
                prev_tid,
                next_tid,
                prev_comm: None,
                next_comm: None,
            },
        )
    }

    #[test]
    fn test_empty_stream_reports_nothing() {
        let engine = Engine::new(Config::default());
        assert!(engine.run(Vec::new()).is_empty());
    }

    #[test]
    fn test_flush_happens_before_event() {
        let mut engine = Engine::new(Config {
            refresh_period_secs: 1,
            ..Config::default()
        });

        assert!(engine.handle(&switch(0, 0, 0, 1)).is_none());

        // This switch closes the first window; task 1 ran for all of it and
        // the switch itself belongs to the second window
        let report = engine.handle(&switch(1_000_000_000, 0, 1, 2)).unwrap();
        assert_eq!(report.task(1).unwrap().busy_ns, 1_000_000_000);
        assert!(report.task(2).is_none());
        assert_eq!(report.cpu(0).unwrap().busy_pct, 100.0);

        let last = engine.finish().unwrap();
        assert!(last.window.is_final);
        assert!(last.task(1).is_none());
    }

    #[test]
    fn test_out_of_order_event_dropped() {
        testing_logger::setup();

        let mut engine = Engine::new(Config::default());
        engine.handle(&switch(1_000, 0, 0, 1));
        engine.handle(&switch(500, 0, 1, 2));

        assert_eq!(engine.dropped_events(), 1);
        assert_eq!(engine.tables().cpus.current_task(0), Some(1));

        testing_logger::validate(|captured_logs| {
            let warnings: Vec<_> = captured_logs
                .iter()
                .filter(|log| log.level == log::Level::Warn)
                .collect();
            assert_eq!(warnings.len(), 1);
            assert_eq!(
                warnings[0].body,
                "Dropping switch event at 500: Non-monotonic timestamp: previous=1000, new=500"
            );
        });
    }

    #[test]
    fn test_events_after_finish_dropped() {
        let mut engine = Engine::new(Config::default());
        engine.handle(&switch(1_000, 0, 0, 1));
        assert!(engine.finish().is_some());

        assert!(engine.handle(&switch(2_000, 0, 1, 2)).is_none());
        assert_eq!(engine.dropped_events(), 1);
        assert!(engine.finish().is_none());
    }
}
