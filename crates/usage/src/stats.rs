use std::cmp::Reverse;

use window::Window;

use crate::config::Config;
use crate::report::{CpuStats, DiskStats, SyscallStats, TaskStats, TraceInfo, WindowReport};
use crate::syscall::SyscallCounters;
use crate::tables::EntityTables;

/// Computes the report for `window` from the tables.
///
/// Tasks still running at `window.end_ts` are credited up to that point as
/// if they had been switched out there. The credit is written into the
/// tables, so [`EntityTables::reset_window`] must follow before the next
/// event is applied.
pub fn compute(
    tables: &mut EntityTables,
    window: Window,
    trace: TraceInfo,
    config: &Config,
) -> WindowReport {
    credit_running_tasks(tables, window.end_ts);

    let duration_ns = window.duration_ns();

    let cpus = tables
        .cpus
        .iter()
        .map(|cpu| CpuStats {
            cpu: cpu.id,
            busy_ns: cpu.counters.busy_ns,
            busy_pct: percent(cpu.counters.busy_ns, duration_ns),
        })
        .collect();

    let mut tasks: Vec<TaskStats> = tables
        .tasks
        .iter()
        .filter(|task| task.is_active())
        .filter(|task| config.name_filter.matches(task.tid, task.comm.as_deref()))
        .map(|task| TaskStats {
            tid: task.tid,
            comm: task.comm.clone(),
            busy_ns: task.counters.busy_ns,
            busy_pct: percent(task.counters.busy_ns, duration_ns),
            migration_count: task.counters.migration_count,
            last_scheduled_ts: task.last_scheduled_ts,
            syscalls: syscall_stats(task.counters.syscalls.iter()),
        })
        .collect();
    tasks.sort_by_key(|task| (Reverse(task.busy_ns), task.tid));
    if config.top > 0 {
        tasks.truncate(config.top);
    }

    let disks = tables
        .disks
        .iter()
        .map(|disk| DiskStats {
            device: disk.device,
            queued_count: disk.counters.queued_count,
            completed_count: disk.counters.completed_count,
            total_sectors: disk.counters.total_sectors,
            total_request_time_ns: disk.counters.total_request_time_ns,
            avg_request_time_ns: disk.counters.avg_request_time_ns(),
        })
        .collect();

    WindowReport {
        window,
        trace,
        cpus,
        tasks,
        syscalls: syscall_stats(tables.syscalls.iter()),
        disks,
    }
}

/// Credits each CPU's running task with its time up to `flush_ts`
fn credit_running_tasks(tables: &mut EntityTables, flush_ts: u64) {
    for cpu in tables.cpus.iter_mut() {
        if let Some((tid, ran_ns)) = cpu.credit_until(flush_ts) {
            tables.tasks.get_or_create(tid).counters.busy_ns += ran_ns;
        }
    }
}

fn syscall_stats<'a, I>(counters: I) -> Vec<SyscallStats>
where
    I: Iterator<Item = (&'a String, &'a SyscallCounters)>,
{
    let mut stats: Vec<SyscallStats> = counters
        .map(|(name, counters)| SyscallStats {
            name: name.clone(),
            count: counters.count,
            completed: counters.completed,
            total_duration_ns: counters.total_duration_ns,
            avg_duration_ns: counters.avg_duration_ns(),
        })
        .collect();
    // Input is sorted by name, the stable sort keeps that order on ties
    stats.sort_by_key(|stats| Reverse(stats.count));
    stats
}

fn percent(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    part as f64 * 100.0 / whole as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window(start_ts: u64, end_ts: u64) -> Window {
        Window {
            start_ts,
            end_ts,
            is_final: false,
        }
    }

    fn trace(start_ts: u64, end_ts: u64) -> TraceInfo {
        TraceInfo { start_ts, end_ts }
    }

    #[test]
    fn test_running_task_credited_at_flush() {
        let mut tables = EntityTables::new();
        tables.cpus.get_or_create(0).start(5, 250);
        tables.tasks.get_or_create(5);

        let report = compute(&mut tables, window(0, 1_000), trace(0, 1_000), &Config::default());

        let cpu = report.cpu(0).unwrap();
        assert_eq!(cpu.busy_ns, 750);
        assert_eq!(cpu.busy_pct, 75.0);

        let task = report.task(5).unwrap();
        assert_eq!(task.busy_ns, 750);
        assert_eq!(task.busy_pct, 75.0);
        assert_eq!(task.last_scheduled_ts, Some(250));
    }

    #[test]
    fn test_zero_length_window() {
        let mut tables = EntityTables::new();
        tables.cpus.get_or_create(0).start(5, 500);

        let report = compute(&mut tables, window(500, 500), trace(500, 500), &Config::default());
        assert_eq!(report.cpu(0).unwrap().busy_pct, 0.0);
    }

    #[test]
    fn test_task_ordering_filter_and_top() {
        let mut tables = EntityTables::new();
        for (tid, busy_ns, comm) in [(1, 100, "a"), (2, 300, "b"), (3, 200, "a"), (4, 0, "a")] {
            let task = tables.tasks.get_or_create(tid);
            task.counters.busy_ns = busy_ns;
            task.set_comm(comm);
        }

        let report = compute(&mut tables, window(0, 1_000), trace(0, 1_000), &Config::default());
        let tids: Vec<_> = report.tasks.iter().map(|task| task.tid).collect();
        assert_eq!(tids, vec![2, 3, 1], "Inactive task 4 is left out");

        let config = Config {
            name_filter: crate::NameFilter::parse("a"),
            top: 1,
            ..Config::default()
        };
        let report = compute(&mut tables, window(0, 1_000), trace(0, 1_000), &config);
        let tids: Vec<_> = report.tasks.iter().map(|task| task.tid).collect();
        assert_eq!(tids, vec![3]);
    }

    #[test]
    fn test_syscalls_sorted_by_count() {
        let mut tables = EntityTables::new();
        tables.syscalls.get_or_create("write").record_entry();
        for _ in 0..3 {
            tables.syscalls.get_or_create("read").record_entry();
        }
        tables.syscalls.get_or_create("close").record_entry();

        let report = compute(&mut tables, window(0, 10), trace(0, 10), &Config::default());
        let names: Vec<_> = report.syscalls.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["read", "close", "write"]);
    }

    #[test]
    fn test_disk_average_latency() {
        let mut tables = EntityTables::new();
        let disk = tables.disks.get_or_create(8);
        disk.queue(1, 8, 100);
        disk.queue(2, 8, 100);
        disk.queue(3, 8, 100);
        disk.complete(1, 200);
        disk.complete(2, 400);

        let report = compute(&mut tables, window(0, 1_000), trace(0, 1_000), &Config::default());
        let disk = report.disk(8).unwrap();
        assert_eq!(disk.queued_count, 3);
        assert_eq!(disk.completed_count, 2);
        assert_eq!(disk.total_sectors, 24);
        assert_eq!(disk.total_request_time_ns, 400);
        assert_eq!(disk.avg_request_time_ns, Some(200));
    }
}
