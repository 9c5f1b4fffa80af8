use std::io::{self, Write};

use time::macros::format_description;
use time::OffsetDateTime;
use usage::{SyscallStats, WindowReport};

/// Which parts of a report are printed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sections {
    pub info: bool,
    pub overall: bool,
    pub cpu: bool,
    pub tid: bool,
    pub tid_syscalls: bool,
    pub global_syscalls: bool,
    pub disk: bool,
}

impl Sections {
    pub fn all() -> Self {
        Self {
            info: true,
            overall: true,
            cpu: true,
            tid: true,
            tid_syscalls: true,
            global_syscalls: true,
            disk: true,
        }
    }
}

/// Prints window reports as human readable text
pub struct TextRenderer {
    sections: Sections,
}

impl TextRenderer {
    pub fn new(sections: Sections) -> Self {
        Self { sections }
    }

    pub fn render<W: Write>(&self, out: &mut W, report: &WindowReport) -> io::Result<()> {
        writeln!(
            out,
            "Timerange: [{}, {}]{}",
            format_ts(report.window.start_ts),
            format_ts(report.window.end_ts),
            if report.window.is_final { " (end of trace)" } else { "" }
        )?;

        if self.sections.info {
            self.render_info(out, report)?;
        }
        if self.sections.overall {
            writeln!(out, "Total CPU Usage: {:.2}%", report.overall_busy_pct())?;
        }
        if self.sections.cpu {
            self.render_cpus(out, report)?;
        }
        if self.sections.tid {
            self.render_tasks(out, report)?;
        }
        if self.sections.global_syscalls {
            writeln!(out, "Syscalls")?;
            render_syscalls(out, &report.syscalls, "  ")?;
        }
        if self.sections.disk {
            self.render_disks(out, report)?;
        }

        writeln!(out)?;
        out.flush()
    }

    fn render_info<W: Write>(&self, out: &mut W, report: &WindowReport) -> io::Result<()> {
        let trace_ns = report.trace.end_ts.saturating_sub(report.trace.start_ts);
        writeln!(
            out,
            "Trace: [{}, {}], {:.3} s",
            format_ts(report.trace.start_ts),
            format_ts(report.trace.end_ts),
            secs(trace_ns)
        )?;
        writeln!(
            out,
            "Window: {:.3} s, {} CPUs, {} active tasks, {} disks",
            secs(report.window.duration_ns()),
            report.cpus.len(),
            report.tasks.len(),
            report.disks.len()
        )
    }

    fn render_cpus<W: Write>(&self, out: &mut W, report: &WindowReport) -> io::Result<()> {
        writeln!(out, "Per-CPU Usage")?;
        for cpu in &report.cpus {
            writeln!(
                out,
                "  CPU {:>3}: {:6.2}% ({:.3} ms)",
                cpu.cpu,
                cpu.busy_pct,
                millis(cpu.busy_ns)
            )?;
        }
        Ok(())
    }

    fn render_tasks<W: Write>(&self, out: &mut W, report: &WindowReport) -> io::Result<()> {
        writeln!(out, "Per-TID Usage")?;
        for task in &report.tasks {
            writeln!(
                out,
                "  {:>16} ({:>7}): {:6.2}% ({:.3} ms), {} migrations",
                task.comm.as_deref().unwrap_or("?"),
                task.tid,
                task.busy_pct,
                millis(task.busy_ns),
                task.migration_count
            )?;
            if self.sections.tid_syscalls {
                render_syscalls(out, &task.syscalls, "    - ")?;
            }
        }
        Ok(())
    }

    fn render_disks<W: Write>(&self, out: &mut W, report: &WindowReport) -> io::Result<()> {
        writeln!(out, "Disks")?;
        for disk in &report.disks {
            write!(
                out,
                "  dev {}: {} queued, {} completed, {} sectors",
                disk.device, disk.queued_count, disk.completed_count, disk.total_sectors
            )?;
            match disk.avg_request_time_ns {
                Some(avg) => writeln!(out, ", avg {:.3} ms", millis(avg))?,
                None => writeln!(out)?,
            }
        }
        Ok(())
    }
}

fn render_syscalls<W: Write>(out: &mut W, syscalls: &[SyscallStats], indent: &str) -> io::Result<()> {
    for syscall in syscalls {
        write!(out, "{}{}: {}", indent, syscall.name, syscall.count)?;
        match syscall.avg_duration_ns {
            Some(avg) => writeln!(
                out,
                " ({} completed, avg {:.3} us)",
                syscall.completed,
                avg as f64 / 1_000.0
            )?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}

/// Formats a trace timestamp as a UTC wall clock time. Timestamps outside the
/// representable range are printed as raw nanoseconds.
pub fn format_ts(ts: u64) -> String {
    let format = format_description!("[hour]:[minute]:[second].[subsecond digits:9]");
    OffsetDateTime::from_unix_timestamp_nanos(i128::from(ts))
        .ok()
        .and_then(|time| time.format(&format).ok())
        .unwrap_or_else(|| ts.to_string())
}

fn secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

fn millis(ns: u64) -> f64 {
    ns as f64 / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use usage::{CpuStats, DiskStats, TaskStats, TraceInfo, Window};

    fn report() -> WindowReport {
        WindowReport {
            window: Window {
                start_ts: 1_000_000_000,
                end_ts: 2_000_000_000,
                is_final: false,
            },
            trace: TraceInfo {
                start_ts: 0,
                end_ts: 2_000_000_000,
            },
            cpus: vec![
                CpuStats {
                    cpu: 0,
                    busy_ns: 500_000_000,
                    busy_pct: 50.0,
                },
                CpuStats {
                    cpu: 1,
                    busy_ns: 0,
                    busy_pct: 0.0,
                },
            ],
            tasks: vec![TaskStats {
                tid: 1234,
                comm: Some("nginx".to_string()),
                busy_ns: 500_000_000,
                busy_pct: 50.0,
                migration_count: 2,
                last_scheduled_ts: Some(1_500_000_000),
                syscalls: vec![SyscallStats {
                    name: "read".to_string(),
                    count: 3,
                    completed: 2,
                    total_duration_ns: 3_000,
                    avg_duration_ns: Some(1_500),
                }],
            }],
            syscalls: vec![SyscallStats {
                name: "read".to_string(),
                count: 3,
                completed: 0,
                total_duration_ns: 0,
                avg_duration_ns: None,
            }],
            disks: vec![DiskStats {
                device: 8,
                queued_count: 2,
                completed_count: 1,
                total_sectors: 16,
                total_request_time_ns: 250_000,
                avg_request_time_ns: Some(250_000),
            }],
        }
    }

    fn render(sections: Sections, report: &WindowReport) -> String {
        let mut out = Vec::new();
        TextRenderer::new(sections).render(&mut out, report).unwrap();
        String::from_utf8(out).unwrap()
    }

    fn none() -> Sections {
        Sections {
            info: false,
            overall: false,
            cpu: false,
            tid: false,
            tid_syscalls: false,
            global_syscalls: false,
            disk: false,
        }
    }

    #[test]
    fn test_format_ts() {
        assert_eq!(format_ts(1_500_000_000), "00:00:01.500000000");
        assert_eq!(format_ts(3_723_000_000_042), "01:02:03.000000042");
    }

    #[test]
    fn test_overall_and_cpu_sections() {
        let sections = Sections {
            overall: true,
            cpu: true,
            ..none()
        };

        let expected = "\
Timerange: [00:00:01.000000000, 00:00:02.000000000]
Total CPU Usage: 25.00%
Per-CPU Usage
  CPU   0:  50.00% (500.000 ms)
  CPU   1:   0.00% (0.000 ms)

";
        assert_eq!(render(sections, &report()), expected);
    }

    #[test]
    fn test_task_section_with_syscalls() {
        let sections = Sections {
            tid: true,
            tid_syscalls: true,
            ..none()
        };

        let text = render(sections, &report());
        assert!(text.contains("             nginx (   1234):  50.00% (500.000 ms), 2 migrations\n"));
        assert!(text.contains("    - read: 3 (2 completed, avg 1.500 us)\n"));
    }

    #[test]
    fn test_all_sections() {
        let mut final_report = report();
        final_report.window.is_final = true;

        let text = render(Sections::all(), &final_report);
        assert!(text.starts_with("Timerange: [00:00:01.000000000, 00:00:02.000000000] (end of trace)\n"));
        assert!(text.contains("Trace: [00:00:00.000000000, 00:00:02.000000000], 2.000 s\n"));
        assert!(text.contains("Window: 1.000 s, 2 CPUs, 1 active tasks, 1 disks\n"));
        assert!(text.contains("Syscalls\n  read: 3\n"));
        assert!(text.contains("  dev 8: 2 queued, 1 completed, 16 sectors, avg 0.250 ms\n"));
    }
}
