use crate::cpu::CpuTable;
use crate::disk::DiskTable;
use crate::syscall::SyscallTable;
use crate::task::TaskTable;

/// Every entity the engine tracks.
///
/// Each entity splits its state into window counters, cleared by
/// [`EntityTables::reset_window`], and in-flight markers (running task,
/// pending syscall, pending block request) that are carried into the next
/// window.
#[derive(Debug, Default, Clone)]
pub struct EntityTables {
    pub cpus: CpuTable,
    pub tasks: TaskTable,
    /// Syscall counters across all tasks
    pub syscalls: SyscallTable,
    pub disks: DiskTable,
}

impl EntityTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new window at `flush_ts`.
    ///
    /// Must run after the closing window's stats were computed: the time a
    /// running task spent before `flush_ts` has already been credited, so the
    /// running marker is moved forward to `flush_ts`.
    pub fn reset_window(&mut self, flush_ts: u64) {
        for cpu in self.cpus.iter_mut() {
            cpu.reset_window(flush_ts);
            if let Some(tid) = cpu.current_task() {
                if let Some(task) = self.tasks.get_mut(tid) {
                    task.last_scheduled_ts = Some(flush_ts);
                }
            }
        }

        for task in self.tasks.iter_mut() {
            task.reset_window();
        }

        self.syscalls.reset_window();

        for disk in self.disks.iter_mut() {
            disk.reset_window();
        }
    }
}
