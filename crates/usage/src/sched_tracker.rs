use log::trace;
use trace_events::{CpuId, Tid, IDLE_TID};

use crate::cpu::CpuTable;
use crate::task::TaskTable;

/// Applies scheduler switch and migration events to the CPU and task tables
pub struct SchedTracker<'a> {
    cpus: &'a mut CpuTable,
    tasks: &'a mut TaskTable,
}

impl<'a> SchedTracker<'a> {
    pub fn new(cpus: &'a mut CpuTable, tasks: &'a mut TaskTable) -> Self {
        Self { cpus, tasks }
    }

    /// Handles `cpu` switching from `prev_tid` to `next_tid` at `timestamp`.
    ///
    /// The time since the CPU's current task was switched in is credited to
    /// that task and to the CPU. The first switch seen on a CPU credits
    /// nothing, since what ran before it was not observed.
    pub fn on_switch(&mut self, prev_tid: Tid, next_tid: Tid, cpu: CpuId, timestamp: u64) {
        let cpu_state = self.cpus.get_or_create(cpu);

        if let Some(running) = cpu_state.running() {
            if running.tid != prev_tid {
                trace!(
                    "cpu {}: switch out of tid {} while tid {} was recorded as running",
                    cpu,
                    prev_tid,
                    running.tid
                );
            }
        }

        // Credit the outgoing task
        if let Some((tid, ran_ns)) = cpu_state.stop(timestamp) {
            self.tasks.get_or_create(tid).counters.busy_ns += ran_ns;
        }

        cpu_state.start(next_tid, timestamp);

        if prev_tid != IDLE_TID {
            self.tasks.get_or_create(prev_tid);
        }
        if next_tid != IDLE_TID {
            self.tasks.get_or_create(next_tid).last_scheduled_ts = Some(timestamp);
        }
    }

    /// Counts a migration of `tid`. The running marker is left alone; the
    /// next switch on the destination CPU establishes it.
    pub fn on_migrate(&mut self, tid: Tid, src_cpu: CpuId, dst_cpu: CpuId, _timestamp: u64) {
        if tid == IDLE_TID {
            return;
        }
        trace!("tid {} migrated from cpu {} to cpu {}", tid, src_cpu, dst_cpu);
        self.tasks.get_or_create(tid).counters.migration_count += 1;
    }

    /// Records a command name carried by a scheduler event
    pub fn learn_comm(&mut self, tid: Tid, comm: Option<&str>) {
        if tid == IDLE_TID {
            return;
        }
        if let Some(comm) = comm {
            self.tasks.get_or_create(tid).set_comm(comm);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpu::Running;

    #[test]
    fn test_first_switch_credits_nothing() {
        let mut cpus = CpuTable::new();
        let mut tasks = TaskTable::new();
        let mut tracker = SchedTracker::new(&mut cpus, &mut tasks);

        tracker.on_switch(10, 20, 0, 5_000);

        assert_eq!(cpus.get(0).unwrap().counters.busy_ns, 0);
        assert_eq!(tasks.get(10).unwrap().counters.busy_ns, 0);
        assert_eq!(tasks.get(20).unwrap().last_scheduled_ts, Some(5_000));
        assert_eq!(
            cpus.get(0).unwrap().running(),
            Some(Running { tid: 20, since: 5_000 })
        );
    }

    #[test]
    fn test_switch_credits_outgoing_task() {
        let mut cpus = CpuTable::new();
        let mut tasks = TaskTable::new();
        let mut tracker = SchedTracker::new(&mut cpus, &mut tasks);

        tracker.on_switch(0, 20, 0, 1_000);
        tracker.on_switch(20, 30, 0, 1_700);
        tracker.on_switch(30, 0, 0, 2_000);

        assert_eq!(tasks.get(20).unwrap().counters.busy_ns, 700);
        assert_eq!(tasks.get(30).unwrap().counters.busy_ns, 300);
        assert_eq!(cpus.get(0).unwrap().counters.busy_ns, 1_000);
        assert_eq!(cpus.current_task(0), None, "Switching to idle leaves CPU idle");
        assert!(tasks.get(0).is_none(), "Idle task is not an entity");
    }

    #[test]
    fn test_current_task_is_latest_switch_in() {
        let mut cpus = CpuTable::new();
        let mut tasks = TaskTable::new();
        let mut tracker = SchedTracker::new(&mut cpus, &mut tasks);

        let switches = [(0, 1, 0), (0, 2, 1), (1, 3, 0), (2, 4, 1), (3, 1, 0)];
        let mut expected = [None, None];

        for (ts, (prev, next, cpu)) in switches.into_iter().enumerate() {
            tracker.on_switch(prev, next, cpu, ts as u64 * 10);
            expected[cpu as usize] = Some(next);

            assert_eq!(tracker.cpus.current_task(0), expected[0]);
            assert_eq!(tracker.cpus.current_task(1), expected[1]);
        }
    }

    #[test]
    fn test_migrate_counts_only() {
        let mut cpus = CpuTable::new();
        let mut tasks = TaskTable::new();
        let mut tracker = SchedTracker::new(&mut cpus, &mut tasks);

        tracker.on_switch(0, 5, 0, 100);
        tracker.on_migrate(5, 0, 1, 150);
        tracker.on_migrate(5, 1, 2, 160);
        tracker.on_migrate(0, 1, 2, 170);

        assert_eq!(tasks.get(5).unwrap().counters.migration_count, 2);
        assert_eq!(cpus.current_task(0), Some(5));
        assert!(cpus.get(1).is_none());
        assert!(tasks.get(0).is_none());
    }

    #[test]
    fn test_learn_comm() {
        let mut cpus = CpuTable::new();
        let mut tasks = TaskTable::new();
        let mut tracker = SchedTracker::new(&mut cpus, &mut tasks);

        tracker.learn_comm(5, Some("bash"));
        tracker.learn_comm(5, None);
        tracker.learn_comm(0, Some("swapper/0"));

        assert_eq!(tasks.get(5).unwrap().comm.as_deref(), Some("bash"));
        assert!(tasks.get(0).is_none());
    }
}
