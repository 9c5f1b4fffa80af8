use log::trace;
use trace_events::{DeviceId, RequestId};

use crate::disk::DiskTable;

/// Correlates block request queue and completion events per device
pub struct BlockTracker<'a> {
    disks: &'a mut DiskTable,
}

impl<'a> BlockTracker<'a> {
    pub fn new(disks: &'a mut DiskTable) -> Self {
        Self { disks }
    }

    pub fn on_queue(&mut self, device: DeviceId, request_id: RequestId, sectors: u64, timestamp: u64) {
        self.disks
            .get_or_create(device)
            .queue(request_id, sectors, timestamp);
    }

    /// Completes a queued request. A completion with no queue record is
    /// ignored; so is one on a device never seen queuing.
    pub fn on_complete(&mut self, device: DeviceId, request_id: RequestId, timestamp: u64) {
        let completed = self
            .disks
            .get_mut(device)
            .and_then(|disk| disk.complete(request_id, timestamp));

        if completed.is_none() {
            trace!(
                "dev {}: completion of request {} without queue record",
                device,
                request_id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disk::DiskCounters;

    #[test]
    fn test_latency_accounting() {
        let mut disks = DiskTable::new();
        let mut tracker = BlockTracker::new(&mut disks);

        tracker.on_queue(8, 2048, 8, 100);
        tracker.on_complete(8, 2048, 350);

        let counters = disks.get(8).unwrap().counters;
        assert_eq!(counters.total_request_time_ns, 250);
        assert_eq!(counters.completed_count, 1);
    }

    #[test]
    fn test_requests_are_keyed_per_device() {
        let mut disks = DiskTable::new();
        let mut tracker = BlockTracker::new(&mut disks);

        tracker.on_queue(8, 2048, 8, 100);
        tracker.on_queue(16, 2048, 4, 120);
        tracker.on_complete(16, 2048, 200);

        assert_eq!(disks.get(8).unwrap().pending_count(), 1);
        assert_eq!(disks.get(8).unwrap().counters.completed_count, 0);
        assert_eq!(disks.get(16).unwrap().counters.total_request_time_ns, 80);
    }

    #[test]
    fn test_unmatched_completion_changes_nothing() {
        let mut disks = DiskTable::new();
        let mut tracker = BlockTracker::new(&mut disks);

        tracker.on_complete(8, 1, 10);
        assert!(disks.is_empty());

        let mut tracker = BlockTracker::new(&mut disks);
        tracker.on_queue(8, 1, 8, 10);
        tracker.on_complete(8, 2, 20);

        let disk = disks.get(8).unwrap();
        assert_eq!(
            disk.counters,
            DiskCounters {
                queued_count: 1,
                completed_count: 0,
                total_sectors: 8,
                total_request_time_ns: 0,
            }
        );
        assert_eq!(disk.pending_count(), 1);
    }
}
