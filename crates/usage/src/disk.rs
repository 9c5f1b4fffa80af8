use std::collections::{BTreeMap, HashMap};

use trace_events::{DeviceId, RequestId};

/// Per-device counters cleared at every flush
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DiskCounters {
    pub queued_count: u64,
    pub completed_count: u64,
    /// Sectors of the requests queued in the window
    pub total_sectors: u64,
    /// Queue-to-completion latency summed over the requests completed in the window
    pub total_request_time_ns: u64,
}

impl DiskCounters {
    pub fn avg_request_time_ns(&self) -> Option<u64> {
        (self.completed_count > 0).then(|| self.total_request_time_ns / self.completed_count)
    }
}

/// A block device seen in the trace
#[derive(Debug, Clone)]
pub struct Disk {
    pub device: DeviceId,
    /// In-flight: queue timestamp of every request not yet completed
    pending: HashMap<RequestId, u64>,
    pub counters: DiskCounters,
}

impl Disk {
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            pending: HashMap::new(),
            counters: DiskCounters::default(),
        }
    }

    /// Records a queued request. Queuing an id that is already pending
    /// restarts its latency measurement.
    pub fn queue(&mut self, request_id: RequestId, sectors: u64, timestamp: u64) {
        self.counters.queued_count += 1;
        self.counters.total_sectors += sectors;
        self.pending.insert(request_id, timestamp);
    }

    /// Completes a pending request, returning its latency. Unknown requests
    /// are ignored.
    pub fn complete(&mut self, request_id: RequestId, timestamp: u64) -> Option<u64> {
        let queued_at = self.pending.remove(&request_id)?;
        let latency = timestamp.saturating_sub(queued_at);
        self.counters.completed_count += 1;
        self.counters.total_request_time_ns += latency;
        Some(latency)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn reset_window(&mut self) {
        self.counters = DiskCounters::default();
    }
}

/// All block devices seen so far, by device id
#[derive(Debug, Default, Clone)]
pub struct DiskTable {
    disks: BTreeMap<DeviceId, Disk>,
}

impl DiskTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_create(&mut self, device: DeviceId) -> &mut Disk {
        self.disks.entry(device).or_insert_with(|| Disk::new(device))
    }

    pub fn get(&self, device: DeviceId) -> Option<&Disk> {
        self.disks.get(&device)
    }

    pub fn get_mut(&mut self, device: DeviceId) -> Option<&mut Disk> {
        self.disks.get_mut(&device)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Disk> {
        self.disks.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Disk> {
        self.disks.values_mut()
    }

    pub fn len(&self) -> usize {
        self.disks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.disks.is_empty()
    }
}
