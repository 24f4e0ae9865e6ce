use std::sync::RwLock;

/// Notification emitted synchronously after a unit's response is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressEvent {
    /// Total unit count reported by the plan.
    pub total_parts: u64,
    /// 0-based index of the unit that just completed.
    pub completed_index: u64,
}

/// Callback invoked with upload progress.
pub type ProgressCallback = Box<dyn Fn(ProgressEvent) + Send + Sync>;

/// Multicast sink for [`ProgressEvent`]s.
///
/// Delivery is synchronous and in-order, with no buffering or replay: a
/// subscriber attached after a unit completes never sees that event. A fully
/// successful upload delivers exactly `total_parts` events with strictly
/// increasing `completed_index` starting at 0; an aborted one delivers fewer.
#[derive(Default)]
pub struct ProgressReporter {
    callbacks: RwLock<Vec<ProgressCallback>>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a progress callback.
    pub fn subscribe(&self, callback: ProgressCallback) {
        self.callbacks.write().unwrap().push(callback);
    }

    /// Delivers `event` to every subscriber, in subscription order.
    pub fn emit(&self, event: ProgressEvent) {
        let callbacks = self.callbacks.read().unwrap();
        for cb in callbacks.iter() {
            cb(event);
        }
    }
}
