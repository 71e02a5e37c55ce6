//! Cancelable one-shot phase timer.

use std::fmt;

use tokio::task::JoinHandle;

/// Identifies one scheduled phase timer.
///
/// Every arm of a session gets a fresh id, so an expiry carrying an older id
/// is recognized as stale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

impl TimerId {
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Handle to the task that reports a phase deadline.
///
/// Dropping the handle aborts the task, so a timer can never outlive the
/// session that owns it.
pub struct ScheduledTimer {
    id: TimerId,
    handle: JoinHandle<()>,
}

impl ScheduledTimer {
    pub fn new(id: TimerId, handle: JoinHandle<()>) -> Self {
        Self { id, handle }
    }

    pub fn id(&self) -> TimerId {
        self.id
    }
}

impl Drop for ScheduledTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl fmt::Debug for ScheduledTimer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduledTimer")
            .field("id", &self.id)
            .field("finished", &self.handle.is_finished())
            .finish()
    }
}
