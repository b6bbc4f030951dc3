//! Pending-event buffer.

use sync_core::ChangeEvent;

/// Ordered queue of change events awaiting a flush.
///
/// Append-only until drained by [`EventBuffer::take`].
#[derive(Debug, Default)]
pub struct EventBuffer {
    events: Vec<ChangeEvent>,
}

impl EventBuffer {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: Vec::with_capacity(capacity),
        }
    }

    pub fn push(&mut self, event: ChangeEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Drain the buffer, leaving it empty. Returns `None` if it was already empty.
    pub fn take(&mut self) -> Option<PendingBatch> {
        let last = self.events.last()?.clone();
        let capacity = self.events.capacity();
        let events = std::mem::replace(&mut self.events, Vec::with_capacity(capacity));
        Some(PendingBatch { events, last })
    }
}

/// A non-empty batch of events taken out of an [`EventBuffer`].
#[derive(Debug)]
pub struct PendingBatch {
    events: Vec<ChangeEvent>,
    last: ChangeEvent,
}

impl PendingBatch {
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn events(&self) -> &[ChangeEvent] {
        &self.events
    }

    /// The final event of the batch, acknowledged when every group commits.
    pub fn last(&self) -> &ChangeEvent {
        &self.last
    }

    pub fn into_parts(self) -> (Vec<ChangeEvent>, ChangeEvent) {
        (self.events, self.last)
    }
}
