//! Collision accounting for one episode.
use crate::sim::CollisionEvent;
use crossbeam::queue::SegQueue;
use log::trace;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// Accumulates the collisions reported by a collision sensor.
///
/// Events are appended from the delivery thread without locking. Each event
/// is tagged with an episode epoch and only events of the current epoch are
/// counted. A [`CollisionSink`] handed to a sensor is bound to the epoch it
/// was created in, so whatever it delivers after
/// [`CollisionMonitor::begin_episode`] is never seen, even when the delivery
/// races the epoch change.
#[derive(Debug, Default)]
pub struct CollisionMonitor {
    events: SegQueue<(u64, CollisionEvent)>,
    epoch: AtomicU64,
}

impl CollisionMonitor {
    /// Constructs an empty monitor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a collision to the current epoch.
    pub fn record(&self, event: CollisionEvent) {
        self.events.push((self.epoch(), event));
    }

    /// Returns `true` if a collision was recorded since the last clear.
    pub fn has_collided(&self) -> bool {
        self.count() > 0
    }

    /// Number of collisions recorded since the last clear.
    ///
    /// Drops the events of earlier epochs found in the queue.
    pub fn count(&self) -> usize {
        let epoch = self.epoch();
        let mut n = 0;
        // Events pushed meanwhile stay behind the ones cycled here.
        for _ in 0..self.events.len() {
            match self.events.pop() {
                Some((e, event)) if e == epoch => {
                    self.events.push((e, event));
                    n += 1;
                }
                Some((e, _)) => trace!("Dropped collision of epoch {}", e),
                None => break,
            }
        }
        n
    }

    /// Discards the recorded collisions.
    pub fn clear(&self) {
        while self.events.pop().is_some() {}
    }

    /// Returns the current epoch.
    pub fn epoch(&self) -> u64 {
        self.epoch.load(Ordering::Acquire)
    }

    /// Starts a new epoch and discards the recorded collisions.
    ///
    /// Sinks created before this call stop recording.
    pub fn begin_episode(&self) -> u64 {
        let epoch = self.epoch.fetch_add(1, Ordering::AcqRel) + 1;
        self.clear();
        epoch
    }

    /// Returns a sink recording into this monitor during the current epoch.
    pub fn sink(self: &Arc<Self>) -> CollisionSink {
        CollisionSink {
            epoch: self.epoch(),
            monitor: Arc::clone(self),
        }
    }
}

/// Handle given to a collision sensor callback.
#[derive(Debug, Clone)]
pub struct CollisionSink {
    monitor: Arc<CollisionMonitor>,
    epoch: u64,
}

impl CollisionSink {
    /// Records `event` unless the epoch of the sink is over.
    ///
    /// Returns `true` if the event was recorded. The event carries the epoch
    /// of the sink, so one pushed while the epoch changes is not counted.
    pub fn record(&self, event: CollisionEvent) -> bool {
        if self.monitor.epoch() == self.epoch {
            self.monitor.events.push((self.epoch, event));
            true
        } else {
            trace!("Discarded collision of epoch {}", self.epoch);
            false
        }
    }
}
